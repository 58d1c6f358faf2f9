use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{FileId, FileState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    InvalidTransition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileAction {
    Convert,
    Delete,
}

impl FileAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Convert => "convert",
            Self::Delete => "delete",
        }
    }
}

/// Rejections surfaced by the ingestion engine.
///
/// Both kinds are recoverable: the user can retry once the file has moved on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    #[error("file {0} not found")]
    NotFound(FileId),
    #[error("cannot {} file {id} while it is {state}", action.as_str())]
    InvalidTransition {
        id: FileId,
        state: FileState,
        action: FileAction,
    },
}

impl IngestError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::InvalidTransition { .. } => ErrorCode::InvalidTransition,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub message: String,
}

impl From<&IngestError> for ErrorReport {
    fn from(value: &IngestError) -> Self {
        Self {
            code: value.code(),
            message: value.to_string(),
        }
    }
}
