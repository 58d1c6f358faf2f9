use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(pub Uuid);

impl FileId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle of one ingested file.
///
/// `Transferring` and `Converting` are the only transient states: a phase task
/// is bound to the file while it sits in either of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileState {
    Queued,
    Transferring,
    Transferred,
    Converting,
    Ready,
    Failed,
}

impl FileState {
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Transferring | Self::Converting)
    }

    pub fn is_deletable(self) -> bool {
        !self.is_transient()
    }

    /// Position in the pipeline, used when sorting by state.
    pub fn ordinal(self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::Transferring => 1,
            Self::Transferred => 2,
            Self::Converting => 3,
            Self::Ready => 4,
            Self::Failed => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Queued => "Queued",
            Self::Transferring => "Transferring",
            Self::Transferred => "Transferred",
            Self::Converting => "Converting",
            Self::Ready => "Ready",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Transfer,
    Conversion,
}

impl Phase {
    pub fn active_state(self) -> FileState {
        match self {
            Self::Transfer => FileState::Transferring,
            Self::Conversion => FileState::Converting,
        }
    }

    pub fn done_state(self) -> FileState {
        match self {
            Self::Transfer => FileState::Transferred,
            Self::Conversion => FileState::Ready,
        }
    }

    pub fn entry_state(self) -> FileState {
        match self {
            Self::Transfer => FileState::Queued,
            Self::Conversion => FileState::Transferred,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transfer => "transfer",
            Self::Conversion => "conversion",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub name: String,
    pub size_bytes: u64,
    pub media_type: String,
}

impl FileMetadata {
    pub fn new(name: impl Into<String>, size_bytes: u64, media_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size_bytes,
            media_type: media_type.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: FileId,
    pub name: String,
    pub size_bytes: u64,
    pub media_type: String,
    pub created_at: DateTime<Utc>,
    pub state: FileState,
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    pub sequence: u64,
}

impl FileRecord {
    pub fn new(
        id: FileId,
        metadata: FileMetadata,
        sequence: u64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: metadata.name,
            size_bytes: metadata.size_bytes,
            media_type: metadata.media_type,
            created_at,
            state: FileState::Queued,
            progress: 0,
            failure: None,
            sequence,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Name,
    Size,
    MediaType,
    CreatedAt,
    State,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}
