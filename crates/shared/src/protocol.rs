use serde::{Deserialize, Serialize};

use crate::domain::{FileId, FileMetadata, FileRecord, FileState, SortDirection, SortKey};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum PanelIntent {
    AddFiles {
        files: Vec<FileMetadata>,
    },
    RequestConversion {
        file_id: FileId,
    },
    DeleteFile {
        file_id: FileId,
    },
    SetSearch {
        term: String,
    },
    SetSort {
        key: SortKey,
        direction: SortDirection,
    },
    ToggleSort {
        key: SortKey,
    },
    SetPage {
        page: usize,
    },
    NextPage,
    PreviousPage,
    Close,
}

impl PanelIntent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddFiles { .. } => "add_files",
            Self::RequestConversion { .. } => "request_conversion",
            Self::DeleteFile { .. } => "delete_file",
            Self::SetSearch { .. } => "set_search",
            Self::SetSort { .. } => "set_sort",
            Self::ToggleSort { .. } => "toggle_sort",
            Self::SetPage { .. } => "set_page",
            Self::NextPage => "next_page",
            Self::PreviousPage => "previous_page",
            Self::Close => "close",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum IngestEvent {
    FileAdded {
        file: FileRecord,
    },
    ProgressChanged {
        file_id: FileId,
        progress: u8,
    },
    StateChanged {
        file_id: FileId,
        state: FileState,
    },
    FileRemoved {
        file_id: FileId,
    },
    GateChanged {
        complete: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intents_use_tagged_snake_case_encoding() {
        let intent = PanelIntent::ToggleSort {
            key: SortKey::MediaType,
        };
        let encoded = serde_json::to_value(&intent).expect("encode");
        assert_eq!(encoded["type"], "toggle_sort");
        assert_eq!(encoded["payload"]["key"], "media_type");

        let decoded: PanelIntent =
            serde_json::from_str(r#"{"type":"set_page","payload":{"page":3}}"#).expect("decode");
        assert!(matches!(decoded, PanelIntent::SetPage { page: 3 }));
    }

    #[test]
    fn unit_intents_decode_without_payload() {
        let decoded: PanelIntent = serde_json::from_str(r#"{"type":"next_page"}"#).expect("decode");
        assert_eq!(decoded.name(), "next_page");
    }

    #[test]
    fn state_change_events_carry_snake_case_state() {
        let event = IngestEvent::StateChanged {
            file_id: FileId::random(),
            state: FileState::Transferred,
        };
        let encoded = serde_json::to_value(&event).expect("encode");
        assert_eq!(encoded["type"], "state_changed");
        assert_eq!(encoded["payload"]["state"], "transferred");
    }
}
