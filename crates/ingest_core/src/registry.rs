use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use shared::{
    domain::{FileId, FileMetadata, FileRecord, FileState},
    error::IngestError,
};
use tokio::task::AbortHandle;

/// Binds one running phase task to one registry entry.
///
/// A task only writes while the entry still carries its ticket number.
#[derive(Debug)]
pub(crate) struct PhaseTicket {
    number: u64,
    abort: Option<AbortHandle>,
}

impl PhaseTicket {
    fn cancel(self) {
        if let Some(abort) = self.abort {
            abort.abort();
        }
    }
}

#[derive(Debug)]
struct FileEntry {
    record: FileRecord,
    task: Option<PhaseTicket>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct FilePatch {
    pub state: Option<FileState>,
    pub progress: Option<u8>,
    pub failure: Option<String>,
}

impl FilePatch {
    pub fn progress(progress: u8) -> Self {
        Self {
            progress: Some(progress),
            ..Self::default()
        }
    }

    pub fn transition(state: FileState, progress: u8) -> Self {
        Self {
            state: Some(state),
            progress: Some(progress),
            failure: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            state: Some(FileState::Failed),
            progress: None,
            failure: Some(reason.into()),
        }
    }
}

#[derive(Debug, Default)]
pub struct FileRegistry {
    entries: BTreeMap<u64, FileEntry>,
    index: HashMap<FileId, u64>,
    next_sequence: u64,
    next_ticket: u64,
    complete: bool,
}

impl FileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, metadata: FileMetadata) -> FileId {
        let mut id = FileId::random();
        while self.index.contains_key(&id) {
            id = FileId::random();
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.entries.insert(
            sequence,
            FileEntry {
                record: FileRecord::new(id, metadata, sequence, Utc::now()),
                task: None,
            },
        );
        self.index.insert(id, sequence);
        id
    }

    pub fn get(&self, id: FileId) -> Option<&FileRecord> {
        self.entry(id).map(|entry| &entry.record)
    }

    /// Applies a scheduler write. A missing id means the file was deleted
    /// while its task was in flight.
    pub(crate) fn update(&mut self, id: FileId, patch: FilePatch) -> Result<(), IngestError> {
        let entry = self.entry_mut(id).ok_or(IngestError::NotFound(id))?;
        if let Some(state) = patch.state {
            entry.record.state = state;
            if !state.is_transient() {
                entry.task = None;
            }
        }
        if let Some(progress) = patch.progress {
            entry.record.progress = progress.min(100);
        }
        if patch.failure.is_some() {
            entry.record.failure = patch.failure;
        }
        Ok(())
    }

    pub fn remove(&mut self, id: FileId) -> bool {
        let Some(&sequence) = self.index.get(&id) else {
            return false;
        };
        let deletable = self
            .entries
            .get(&sequence)
            .is_some_and(|entry| entry.record.state.is_deletable());
        if !deletable {
            return false;
        }

        self.index.remove(&id);
        if let Some(entry) = self.entries.remove(&sequence) {
            if let Some(ticket) = entry.task {
                ticket.cancel();
            }
        }
        true
    }

    pub fn all(&self) -> Vec<FileRecord> {
        self.entries
            .values()
            .map(|entry| entry.record.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_ready(&self) -> bool {
        self.entries
            .values()
            .any(|entry| entry.record.state == FileState::Ready)
    }

    pub fn has_pending_transfers(&self) -> bool {
        self.entries.values().any(|entry| {
            matches!(
                entry.record.state,
                FileState::Queued | FileState::Transferring
            )
        })
    }

    pub fn has_active_phases(&self) -> bool {
        self.entries.values().any(|entry| entry.task.is_some())
    }

    /// Recomputes the completion gate, returning the new value if it flipped.
    pub(crate) fn refresh_gate(&mut self) -> Option<bool> {
        let complete = self.has_ready();
        if complete == self.complete {
            return None;
        }
        self.complete = complete;
        Some(complete)
    }

    pub(crate) fn issue_ticket(&mut self, id: FileId) -> Result<u64, IngestError> {
        let number = self.next_ticket;
        let entry = self.entry_mut(id).ok_or(IngestError::NotFound(id))?;
        if let Some(previous) = entry.task.replace(PhaseTicket {
            number,
            abort: None,
        }) {
            previous.cancel();
        }
        self.next_ticket += 1;
        Ok(number)
    }

    pub(crate) fn attach_abort(&mut self, id: FileId, number: u64, abort: AbortHandle) {
        match self
            .entry_mut(id)
            .and_then(|entry| entry.task.as_mut())
            .filter(|ticket| ticket.number == number)
        {
            Some(ticket) => ticket.abort = Some(abort),
            None => abort.abort(),
        }
    }

    /// Returns the record only while `number` is still the entry's live ticket.
    pub(crate) fn current(&self, id: FileId, number: u64) -> Option<&FileRecord> {
        self.entry(id)
            .filter(|entry| {
                entry
                    .task
                    .as_ref()
                    .is_some_and(|ticket| ticket.number == number)
            })
            .map(|entry| &entry.record)
    }

    pub(crate) fn abort_all(&mut self) {
        for entry in self.entries.values_mut() {
            if let Some(ticket) = entry.task.take() {
                ticket.cancel();
            }
        }
    }

    fn entry(&self, id: FileId) -> Option<&FileEntry> {
        let sequence = self.index.get(&id)?;
        self.entries.get(sequence)
    }

    fn entry_mut(&mut self, id: FileId) -> Option<&mut FileEntry> {
        let sequence = self.index.get(&id)?;
        self.entries.get_mut(sequence)
    }
}
