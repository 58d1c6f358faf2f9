//! Knowledge-file panel: turns user intents into engine calls and renders the
//! engine's registry as a paged table view.

use std::sync::Arc;

use ingest_core::{
    projector::{self, ProjectedPage},
    IngestEngine, ViewControls,
};
use serde::Serialize;
use shared::{
    domain::{FileId, FileMetadata, FileRecord, FileState, SortDirection, SortKey},
    error::IngestError,
    protocol::PanelIntent,
};
use thiserror::Error;
use tracing::{debug, info};

pub mod format;
pub mod wizard;

pub use wizard::{WizardProgress, WizardStage};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PanelError {
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error("an upload batch is still transferring")]
    UploadInProgress,
    #[error("no file is ready yet; convert at least one file before leaving")]
    CloseBlocked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentOutcome {
    Applied,
    Ignored(PanelError),
}

impl IntentOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

impl<T> From<Result<T, PanelError>> for IntentOutcome {
    fn from(value: Result<T, PanelError>) -> Self {
        match value {
            Ok(_) => Self::Applied,
            Err(error) => Self::Ignored(error),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PanelExit {
    pub knowledgebase_complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowView {
    pub file_id: FileId,
    pub name: String,
    pub size: String,
    pub media_type: String,
    pub media_type_full: String,
    pub created_at: String,
    pub status: &'static str,
    pub tooltip: String,
    pub progress: u8,
    pub can_convert: bool,
    pub can_delete: bool,
}

impl RowView {
    fn from_record(file: &FileRecord) -> Self {
        Self {
            file_id: file.id,
            name: file.name.clone(),
            size: format::format_file_size(file.size_bytes),
            media_type: format::truncate_media_type(&file.media_type),
            media_type_full: file.media_type.clone(),
            created_at: file.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            status: format::status_label(file),
            tooltip: format::status_tooltip(file),
            progress: file.progress,
            can_convert: file.state == FileState::Transferred,
            can_delete: file.state.is_deletable(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelView {
    pub rows: Vec<RowView>,
    pub placeholder_rows: usize,
    pub page: usize,
    pub total_pages: usize,
    pub filtered_count: usize,
    pub total_count: usize,
    pub footer: String,
    pub can_close: bool,
    pub is_uploading: bool,
    pub is_complete: bool,
    pub controls: ViewControls,
}

pub fn clamp_page(page: usize, total_pages: usize) -> usize {
    page.clamp(1, total_pages.max(1))
}

pub struct PanelController {
    engine: Arc<IngestEngine>,
    controls: ViewControls,
}

impl PanelController {
    pub fn new(engine: Arc<IngestEngine>) -> Self {
        let controls = ViewControls::new(engine.config().page_size);
        Self { engine, controls }
    }

    pub fn engine(&self) -> &Arc<IngestEngine> {
        &self.engine
    }

    pub fn controls(&self) -> &ViewControls {
        &self.controls
    }

    pub async fn add_files(&mut self, files: Vec<FileMetadata>) -> Result<Vec<FileId>, PanelError> {
        if files.is_empty() {
            return Ok(Vec::new());
        }
        if self.engine.is_uploading().await {
            return Err(PanelError::UploadInProgress);
        }
        Ok(self.engine.add_files(files).await)
    }

    pub async fn request_conversion(&self, id: FileId) -> Result<(), PanelError> {
        self.engine.request_conversion(id).await?;
        Ok(())
    }

    pub async fn delete_file(&self, id: FileId) -> Result<(), PanelError> {
        self.engine.delete_file(id).await?;
        Ok(())
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.controls.search = term.into();
    }

    pub fn set_sort(&mut self, key: SortKey, direction: SortDirection) {
        self.controls.sort_key = key;
        self.controls.sort_direction = direction;
    }

    /// Same column flips direction; a new column starts ascending.
    pub fn toggle_sort(&mut self, key: SortKey) {
        if self.controls.sort_key == key {
            self.controls.sort_direction = self.controls.sort_direction.toggled();
        } else {
            self.controls.sort_key = key;
            self.controls.sort_direction = SortDirection::Ascending;
        }
    }

    pub async fn set_page(&mut self, page: usize) {
        let total_pages = self.total_pages().await;
        self.controls.page = clamp_page(page, total_pages);
    }

    pub async fn next_page(&mut self) {
        let page = self.controls.page.saturating_add(1);
        self.set_page(page).await;
    }

    pub async fn previous_page(&mut self) {
        let page = self.controls.page.saturating_sub(1);
        self.set_page(page).await;
    }

    pub async fn can_close(&self) -> bool {
        self.engine.file_count().await == 0 || self.engine.is_complete().await
    }

    pub async fn close(&self) -> Result<PanelExit, PanelError> {
        if !self.can_close().await {
            return Err(PanelError::CloseBlocked);
        }
        let exit = PanelExit {
            knowledgebase_complete: self.engine.is_complete().await,
        };
        info!(
            knowledgebase_complete = exit.knowledgebase_complete,
            "knowledge panel closed"
        );
        Ok(exit)
    }

    pub async fn view(&mut self) -> PanelView {
        let files = self.engine.files().await;
        let total_pages = projector::total_pages(
            projector::filtered_count(&files, &self.controls.search),
            self.controls.page_size,
        );
        self.controls.page = clamp_page(self.controls.page, total_pages);

        let ProjectedPage {
            files: page_files,
            padding,
            page,
            total_pages,
            filtered_count,
            total_count,
        } = projector::project(&files, &self.controls);

        let is_complete = files.iter().any(|file| file.state == FileState::Ready);
        let is_uploading = files
            .iter()
            .any(|file| matches!(file.state, FileState::Queued | FileState::Transferring));

        PanelView {
            rows: page_files.iter().map(RowView::from_record).collect(),
            placeholder_rows: padding,
            page,
            total_pages,
            filtered_count,
            total_count,
            footer: format!("{total_count} file(s) uploaded"),
            can_close: files.is_empty() || is_complete,
            is_uploading,
            is_complete,
            controls: self.controls.clone(),
        }
    }

    pub async fn dispatch(&mut self, intent: PanelIntent) -> IntentOutcome {
        let name = intent.name();
        debug!(intent = name, "dispatching panel intent");

        let outcome = match intent {
            PanelIntent::AddFiles { files } => self.add_files(files).await.into(),
            PanelIntent::RequestConversion { file_id } => {
                self.request_conversion(file_id).await.into()
            }
            PanelIntent::DeleteFile { file_id } => self.delete_file(file_id).await.into(),
            PanelIntent::SetSearch { term } => {
                self.set_search(term);
                IntentOutcome::Applied
            }
            PanelIntent::SetSort { key, direction } => {
                self.set_sort(key, direction);
                IntentOutcome::Applied
            }
            PanelIntent::ToggleSort { key } => {
                self.toggle_sort(key);
                IntentOutcome::Applied
            }
            PanelIntent::SetPage { page } => {
                self.set_page(page).await;
                IntentOutcome::Applied
            }
            PanelIntent::NextPage => {
                self.next_page().await;
                IntentOutcome::Applied
            }
            PanelIntent::PreviousPage => {
                self.previous_page().await;
                IntentOutcome::Applied
            }
            PanelIntent::Close => self.close().await.into(),
        };

        if let IntentOutcome::Ignored(error) = &outcome {
            debug!(intent = name, %error, "panel intent ignored");
        }
        outcome
    }

    async fn total_pages(&self) -> usize {
        let files = self.engine.files().await;
        projector::total_pages(
            projector::filtered_count(&files, &self.controls.search),
            self.controls.page_size,
        )
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
