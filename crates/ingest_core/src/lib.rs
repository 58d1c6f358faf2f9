use std::sync::Arc;

use shared::{
    domain::{FileId, FileMetadata, FileRecord},
    error::{FileAction, IngestError},
    protocol::IngestEvent,
};
use tokio::sync::{broadcast, broadcast::error::RecvError, Mutex};
use tracing::{debug, info};

pub mod config;
pub mod policy;
pub mod projector;
pub mod registry;
pub mod scheduler;

pub use config::{ConfigError, IngestConfig};
pub use policy::{DurationPolicy, FixedDuration, JitteredDuration};
pub use projector::{ProjectedPage, ViewControls};
pub use registry::FileRegistry;
pub use scheduler::{PhaseJob, PhaseProgress, PhaseWorker, SimulatedWorker};

use scheduler::{publish_gate, Scheduler};

/// Owns the file registry and the phase tasks that advance it.
///
/// Every registry mutation goes through one mutex, so writes from concurrent
/// phase tasks are serialized.
pub struct IngestEngine {
    config: IngestConfig,
    registry: Arc<Mutex<FileRegistry>>,
    scheduler: Scheduler,
    events: broadcast::Sender<IngestEvent>,
}

impl IngestEngine {
    pub fn new(config: IngestConfig) -> Result<Self, ConfigError> {
        let durations = Arc::new(JitteredDuration::from_config(&config));
        Self::new_with_dependencies(config, Arc::new(SimulatedWorker), durations)
    }

    pub fn new_with_dependencies(
        config: IngestConfig,
        worker: Arc<dyn PhaseWorker>,
        durations: Arc<dyn DurationPolicy>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let (events, _) = broadcast::channel(config.event_capacity);
        let registry = Arc::new(Mutex::new(FileRegistry::new()));
        let scheduler = Scheduler::new(
            Arc::clone(&registry),
            events.clone(),
            worker,
            durations,
            config.progress_step,
        );
        Ok(Self {
            config,
            registry,
            scheduler,
            events,
        })
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<IngestEvent> {
        self.events.subscribe()
    }

    pub async fn add_files(&self, files: Vec<FileMetadata>) -> Vec<FileId> {
        let mut registry = self.registry.lock().await;
        let mut ids = Vec::with_capacity(files.len());
        for metadata in files {
            let id = registry.add(metadata);
            if let Some(file) = registry.get(id).cloned() {
                info!(file_id = %id, name = %file.name, size_bytes = file.size_bytes, "file queued");
                let _ = self.events.send(IngestEvent::FileAdded { file });
            }
            // The entry was inserted under this same lock.
            if let Err(error) = self.scheduler.schedule_transfer(&mut registry, id) {
                debug!(file_id = %id, %error, "transfer not scheduled");
            }
            ids.push(id);
        }
        ids
    }

    pub async fn request_conversion(&self, id: FileId) -> Result<(), IngestError> {
        let mut registry = self.registry.lock().await;
        self.scheduler.start_conversion(&mut registry, id)?;
        info!(file_id = %id, "conversion requested");
        Ok(())
    }

    pub async fn delete_file(&self, id: FileId) -> Result<FileRecord, IngestError> {
        let mut registry = self.registry.lock().await;
        let file = registry.get(id).cloned().ok_or(IngestError::NotFound(id))?;
        if !registry.remove(id) {
            return Err(IngestError::InvalidTransition {
                id,
                state: file.state,
                action: FileAction::Delete,
            });
        }

        info!(file_id = %id, name = %file.name, "file deleted");
        let _ = self.events.send(IngestEvent::FileRemoved { file_id: id });
        publish_gate(&mut registry, &self.events);
        Ok(file)
    }

    pub async fn get(&self, id: FileId) -> Option<FileRecord> {
        self.registry.lock().await.get(id).cloned()
    }

    pub async fn files(&self) -> Vec<FileRecord> {
        self.registry.lock().await.all()
    }

    pub async fn file_count(&self) -> usize {
        self.registry.lock().await.len()
    }

    pub async fn is_complete(&self) -> bool {
        self.registry.lock().await.has_ready()
    }

    pub async fn is_uploading(&self) -> bool {
        self.registry.lock().await.has_pending_transfers()
    }

    pub async fn project(&self, controls: &ViewControls) -> ProjectedPage {
        let files = self.files().await;
        projector::project(&files, controls)
    }

    /// Resolves once no phase task is bound to any file.
    pub async fn wait_for_idle(&self) {
        let mut events = self.subscribe_events();
        loop {
            if !self.registry.lock().await.has_active_phases() {
                return;
            }
            match events.recv().await {
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return,
            }
        }
    }

    /// Aborts every running phase task. Files keep their last state.
    pub async fn shutdown(&self) {
        self.registry.lock().await.abort_all();
    }
}

// If a phase task holds the registry lock at drop time, nothing is aborted.
// Such tasks run to the end of their phase against the orphaned registry and
// exit; their writes are no longer observable.
impl Drop for IngestEngine {
    fn drop(&mut self) {
        if let Ok(mut registry) = self.registry.try_lock() {
            registry.abort_all();
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
