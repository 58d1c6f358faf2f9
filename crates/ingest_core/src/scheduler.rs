use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::{
    domain::{FileId, FileState, Phase},
    error::{FileAction, IngestError},
    protocol::IngestEvent,
};
use tokio::{
    sync::{broadcast, Mutex},
    time::Instant,
};
use tracing::{debug, info, trace, warn};

use crate::{
    policy::{tick_count, tick_offset, DurationPolicy},
    registry::{FilePatch, FileRegistry},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseJob {
    pub file_id: FileId,
    pub phase: Phase,
    pub duration: Duration,
    pub step: u8,
}

impl PhaseJob {
    pub fn ticks(&self) -> u32 {
        tick_count(self.step)
    }

    pub fn tick_offset(&self, tick: u32) -> Duration {
        tick_offset(self.duration, self.step, tick)
    }
}

/// Performs the work behind a phase and reports progress as it goes.
///
/// Returning `Ok` completes the phase (progress is pinned to 100 if the worker
/// stopped short); returning `Err` fails the file.
#[async_trait]
pub trait PhaseWorker: Send + Sync {
    async fn run(&self, job: PhaseJob, progress: &PhaseProgress) -> Result<()>;
}

pub struct SimulatedWorker;

#[async_trait]
impl PhaseWorker for SimulatedWorker {
    async fn run(&self, job: PhaseJob, progress: &PhaseProgress) -> Result<()> {
        let started = Instant::now();
        let mut value = 0u8;
        for tick in 1..=job.ticks() {
            tokio::time::sleep_until(started + job.tick_offset(tick)).await;
            value = value.saturating_add(job.step).min(100);
            if !progress.report(value).await {
                break;
            }
        }
        Ok(())
    }
}

/// Write handle a phase task uses against the registry.
///
/// Every write is checked against the ticket the task was started with, so a
/// task that wakes after its file was deleted writes nothing.
pub struct PhaseProgress {
    registry: Arc<Mutex<FileRegistry>>,
    events: broadcast::Sender<IngestEvent>,
    file_id: FileId,
    phase: Phase,
    ticket: u64,
}

impl PhaseProgress {
    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Records `value` as the phase progress. Returns `false` once the task
    /// should stop: the phase completed, or the file is gone.
    pub async fn report(&self, value: u8) -> bool {
        let value = value.min(100);
        let mut registry = self.registry.lock().await;
        let Some(record) = registry.current(self.file_id, self.ticket) else {
            trace!(file_id = %self.file_id, "dropping progress write for released ticket");
            return false;
        };
        if record.state != self.phase.active_state() {
            return false;
        }
        if value <= record.progress {
            return true;
        }

        if value == 100 {
            self.complete(&mut registry);
            return false;
        }

        if registry
            .update(self.file_id, FilePatch::progress(value))
            .is_ok()
        {
            let _ = self.events.send(IngestEvent::ProgressChanged {
                file_id: self.file_id,
                progress: value,
            });
        }
        true
    }

    async fn enter(&self) -> bool {
        let mut registry = self.registry.lock().await;
        let Some(record) = registry.current(self.file_id, self.ticket) else {
            return false;
        };
        let active = self.phase.active_state();
        if record.state == active {
            return true;
        }
        if record.state != self.phase.entry_state() {
            return false;
        }

        if registry
            .update(self.file_id, FilePatch::transition(active, 0))
            .is_err()
        {
            return false;
        }
        let _ = self.events.send(IngestEvent::StateChanged {
            file_id: self.file_id,
            state: active,
        });
        true
    }

    async fn finish(&self) {
        let mut registry = self.registry.lock().await;
        let Some(record) = registry.current(self.file_id, self.ticket) else {
            return;
        };
        if record.state == self.phase.active_state() {
            self.complete(&mut registry);
        }
    }

    async fn fail(&self, error: anyhow::Error) {
        let mut registry = self.registry.lock().await;
        let Some(record) = registry.current(self.file_id, self.ticket) else {
            return;
        };
        if record.state != self.phase.active_state() {
            return;
        }

        warn!(
            file_id = %self.file_id,
            phase = self.phase.as_str(),
            %error,
            "ingestion phase failed"
        );
        if registry
            .update(self.file_id, FilePatch::failed(format!("{error:#}")))
            .is_ok()
        {
            let _ = self.events.send(IngestEvent::StateChanged {
                file_id: self.file_id,
                state: FileState::Failed,
            });
        }
    }

    fn complete(&self, registry: &mut FileRegistry) {
        let done = self.phase.done_state();
        if registry
            .update(self.file_id, FilePatch::transition(done, 100))
            .is_err()
        {
            return;
        }
        let _ = self.events.send(IngestEvent::ProgressChanged {
            file_id: self.file_id,
            progress: 100,
        });
        let _ = self.events.send(IngestEvent::StateChanged {
            file_id: self.file_id,
            state: done,
        });
        info!(file_id = %self.file_id, state = %done, "ingestion phase completed");
        publish_gate(registry, &self.events);
    }
}

pub(crate) fn publish_gate(registry: &mut FileRegistry, events: &broadcast::Sender<IngestEvent>) {
    if let Some(complete) = registry.refresh_gate() {
        debug!(complete, "completion gate changed");
        let _ = events.send(IngestEvent::GateChanged { complete });
    }
}

#[derive(Clone)]
pub(crate) struct Scheduler {
    registry: Arc<Mutex<FileRegistry>>,
    events: broadcast::Sender<IngestEvent>,
    worker: Arc<dyn PhaseWorker>,
    durations: Arc<dyn DurationPolicy>,
    step: u8,
}

impl Scheduler {
    pub fn new(
        registry: Arc<Mutex<FileRegistry>>,
        events: broadcast::Sender<IngestEvent>,
        worker: Arc<dyn PhaseWorker>,
        durations: Arc<dyn DurationPolicy>,
        step: u8,
    ) -> Self {
        Self {
            registry,
            events,
            worker,
            durations,
            step,
        }
    }

    /// Queues the transfer for a freshly added file. The move to
    /// `Transferring` happens inside the task.
    pub fn schedule_transfer(
        &self,
        registry: &mut FileRegistry,
        file_id: FileId,
    ) -> Result<(), IngestError> {
        self.spawn_phase(registry, file_id, Phase::Transfer)
    }

    pub fn start_conversion(
        &self,
        registry: &mut FileRegistry,
        file_id: FileId,
    ) -> Result<(), IngestError> {
        let state = registry
            .get(file_id)
            .map(|file| file.state)
            .ok_or(IngestError::NotFound(file_id))?;
        if state != Phase::Conversion.entry_state() {
            return Err(IngestError::InvalidTransition {
                id: file_id,
                state,
                action: FileAction::Convert,
            });
        }

        registry.update(
            file_id,
            FilePatch::transition(Phase::Conversion.active_state(), 0),
        )?;
        let _ = self.events.send(IngestEvent::StateChanged {
            file_id,
            state: FileState::Converting,
        });
        self.spawn_phase(registry, file_id, Phase::Conversion)
    }

    fn spawn_phase(
        &self,
        registry: &mut FileRegistry,
        file_id: FileId,
        phase: Phase,
    ) -> Result<(), IngestError> {
        let ticket = registry.issue_ticket(file_id)?;
        let job = PhaseJob {
            file_id,
            phase,
            duration: self.durations.phase_duration(phase),
            step: self.step,
        };
        let progress = Arc::new(PhaseProgress {
            registry: Arc::clone(&self.registry),
            events: self.events.clone(),
            file_id,
            phase,
            ticket,
        });
        let worker = Arc::clone(&self.worker);

        debug!(
            %file_id,
            phase = phase.as_str(),
            duration_ms = job.duration.as_millis() as u64,
            "spawning ingestion phase task"
        );
        let work = tokio::spawn({
            let progress = Arc::clone(&progress);
            async move {
                if !progress.enter().await {
                    return Ok(false);
                }
                worker.run(job, &progress).await.map(|()| true)
            }
        });
        registry.attach_abort(file_id, ticket, work.abort_handle());

        // The worker runs in its own task so a panic still settles the file.
        tokio::spawn(async move {
            match work.await {
                Ok(Ok(true)) => progress.finish().await,
                Ok(Ok(false)) => {}
                Ok(Err(error)) => progress.fail(error).await,
                Err(error) if error.is_panic() => {
                    progress.fail(anyhow!("phase worker panicked: {error}")).await
                }
                Err(_) => trace!(%file_id, "phase task cancelled"),
            }
        });
        Ok(())
    }
}
