use std::time::Duration;

use shared::domain::Phase;
use tracing::warn;

use crate::config::IngestConfig;

pub trait DurationPolicy: Send + Sync {
    fn phase_duration(&self, phase: Phase) -> Duration;
}

#[derive(Debug, Clone, Copy)]
pub struct FixedDuration(pub Duration);

impl DurationPolicy for FixedDuration {
    fn phase_duration(&self, _phase: Phase) -> Duration {
        self.0
    }
}

/// Uniform draw from `[min, max)` per phase, so concurrent files finish at
/// different times.
#[derive(Debug, Clone)]
pub struct JitteredDuration {
    transfer: (Duration, Duration),
    conversion: (Duration, Duration),
}

impl JitteredDuration {
    pub fn new(transfer: (Duration, Duration), conversion: (Duration, Duration)) -> Self {
        Self {
            transfer,
            conversion,
        }
    }

    pub fn from_config(config: &IngestConfig) -> Self {
        Self::new(
            config.duration_bounds(Phase::Transfer),
            config.duration_bounds(Phase::Conversion),
        )
    }

    pub fn bounds(&self, phase: Phase) -> (Duration, Duration) {
        match phase {
            Phase::Transfer => self.transfer,
            Phase::Conversion => self.conversion,
        }
    }
}

impl DurationPolicy for JitteredDuration {
    fn phase_duration(&self, phase: Phase) -> Duration {
        let (min, max) = self.bounds(phase);
        let span = max.saturating_sub(min).as_millis() as u64;
        min + Duration::from_millis(random_below(span))
    }
}

fn random_below(bound: u64) -> u64 {
    if bound == 0 {
        return 0;
    }
    let mut bytes = [0u8; 8];
    match getrandom::getrandom(&mut bytes) {
        Ok(()) => u64::from_le_bytes(bytes) % bound,
        Err(error) => {
            warn!(%error, "duration jitter unavailable; using midpoint");
            bound / 2
        }
    }
}

pub fn tick_count(step: u8) -> u32 {
    let step = u32::from(step.clamp(1, 100));
    100u32.div_ceil(step)
}

/// Offset of tick `tick` from the phase start; the last tick lands on `total`.
pub fn tick_offset(total: Duration, step: u8, tick: u32) -> Duration {
    let ticks = tick_count(step);
    total * tick.min(ticks) / ticks
}
