use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use shared::domain::Phase;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub page_size: usize,
    pub transfer_min_ms: u64,
    pub transfer_max_ms: u64,
    pub convert_min_ms: u64,
    pub convert_max_ms: u64,
    pub progress_step: u8,
    pub event_capacity: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            page_size: 5,
            transfer_min_ms: 2000,
            transfer_max_ms: 3000,
            convert_min_ms: 2000,
            convert_max_ms: 3000,
            progress_step: 10,
            event_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("page_size must be at least 1")]
    ZeroPageSize,
    #[error("progress_step must be within 1..=100, got {0}")]
    ProgressStep(u8),
    #[error("{phase} duration range is inverted: min {min_ms}ms > max {max_ms}ms")]
    InvertedRange {
        phase: &'static str,
        min_ms: u64,
        max_ms: u64,
    },
    #[error("event_capacity must be at least 1")]
    ZeroEventCapacity,
}

impl IngestConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        if !(1..=100).contains(&self.progress_step) {
            return Err(ConfigError::ProgressStep(self.progress_step));
        }
        for phase in [Phase::Transfer, Phase::Conversion] {
            let (min_ms, max_ms) = self.duration_bounds_ms(phase);
            if min_ms > max_ms {
                return Err(ConfigError::InvertedRange {
                    phase: phase.as_str(),
                    min_ms,
                    max_ms,
                });
            }
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::ZeroEventCapacity);
        }
        Ok(())
    }

    pub fn duration_bounds_ms(&self, phase: Phase) -> (u64, u64) {
        match phase {
            Phase::Transfer => (self.transfer_min_ms, self.transfer_max_ms),
            Phase::Conversion => (self.convert_min_ms, self.convert_max_ms),
        }
    }

    pub fn duration_bounds(&self, phase: Phase) -> (Duration, Duration) {
        let (min_ms, max_ms) = self.duration_bounds_ms(phase);
        (Duration::from_millis(min_ms), Duration::from_millis(max_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_panel_timings() {
        let config = IngestConfig::default();
        config.validate().expect("defaults are valid");
        assert_eq!(config.page_size, 5);
        assert_eq!(
            config.duration_bounds(Phase::Conversion),
            (Duration::from_millis(2000), Duration::from_millis(3000))
        );
    }

    #[test]
    fn rejects_inverted_transfer_range() {
        let config = IngestConfig {
            transfer_min_ms: 500,
            transfer_max_ms: 100,
            ..IngestConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvertedRange {
                phase: "transfer",
                min_ms: 500,
                max_ms: 100,
            })
        );
    }

    #[test]
    fn rejects_out_of_range_progress_step() {
        for step in [0u8, 101] {
            let config = IngestConfig {
                progress_step: step,
                ..IngestConfig::default()
            };
            assert_eq!(config.validate(), Err(ConfigError::ProgressStep(step)));
        }
    }

    #[test]
    fn rejects_zero_page_size() {
        let config = IngestConfig {
            page_size: 0,
            ..IngestConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroPageSize));
    }
}
