//! Server configuration.

use std::time::Duration;

/// Configuration for a server instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// A running simulation silent for longer than this is reported as
    /// timed out by the sweep.
    pub timeout_threshold: Duration,

    /// Cadence at which the runner delivers `Event::SweepTimer`.
    pub sweep_interval: Duration,

    /// Cadence at which the runner delivers `Event::CheckpointTimer`.
    pub checkpoint_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            timeout_threshold: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(10),
            checkpoint_interval: Duration::from_secs(300),
        }
    }
}

impl ServerConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout threshold.
    pub fn with_timeout_threshold(mut self, threshold: Duration) -> Self {
        self.timeout_threshold = threshold;
        self
    }

    /// Set the sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Set the checkpoint interval.
    pub fn with_checkpoint_interval(mut self, interval: Duration) -> Self {
        self.checkpoint_interval = interval;
        self
    }
}
