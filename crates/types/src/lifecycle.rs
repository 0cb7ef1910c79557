//! Lifecycle enums for ensemble members.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Internal lifecycle status of an ensemble member, as seen by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SimulationStatus {
    /// Admitted but no data message received yet.
    #[default]
    NotStarted,
    /// At least one data message received; considered live.
    Running,
    /// Explicitly finished (last time step reached or finalize signal).
    Completed,
}

impl fmt::Display for SimulationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationStatus::NotStarted => write!(f, "not-started"),
            SimulationStatus::Running => write!(f, "running"),
            SimulationStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Job state reported by the external scheduler.
///
/// Opaque to the statistics core: the tracker stores and counts these but
/// never derives behavior from them. Transitions are driven entirely by
/// the launcher/coupling layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum JobStatus {
    /// Not yet handed to the scheduler.
    #[default]
    NotSubmitted,
    /// Queued, waiting for resources.
    Pending,
    /// Scheduled and executing.
    Running,
    /// Terminated normally.
    Finished,
    /// Terminated abnormally (scheduler-reported failure).
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::NotSubmitted => write!(f, "not-submitted"),
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Finished => write!(f, "finished"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}
