//! Domain-specific identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum length of a scheduler job identifier, in bytes.
pub const MAX_JOB_ID_LEN: usize = 256;

/// Errors from identifier validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("Job id too long: {len} bytes (max {MAX_JOB_ID_LEN})")]
    JobIdTooLong { len: usize },
}

/// Ensemble member identifier, assigned by the launcher.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SimulationId(pub u64);

impl fmt::Display for SimulationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Simulation({})", self.0)
    }
}

/// Rank of a sending client process within one simulation.
///
/// Each simulation is itself parallel; every rank reports its own
/// partition of the field vector.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ClientRank(pub u32);

impl ClientRank {
    /// Get the rank as a usize index into partition tables.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ClientRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rank({})", self.0)
    }
}

/// Simulation time step.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TimeStep(pub u64);

impl TimeStep {
    /// First time step of a run.
    pub const FIRST: Self = TimeStep(0);

    /// Get the next time step.
    pub fn next(self) -> Self {
        TimeStep(self.0 + 1)
    }
}

impl fmt::Display for TimeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Step({})", self.0)
    }
}

/// External scheduler job identifier (bounded-length string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Create a job id, validating the length bound.
    pub fn new(id: impl Into<String>) -> Result<Self, IdError> {
        let id = id.into();
        if id.len() > MAX_JOB_ID_LEN {
            return Err(IdError::JobIdTooLong { len: id.len() });
        }
        Ok(Self(id))
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Job({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_step_next() {
        assert_eq!(TimeStep::FIRST.next(), TimeStep(1));
        assert_eq!(TimeStep(41).next(), TimeStep(42));
    }

    #[test]
    fn test_job_id_length_bound() {
        assert!(JobId::new("slurm-193482").is_ok());
        let long = "x".repeat(MAX_JOB_ID_LEN + 1);
        assert_eq!(
            JobId::new(long),
            Err(IdError::JobIdTooLong {
                len: MAX_JOB_ID_LEN + 1
            })
        );
    }

    #[test]
    fn test_display_formats() {
        assert_eq!(SimulationId(3).to_string(), "Simulation(3)");
        assert_eq!(ClientRank(1).to_string(), "Rank(1)");
        assert_eq!(TimeStep(7).to_string(), "Step(7)");
    }
}
