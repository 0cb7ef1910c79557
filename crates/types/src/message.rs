//! Messages crossing the server boundary.

use crate::{ClientRank, JobId, SimulationId, TimeStep};
use serde::{Deserialize, Serialize};

/// One inbound data message: a partial state vector for a single
/// (field, time step, simulation, rank).
///
/// The transport layer delivers exactly this unit to the server; the
/// vector length is `payload.len()` and must match the partition size
/// declared for `rank` at field registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataMessage {
    /// Declared field name.
    pub field_name: String,

    /// Sending ensemble member.
    pub simulation_id: SimulationId,

    /// Sending client rank within the simulation.
    pub rank: ClientRank,

    /// Time step this sample belongs to.
    pub time_step: TimeStep,

    /// Partial state vector for this rank's partition.
    pub payload: Vec<f64>,
}

/// Report for one timed-out ensemble member, emitted to the external
/// notifier (orchestration system) by the timeout sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeoutReport {
    /// Scheduler job identifier of the silent member.
    pub job_id: JobId,

    /// Sampled input parameters of the member, for relaunch.
    pub parameters: Vec<f64>,

    /// Last time step the member reported before going silent.
    pub last_time_step: TimeStep,
}
