//! Events consumed and actions emitted by the server state machine.

use enstat_types::{DataMessage, JobId, JobStatus, SimulationId, TimeoutReport};

/// Inbound events, delivered by the transport/coupling layer and the
/// runner's timers.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A new ensemble member announced itself.
    SimulationConnected {
        id: SimulationId,
        job_id: JobId,
        parameters: Vec<f64>,
    },

    /// One rank's partial state vector for one (field, time step).
    SampleReceived(DataMessage),

    /// Explicit completion signal for an ensemble member (last time
    /// step reached, or finalize call from the coupling layer).
    SimulationFinished { id: SimulationId },

    /// Scheduler-side job state change, forwarded by the launcher.
    JobStatusChanged { id: SimulationId, status: JobStatus },

    /// Periodic trigger for the timeout sweep.
    SweepTimer,

    /// Periodic trigger for checkpointing.
    CheckpointTimer,

    /// Shutdown request; state must be flushed before terminating.
    Shutdown,
}

/// Side effects for the runner to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Forward timed-out members to the external notifier.
    ReportTimeouts(Vec<TimeoutReport>),

    /// Persist the current field table and registry via the checkpoint
    /// manager. Emitted between folds, i.e. at a reduction boundary.
    WriteCheckpoint,

    /// Final action after a shutdown flush; the runner may exit.
    Terminated,
}
