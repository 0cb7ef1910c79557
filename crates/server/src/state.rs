//! The server state machine.

use crate::{Action, Event, ServerConfig, StateMachine};
use enstat_stats::{FieldTable, FieldTableError, StatisticSpec};
use enstat_tracker::{FaultToleranceTracker, TrackerError};
use enstat_types::DataMessage;
use std::time::Duration;
use tracing::{debug, info, warn};

/// The in-transit statistics server for one field shard.
///
/// Owns the field table and the simulation registry; processes inbound
/// events one at a time. Protocol errors (malformed or mismatched
/// messages, unknown entities) are logged and dropped; the ensemble
/// keeps running. Only checkpoint write failures are escalated, and
/// that happens in the runner executing [`Action::WriteCheckpoint`].
pub struct Server {
    table: FieldTable,
    tracker: FaultToleranceTracker,
    config: ServerConfig,
    now: Duration,
}

impl Server {
    /// Create a cold-started server.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            table: FieldTable::new(),
            tracker: FaultToleranceTracker::new(),
            config,
            now: Duration::ZERO,
        }
    }

    /// Create a server from checkpointed state.
    pub fn restore(
        config: ServerConfig,
        table: FieldTable,
        tracker: FaultToleranceTracker,
    ) -> Self {
        info!(
            fields = table.field_names().count(),
            simulations = tracker.len(),
            "server restored from checkpoint"
        );
        Self {
            table,
            tracker,
            config,
            now: Duration::ZERO,
        }
    }

    /// The server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Read-only view of the field table (query surface for the result
    /// writer).
    pub fn field_table(&self) -> &FieldTable {
        &self.table
    }

    /// Read-only view of the simulation registry.
    pub fn tracker(&self) -> &FaultToleranceTracker {
        &self.tracker
    }

    /// Register a field before data starts flowing.
    pub fn register_field(
        &mut self,
        name: &str,
        vect_size: usize,
        partition_sizes: Vec<usize>,
        specs: Vec<StatisticSpec>,
    ) -> Result<(), FieldTableError> {
        self.table
            .register_field(name, vect_size, partition_sizes, specs)
    }

    /// Mark a field finished, releasing its reassembly buffers.
    pub fn finalize_field(&mut self, name: &str) -> Result<usize, FieldTableError> {
        self.table.finalize_field(name)
    }

    /// Fold another shard's accumulated statistics into this server.
    ///
    /// This is the cross-shard reduction primitive; the reduction
    /// topology (typically a tree across workers) is the caller's
    /// choice. Both shards must be at a quiescent boundary.
    pub fn merge_statistics_from(&mut self, other: &FieldTable) -> Result<(), FieldTableError> {
        self.table.merge_from(other)
    }

    fn on_sample(&mut self, message: DataMessage) {
        // Liveness first: the member is alive even if the payload turns
        // out to be malformed.
        match self.tracker.handle_for(message.simulation_id) {
            Some(handle) => {
                if let Err(TrackerError::UnknownSimulation(handle)) =
                    self.tracker.on_message(handle, message.time_step, self.now)
                {
                    warn!(%handle, "liveness update for stale handle; message dropped");
                    return;
                }
            }
            None => {
                warn!(
                    simulation = %message.simulation_id,
                    field = %message.field_name,
                    "data from unadmitted simulation; message dropped"
                );
                return;
            }
        }

        match self.table.fold(
            &message.field_name,
            message.time_step,
            message.simulation_id,
            message.rank,
            &message.payload,
        ) {
            Ok(outcome) => {
                debug!(
                    field = %message.field_name,
                    step = %message.time_step,
                    simulation = %message.simulation_id,
                    rank = %message.rank,
                    ?outcome,
                    "sample handled"
                );
            }
            Err(error) => {
                // Protocol and unknown-entity errors are non-fatal: log
                // and drop, the ensemble continues.
                warn!(
                    field = %message.field_name,
                    simulation = %message.simulation_id,
                    rank = %message.rank,
                    %error,
                    "message dropped"
                );
            }
        }
    }
}

impl StateMachine for Server {
    fn handle(&mut self, event: Event) -> Vec<Action> {
        match event {
            Event::SimulationConnected {
                id,
                job_id,
                parameters,
            } => {
                match self.tracker.admit(id, job_id, parameters, self.now) {
                    Ok(handle) => debug!(%id, %handle, "simulation connected"),
                    // Reconnection after a transport hiccup; keep the
                    // existing record.
                    Err(TrackerError::AlreadyAdmitted(id)) => {
                        warn!(%id, "duplicate connection ignored")
                    }
                    Err(error) => warn!(%id, %error, "admission failed"),
                }
                Vec::new()
            }
            Event::SampleReceived(message) => {
                self.on_sample(message);
                Vec::new()
            }
            Event::SimulationFinished { id } => {
                match self.tracker.handle_for(id) {
                    Some(handle) => {
                        if let Err(error) = self.tracker.mark_completed(handle) {
                            warn!(%id, %error, "completion signal dropped");
                        }
                    }
                    None => warn!(%id, "completion signal for unknown simulation"),
                }
                Vec::new()
            }
            Event::JobStatusChanged { id, status } => {
                match self.tracker.handle_for(id) {
                    Some(handle) => {
                        if let Err(error) = self.tracker.set_job_status(handle, status) {
                            warn!(%id, %error, "job status update dropped");
                        }
                    }
                    None => warn!(%id, %status, "job status for unknown simulation"),
                }
                Vec::new()
            }
            Event::SweepTimer => {
                let reports = self
                    .tracker
                    .sweep_timeouts(self.now, self.config.timeout_threshold);
                if reports.is_empty() {
                    Vec::new()
                } else {
                    info!(count = reports.len(), "reporting timed-out simulations");
                    vec![Action::ReportTimeouts(reports)]
                }
            }
            Event::CheckpointTimer => vec![Action::WriteCheckpoint],
            Event::Shutdown => {
                info!("shutdown requested; flushing state");
                vec![Action::WriteCheckpoint, Action::Terminated]
            }
        }
    }

    fn set_time(&mut self, now: Duration) {
        self.now = now;
    }

    fn now(&self) -> Duration {
        self.now
    }
}
