//! Simulation lifecycle and timeout detection.

use crate::store::{SlotHandle, SlotStore};
use enstat_types::{JobId, JobStatus, SimulationId, SimulationStatus, TimeStep, TimeoutReport};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from the fault-tolerance tracker.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrackerError {
    /// An ensemble member with this id was already admitted.
    #[error("{0} already admitted")]
    AlreadyAdmitted(SimulationId),

    /// Handle does not resolve to a live simulation record.
    #[error("Unknown simulation handle {0}")]
    UnknownSimulation(SlotHandle),
}

/// Registry record for one ensemble member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRecord {
    /// Launcher-assigned ensemble member id.
    pub id: SimulationId,

    /// External scheduler job identifier.
    pub job_id: JobId,

    /// Scheduler-reported job state (opaque to this core).
    pub job_status: JobStatus,

    /// Server-side lifecycle status.
    pub status: SimulationStatus,

    /// Sampled input parameters of this member.
    pub parameters: Vec<f64>,

    /// Last time step seen in a data message.
    pub last_time_step: TimeStep,

    /// Monotonic clock sample of the last message (since server start).
    pub last_message_time: Duration,

    /// Set once by the timeout sweep; never re-reported.
    pub timeout: bool,
}

/// Registry of in-flight simulations with timeout detection.
///
/// Mutated only by the thread handling inbound liveness events; the
/// periodic sweep runs on the same thread (single-writer model, see the
/// server crate).
///
/// Records are never deleted mid-run: they are retained for post-hoc
/// reporting and checkpoint symmetry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaultToleranceTracker {
    simulations: SlotStore<SimulationRecord>,
    /// Id lookup for the inbound message path.
    by_id: BTreeMap<SimulationId, SlotHandle>,
}

impl FaultToleranceTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of admitted ensemble members.
    pub fn len(&self) -> usize {
        self.simulations.len()
    }

    /// Whether no members have been admitted.
    pub fn is_empty(&self) -> bool {
        self.simulations.is_empty()
    }

    /// Admit a new ensemble member.
    ///
    /// `now` seeds `last_message_time` so a member that never sends a
    /// single message still times out eventually.
    pub fn admit(
        &mut self,
        id: SimulationId,
        job_id: JobId,
        parameters: Vec<f64>,
        now: Duration,
    ) -> Result<SlotHandle, TrackerError> {
        if self.by_id.contains_key(&id) {
            return Err(TrackerError::AlreadyAdmitted(id));
        }
        let handle = self.simulations.insert(SimulationRecord {
            id,
            job_id,
            job_status: JobStatus::default(),
            status: SimulationStatus::NotStarted,
            parameters,
            last_time_step: TimeStep::FIRST,
            last_message_time: now,
            timeout: false,
        });
        self.by_id.insert(id, handle);
        debug!(%id, %handle, "simulation admitted");
        Ok(handle)
    }

    /// Resolve an ensemble member id to its handle.
    pub fn handle_for(&self, id: SimulationId) -> Option<SlotHandle> {
        self.by_id.get(&id).copied()
    }

    /// Read a simulation record.
    pub fn record(&self, handle: SlotHandle) -> Option<&SimulationRecord> {
        self.simulations.get(handle)
    }

    /// Refresh liveness from a data message.
    ///
    /// Marks the member running, advances `last_time_step` monotonically
    /// and stamps `last_message_time`.
    pub fn on_message(
        &mut self,
        handle: SlotHandle,
        time_step: TimeStep,
        now: Duration,
    ) -> Result<(), TrackerError> {
        let record = self
            .simulations
            .get_mut(handle)
            .ok_or(TrackerError::UnknownSimulation(handle))?;
        if record.status == SimulationStatus::NotStarted {
            record.status = SimulationStatus::Running;
        }
        record.last_time_step = record.last_time_step.max(time_step);
        record.last_message_time = now;
        Ok(())
    }

    /// Mark a member completed.
    ///
    /// Completion is only ever driven by an explicit external signal
    /// (last time step reached or finalize call), never inferred from
    /// silence.
    pub fn mark_completed(&mut self, handle: SlotHandle) -> Result<(), TrackerError> {
        let record = self
            .simulations
            .get_mut(handle)
            .ok_or(TrackerError::UnknownSimulation(handle))?;
        record.status = SimulationStatus::Completed;
        Ok(())
    }

    /// Update the scheduler-reported job status of a member.
    pub fn set_job_status(
        &mut self,
        handle: SlotHandle,
        status: JobStatus,
    ) -> Result<(), TrackerError> {
        let record = self
            .simulations
            .get_mut(handle)
            .ok_or(TrackerError::UnknownSimulation(handle))?;
        record.job_status = status;
        Ok(())
    }

    /// Count members whose scheduler job status equals `status`.
    pub fn count_by_job_status(&self, status: JobStatus) -> usize {
        self.simulations
            .iter()
            .filter(|(_, r)| r.job_status == status)
            .count()
    }

    /// Count members by server-side lifecycle status.
    pub fn count_by_status(&self, status: SimulationStatus) -> usize {
        self.simulations
            .iter()
            .filter(|(_, r)| r.status == status)
            .count()
    }

    /// Scan for members that stopped reporting.
    ///
    /// A member is reported when it is running (or admitted and never
    /// heard from), not yet flagged, and silent for longer than
    /// `threshold`. The flag makes reporting idempotent: repeated sweeps
    /// never re-report the same member.
    pub fn sweep_timeouts(&mut self, now: Duration, threshold: Duration) -> Vec<TimeoutReport> {
        let mut reports = Vec::new();
        for (handle, record) in self.simulations.iter_mut() {
            if record.timeout || record.status == SimulationStatus::Completed {
                continue;
            }
            let silence = now.saturating_sub(record.last_message_time);
            if silence > threshold {
                record.timeout = true;
                warn!(
                    id = %record.id,
                    %handle,
                    job_id = %record.job_id,
                    silence_secs = silence.as_secs_f64(),
                    "simulation timed out"
                );
                reports.push(TimeoutReport {
                    job_id: record.job_id.clone(),
                    parameters: record.parameters.clone(),
                    last_time_step: record.last_time_step,
                });
            }
        }
        reports
    }

    /// Iterate all records in slot order (admission order).
    pub fn iter(&self) -> impl Iterator<Item = (SlotHandle, &SimulationRecord)> {
        self.simulations.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: &str) -> JobId {
        JobId::new(id).unwrap()
    }

    #[test]
    fn test_admit_and_duplicate() {
        let mut tracker = FaultToleranceTracker::new();
        let handle = tracker
            .admit(SimulationId(0), job("j0"), vec![0.5], Duration::ZERO)
            .unwrap();
        assert_eq!(tracker.handle_for(SimulationId(0)), Some(handle));
        assert_eq!(
            tracker.admit(SimulationId(0), job("j0"), vec![0.5], Duration::ZERO),
            Err(TrackerError::AlreadyAdmitted(SimulationId(0)))
        );
        let record = tracker.record(handle).unwrap();
        assert_eq!(record.status, SimulationStatus::NotStarted);
        assert_eq!(record.parameters, vec![0.5]);
    }

    #[test]
    fn test_on_message_updates_liveness() {
        let mut tracker = FaultToleranceTracker::new();
        let handle = tracker
            .admit(SimulationId(1), job("j1"), vec![], Duration::ZERO)
            .unwrap();

        tracker
            .on_message(handle, TimeStep(5), Duration::from_secs(10))
            .unwrap();
        let record = tracker.record(handle).unwrap();
        assert_eq!(record.status, SimulationStatus::Running);
        assert_eq!(record.last_time_step, TimeStep(5));
        assert_eq!(record.last_message_time, Duration::from_secs(10));

        // Out-of-order message does not move the step backwards.
        tracker
            .on_message(handle, TimeStep(3), Duration::from_secs(11))
            .unwrap();
        let record = tracker.record(handle).unwrap();
        assert_eq!(record.last_time_step, TimeStep(5));
        assert_eq!(record.last_message_time, Duration::from_secs(11));
    }

    #[test]
    fn test_timeout_reported_exactly_once() {
        let threshold = Duration::from_secs(60);
        let mut tracker = FaultToleranceTracker::new();
        tracker
            .admit(SimulationId(0), job("stalled"), vec![1.0, 2.0], Duration::ZERO)
            .unwrap();

        // Not silent long enough yet.
        assert!(tracker.sweep_timeouts(threshold, threshold).is_empty());

        let now = threshold + Duration::from_secs(1);
        let reports = tracker.sweep_timeouts(now, threshold);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].job_id, job("stalled"));
        assert_eq!(reports[0].parameters, vec![1.0, 2.0]);
        assert_eq!(reports[0].last_time_step, TimeStep::FIRST);

        // Repeated sweeps stay silent.
        assert!(tracker.sweep_timeouts(now, threshold).is_empty());
        assert!(tracker
            .sweep_timeouts(now + Duration::from_secs(1000), threshold)
            .is_empty());
    }

    #[test]
    fn test_completed_member_never_times_out() {
        let threshold = Duration::from_secs(60);
        let mut tracker = FaultToleranceTracker::new();
        let handle = tracker
            .admit(SimulationId(0), job("done"), vec![], Duration::ZERO)
            .unwrap();
        tracker.on_message(handle, TimeStep(9), Duration::ZERO).unwrap();
        tracker.mark_completed(handle).unwrap();

        let reports = tracker.sweep_timeouts(Duration::from_secs(3600), threshold);
        assert!(reports.is_empty());
    }

    #[test]
    fn test_liveness_refresh_defers_timeout() {
        let threshold = Duration::from_secs(60);
        let mut tracker = FaultToleranceTracker::new();
        let handle = tracker
            .admit(SimulationId(0), job("alive"), vec![], Duration::ZERO)
            .unwrap();

        tracker
            .on_message(handle, TimeStep(1), Duration::from_secs(50))
            .unwrap();
        // 61s after start but only 11s after the last message.
        assert!(tracker
            .sweep_timeouts(Duration::from_secs(61), threshold)
            .is_empty());
    }

    #[test]
    fn test_job_status_census() {
        let mut tracker = FaultToleranceTracker::new();
        for i in 0..4 {
            tracker
                .admit(SimulationId(i), job(&format!("j{i}")), vec![], Duration::ZERO)
                .unwrap();
        }
        let h2 = tracker.handle_for(SimulationId(2)).unwrap();
        tracker.set_job_status(h2, JobStatus::Running).unwrap();
        let h3 = tracker.handle_for(SimulationId(3)).unwrap();
        tracker.set_job_status(h3, JobStatus::Failed).unwrap();

        assert_eq!(tracker.count_by_job_status(JobStatus::NotSubmitted), 2);
        assert_eq!(tracker.count_by_job_status(JobStatus::Running), 1);
        assert_eq!(tracker.count_by_job_status(JobStatus::Failed), 1);
        assert_eq!(tracker.count_by_job_status(JobStatus::Finished), 0);
    }

    #[test]
    fn test_stale_handle_is_rejected() {
        let mut tracker = FaultToleranceTracker::new();
        let handle = tracker
            .admit(SimulationId(0), job("j"), vec![], Duration::ZERO)
            .unwrap();
        let other = FaultToleranceTracker::new();
        assert!(other.record(handle).is_none());
        assert_eq!(
            FaultToleranceTracker::new().handle_for(SimulationId(0)),
            None
        );
        // A live handle still resolves.
        assert!(tracker.record(handle).is_some());
    }
}
