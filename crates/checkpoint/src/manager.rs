//! Checkpoint encoding, atomic save, and recoverable load.

use bincode::config;
use enstat_stats::FieldTable;
use enstat_tracker::FaultToleranceTracker;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Magic bytes at the start of every checkpoint file.
const MAGIC: [u8; 8] = *b"ENSTCKPT";

/// Current checkpoint format version.
pub const FORMAT_VERSION: u32 = 1;

/// Errors from checkpoint save/load.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// No usable checkpoint at the source (missing, truncated, wrong
    /// magic, incompatible version, or undecodable body). Recoverable:
    /// the caller falls back to a cold start.
    #[error("Checkpoint unavailable: {0}")]
    Unavailable(String),

    /// Persisting a checkpoint failed. Escalated by the server: a
    /// silently lost checkpoint defeats fault tolerance.
    #[error("Checkpoint write failed: {0}")]
    Write(String),
}

/// Everything a restart needs, encoded as the checkpoint body.
#[derive(Serialize, Deserialize)]
struct CheckpointBody {
    field_table: FieldTable,
    tracker: FaultToleranceTracker,
}

/// Serializes and restores the field table and simulation registry.
///
/// Owns only the destination path; live state stays with its owners and
/// is borrowed for the duration of a save.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    path: PathBuf,
}

impl CheckpointManager {
    /// Create a manager writing to (and reading from) `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The checkpoint file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot both stores to the checkpoint file, atomically.
    pub fn save(
        &self,
        field_table: &FieldTable,
        tracker: &FaultToleranceTracker,
    ) -> Result<(), CheckpointError> {
        let body = CheckpointBody {
            field_table: field_table.clone(),
            tracker: tracker.clone(),
        };
        let encoded = bincode::serde::encode_to_vec(&body, config::standard())
            .map_err(|e| CheckpointError::Write(e.to_string()))?;

        let dir = self.path.parent().filter(|p| !p.as_os_str().is_empty());
        let mut tmp = tempfile::NamedTempFile::new_in(dir.unwrap_or_else(|| Path::new(".")))
            .map_err(|e| CheckpointError::Write(e.to_string()))?;
        tmp.write_all(&MAGIC)
            .and_then(|_| tmp.write_all(&FORMAT_VERSION.to_le_bytes()))
            .and_then(|_| tmp.write_all(&encoded))
            .and_then(|_| tmp.flush())
            .map_err(|e| CheckpointError::Write(e.to_string()))?;
        tmp.persist(&self.path)
            .map_err(|e| CheckpointError::Write(e.to_string()))?;

        info!(
            path = %self.path.display(),
            bytes = MAGIC.len() + 4 + encoded.len(),
            "checkpoint saved"
        );
        Ok(())
    }

    /// Restore both stores from the checkpoint file.
    pub fn load(&self) -> Result<(FieldTable, FaultToleranceTracker), CheckpointError> {
        let bytes = fs::read(&self.path)
            .map_err(|e| CheckpointError::Unavailable(format!("{}: {e}", self.path.display())))?;
        if bytes.len() < MAGIC.len() + 4 {
            return Err(CheckpointError::Unavailable(format!(
                "truncated header ({} bytes)",
                bytes.len()
            )));
        }
        if bytes[..MAGIC.len()] != MAGIC {
            return Err(CheckpointError::Unavailable(
                "bad magic (not a checkpoint file)".to_string(),
            ));
        }
        let mut version_bytes = [0u8; 4];
        version_bytes.copy_from_slice(&bytes[MAGIC.len()..MAGIC.len() + 4]);
        let version = u32::from_le_bytes(version_bytes);
        if version != FORMAT_VERSION {
            return Err(CheckpointError::Unavailable(format!(
                "format version {version}, expected {FORMAT_VERSION}"
            )));
        }

        let body: CheckpointBody =
            bincode::serde::decode_from_slice(&bytes[MAGIC.len() + 4..], config::standard())
                .map(|(body, _)| body)
                .map_err(|e| CheckpointError::Unavailable(e.to_string()))?;

        info!(
            path = %self.path.display(),
            fields = body.field_table.field_names().count(),
            simulations = body.tracker.len(),
            "checkpoint loaded"
        );
        Ok((body.field_table, body.tracker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enstat_stats::{StatisticKind, StatisticSpec};
    use enstat_types::{ClientRank, JobId, SimulationId, TimeStep};
    use std::time::Duration;

    fn populated_state() -> (FieldTable, FaultToleranceTracker) {
        let mut table = FieldTable::new();
        table
            .register_field(
                "energy",
                3,
                vec![2, 1],
                vec![
                    StatisticSpec::Variance,
                    StatisticSpec::Moments { max_order: 4 },
                    StatisticSpec::MinMax,
                    StatisticSpec::Quantile {
                        alphas: vec![0.1, 0.5, 0.9],
                        gain: 1.0,
                    },
                    StatisticSpec::ThresholdExceedance { threshold: 0.5 },
                ],
            )
            .unwrap();
        for sim in 0..4u64 {
            for step in 0..3u64 {
                let base = sim as f64 + step as f64 * 0.1;
                table
                    .fold(
                        "energy",
                        TimeStep(step),
                        SimulationId(sim),
                        ClientRank(0),
                        &[base, base + 1.0],
                    )
                    .unwrap();
                table
                    .fold(
                        "energy",
                        TimeStep(step),
                        SimulationId(sim),
                        ClientRank(1),
                        &[base + 2.0],
                    )
                    .unwrap();
            }
        }
        // One partial vector left in flight: rank 1 still outstanding.
        table
            .fold(
                "energy",
                TimeStep(3),
                SimulationId(0),
                ClientRank(0),
                &[7.0, 8.0],
            )
            .unwrap();

        let mut tracker = FaultToleranceTracker::new();
        for sim in 0..4u64 {
            let handle = tracker
                .admit(
                    SimulationId(sim),
                    JobId::new(format!("job-{sim}")).unwrap(),
                    vec![sim as f64, 0.25],
                    Duration::ZERO,
                )
                .unwrap();
            tracker
                .on_message(handle, TimeStep(2), Duration::from_secs(sim))
                .unwrap();
        }
        (table, tracker)
    }

    #[test]
    fn test_round_trip_structural_equality() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path().join("server.ckpt"));

        let (table, tracker) = populated_state();
        manager.save(&table, &tracker).unwrap();
        let (loaded_table, loaded_tracker) = manager.load().unwrap();

        assert_eq!(loaded_table, table);
        assert_eq!(loaded_tracker, tracker);
    }

    #[test]
    fn test_load_then_fold_equals_never_checkpointed() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path().join("server.ckpt"));

        let (mut table, tracker) = populated_state();
        manager.save(&table, &tracker).unwrap();
        let (mut loaded_table, _) = manager.load().unwrap();

        // Complete the in-flight vector on both sides: the pending
        // rank-0 partition survived the round trip.
        for t in [&mut table, &mut loaded_table] {
            t.fold(
                "energy",
                TimeStep(3),
                SimulationId(0),
                ClientRank(1),
                &[9.0],
            )
            .unwrap();
        }
        assert_eq!(loaded_table, table);

        let acc = loaded_table
            .query("energy", TimeStep(3), StatisticKind::Variance)
            .unwrap();
        assert_eq!(acc.sample_count(), 1);
    }

    #[test]
    fn test_increment_counts_resume() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path().join("server.ckpt"));

        let (table, tracker) = populated_state();
        let before = table
            .query("energy", TimeStep(0), StatisticKind::Variance)
            .unwrap()
            .sample_count();
        manager.save(&table, &tracker).unwrap();
        let (mut loaded, _) = manager.load().unwrap();

        for sim in 10..13u64 {
            loaded
                .fold("energy", TimeStep(0), SimulationId(sim), ClientRank(0), &[0.0, 0.0])
                .unwrap();
            loaded
                .fold("energy", TimeStep(0), SimulationId(sim), ClientRank(1), &[0.0])
                .unwrap();
        }
        let after = loaded
            .query("energy", TimeStep(0), StatisticKind::Variance)
            .unwrap()
            .sample_count();
        assert_eq!(after, before + 3);
    }

    #[test]
    fn test_missing_file_is_recoverable() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path().join("nope.ckpt"));
        assert!(matches!(
            manager.load(),
            Err(CheckpointError::Unavailable(_))
        ));
    }

    #[test]
    fn test_truncated_and_corrupt_files_are_recoverable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.ckpt");
        let manager = CheckpointManager::new(&path);

        fs::write(&path, b"ENST").unwrap();
        assert!(matches!(
            manager.load(),
            Err(CheckpointError::Unavailable(_))
        ));

        fs::write(&path, b"NOTACKPT\x01\x00\x00\x00garbage").unwrap();
        assert!(matches!(
            manager.load(),
            Err(CheckpointError::Unavailable(_))
        ));

        // Right magic, wrong version.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"ENSTCKPT");
        bytes.extend_from_slice(&99u32.to_le_bytes());
        fs::write(&path, &bytes).unwrap();
        assert!(matches!(
            manager.load(),
            Err(CheckpointError::Unavailable(_))
        ));

        // Valid header, undecodable body.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"ENSTCKPT");
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&[0xff; 7]);
        fs::write(&path, &bytes).unwrap();
        assert!(matches!(
            manager.load(),
            Err(CheckpointError::Unavailable(_))
        ));
    }

    #[test]
    fn test_save_overwrites_previous_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path().join("server.ckpt"));

        let (mut table, tracker) = populated_state();
        manager.save(&table, &tracker).unwrap();

        table
            .register_field("pressure", 1, vec![1], vec![StatisticSpec::Mean])
            .unwrap();
        manager.save(&table, &tracker).unwrap();

        let (loaded, _) = manager.load().unwrap();
        assert!(loaded.is_registered("pressure"));
    }
}
