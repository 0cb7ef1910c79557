//! Per-field statistics table with partial-vector reassembly.
//!
//! A field is registered once with its vector size, the per-rank
//! partition layout of the sending simulations, and the statistics to
//! compute. Inbound messages carry one rank's partition for one
//! (time step, simulation); the table buffers partitions until the full
//! vector is assembled, then folds it into every enabled accumulator of
//! that time step.
//!
//! Time steps are independent: messages may arrive in any order across
//! steps, each step owns its own accumulator set.

use crate::accumulator::{Accumulator, StatisticKind, StatisticSpec};
use crate::error::FieldTableError;
use enstat_types::{ClientRank, SimulationId, TimeStep};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Maximum length of a field name, in bytes.
pub const MAX_FIELD_NAME_LEN: usize = 128;

/// Result of a successful fold call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldOutcome {
    /// Partition stored; other ranks still outstanding.
    Buffered,
    /// Full vector assembled and folded into the step's accumulators.
    Folded,
}

/// Reassembly buffer for one (time step, simulation) sample vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct AssemblyBuffer {
    values: Vec<f64>,
    received: Vec<bool>,
    remaining: usize,
}

impl AssemblyBuffer {
    fn new(vect_size: usize, num_ranks: usize) -> Self {
        Self {
            values: vec![0.0; vect_size],
            received: vec![false; num_ranks],
            remaining: num_ranks,
        }
    }
}

/// Per-field state: layout, enabled statistics, and the accumulator set
/// of every retained time step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FieldState {
    vect_size: usize,
    /// Partition size per client rank; sums to `vect_size`.
    partition_sizes: Vec<usize>,
    /// Element offset of each rank's partition.
    offsets: Vec<usize>,
    specs: Vec<StatisticSpec>,
    steps: BTreeMap<TimeStep, Vec<Accumulator>>,
    pending: BTreeMap<(TimeStep, SimulationId), AssemblyBuffer>,
    finalized: bool,
}

/// The table of all registered fields.
///
/// Field iteration order is registration order (and therefore stable
/// across checkpoint round-trips).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldTable {
    fields: IndexMap<String, FieldState>,
}

impl FieldTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a field.
    ///
    /// `partition_sizes[r]` is the vector length rank `r` of each
    /// simulation reports; the sizes must sum to `vect_size`.
    pub fn register_field(
        &mut self,
        name: &str,
        vect_size: usize,
        partition_sizes: Vec<usize>,
        specs: Vec<StatisticSpec>,
    ) -> Result<(), FieldTableError> {
        if name.len() > MAX_FIELD_NAME_LEN {
            return Err(FieldTableError::FieldNameTooLong {
                len: name.len(),
                max: MAX_FIELD_NAME_LEN,
            });
        }
        if self.fields.contains_key(name) {
            return Err(FieldTableError::FieldAlreadyRegistered {
                name: name.to_string(),
            });
        }
        let partition_total: usize = partition_sizes.iter().sum();
        if partition_total != vect_size || partition_sizes.is_empty() {
            return Err(FieldTableError::PartitionLayoutMismatch {
                vect_size,
                partition_total,
            });
        }
        if specs.is_empty() {
            return Err(FieldTableError::NoStatistics);
        }
        for spec in &specs {
            spec.validate()?;
        }

        let mut offsets = Vec::with_capacity(partition_sizes.len());
        let mut offset = 0;
        for &size in &partition_sizes {
            offsets.push(offset);
            offset += size;
        }

        debug!(field = name, vect_size, ranks = partition_sizes.len(), "field registered");
        self.fields.insert(
            name.to_string(),
            FieldState {
                vect_size,
                partition_sizes,
                offsets,
                specs,
                steps: BTreeMap::new(),
                pending: BTreeMap::new(),
                finalized: false,
            },
        );
        Ok(())
    }

    /// Whether a field is registered.
    pub fn is_registered(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Registered field names, in registration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Vector size of a registered field.
    pub fn vect_size(&self, name: &str) -> Result<usize, FieldTableError> {
        Ok(self.field(name)?.vect_size)
    }

    /// Time steps with folded or pending data for a field, ascending.
    pub fn time_steps(
        &self,
        name: &str,
    ) -> Result<impl Iterator<Item = TimeStep> + '_, FieldTableError> {
        Ok(self.field(name)?.steps.keys().copied())
    }

    /// Fold one rank's partial vector for `(field, time_step, simulation)`.
    ///
    /// Returns [`FoldOutcome::Folded`] once the last outstanding rank
    /// partition arrives and the assembled vector has been applied to
    /// every enabled accumulator of that time step.
    pub fn fold(
        &mut self,
        name: &str,
        time_step: TimeStep,
        simulation: SimulationId,
        rank: ClientRank,
        partial: &[f64],
    ) -> Result<FoldOutcome, FieldTableError> {
        let state = self
            .fields
            .get_mut(name)
            .ok_or_else(|| FieldTableError::UnknownField {
                name: name.to_string(),
            })?;
        if state.finalized {
            return Err(FieldTableError::FieldFinalized {
                name: name.to_string(),
            });
        }
        let num_ranks = state.partition_sizes.len();
        if rank.index() >= num_ranks {
            return Err(FieldTableError::UnknownRank { rank, num_ranks });
        }
        let expected = state.partition_sizes[rank.index()];
        if partial.len() != expected {
            return Err(FieldTableError::SizeMismatch {
                rank,
                expected,
                actual: partial.len(),
            });
        }

        let key = (time_step, simulation);
        let vect_size = state.vect_size;
        let offset = state.offsets[rank.index()];
        let buffer = state
            .pending
            .entry(key)
            .or_insert_with(|| AssemblyBuffer::new(vect_size, num_ranks));
        if buffer.received[rank.index()] {
            return Err(FieldTableError::DuplicatePartition { rank, time_step });
        }
        buffer.values[offset..offset + expected].copy_from_slice(partial);
        buffer.received[rank.index()] = true;
        buffer.remaining -= 1;
        if buffer.remaining > 0 {
            return Ok(FoldOutcome::Buffered);
        }

        let Some(buffer) = state.pending.remove(&key) else {
            return Ok(FoldOutcome::Buffered);
        };
        if !state.steps.contains_key(&time_step) {
            let accumulators = state
                .specs
                .iter()
                .map(|spec| spec.instantiate(vect_size))
                .collect::<Result<Vec<_>, _>>()?;
            state.steps.insert(time_step, accumulators);
        }
        if let Some(accumulators) = state.steps.get_mut(&time_step) {
            for accumulator in accumulators {
                accumulator.increment(&buffer.values, simulation)?;
            }
        }
        debug!(field = name, %time_step, %simulation, "sample folded");
        Ok(FoldOutcome::Folded)
    }

    /// Read-only view of one accumulator.
    pub fn query(
        &self,
        name: &str,
        time_step: TimeStep,
        kind: StatisticKind,
    ) -> Result<&Accumulator, FieldTableError> {
        let state = self.field(name)?;
        let accumulators = state
            .steps
            .get(&time_step)
            .ok_or(FieldTableError::NoSuchTimeStep { time_step })?;
        accumulators
            .iter()
            .find(|a| a.kind() == kind)
            .ok_or(FieldTableError::StatisticNotEnabled { kind })
    }

    /// Mark a field finished: no further folds are accepted and any
    /// partial reassembly buffers are released. Accumulators are kept
    /// for reporting.
    ///
    /// Returns the number of discarded partial buffers.
    pub fn finalize_field(&mut self, name: &str) -> Result<usize, FieldTableError> {
        let state = self
            .fields
            .get_mut(name)
            .ok_or_else(|| FieldTableError::UnknownField {
                name: name.to_string(),
            })?;
        state.finalized = true;
        let dropped = state.pending.len();
        state.pending.clear();
        if dropped > 0 {
            debug!(field = name, dropped, "discarded partial buffers at finalize");
        }
        Ok(dropped)
    }

    /// Pairwise-merge every matching (field, time step) accumulator set
    /// from another shard's table into this one.
    ///
    /// Both tables must declare identical layouts for the fields being
    /// merged. Reassembly buffers are shard-local and are not merged;
    /// callers run this at a reduction boundary where both sides are
    /// quiescent.
    pub fn merge_from(&mut self, other: &FieldTable) -> Result<(), FieldTableError> {
        for (name, other_state) in &other.fields {
            let state = self
                .fields
                .get_mut(name)
                .ok_or_else(|| FieldTableError::UnknownField { name: name.clone() })?;
            if state.vect_size != other_state.vect_size || state.specs != other_state.specs {
                return Err(FieldTableError::IncompatibleMergeLayout { name: name.clone() });
            }
            for (step, other_accumulators) in &other_state.steps {
                match state.steps.get_mut(step) {
                    Some(accumulators) => {
                        for (accumulator, other_accumulator) in
                            accumulators.iter_mut().zip(other_accumulators)
                        {
                            accumulator.merge(other_accumulator)?;
                        }
                    }
                    None => {
                        state.steps.insert(*step, other_accumulators.clone());
                    }
                }
            }
        }
        Ok(())
    }

    fn field(&self, name: &str) -> Result<&FieldState, FieldTableError> {
        self.fields
            .get(name)
            .ok_or_else(|| FieldTableError::UnknownField {
                name: name.to_string(),
            })
    }
}
