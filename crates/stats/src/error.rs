//! Error types for accumulators and the field table.

use crate::accumulator::StatisticKind;
use enstat_types::{ClientRank, TimeStep};
use thiserror::Error;

/// Errors from individual accumulators.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AccumulatorError {
    /// Sample vector length does not match the accumulator's vector size.
    #[error("Sample length {actual} does not match vector size {expected}")]
    SampleLengthMismatch { expected: usize, actual: usize },

    /// Merge partners have different vector sizes.
    #[error("Cannot merge accumulators of vector sizes {left} and {right}")]
    ShapeMismatch { left: usize, right: usize },

    /// Merge partners are different statistic kinds.
    #[error("Cannot merge {left} accumulator with {right} accumulator")]
    KindMismatch {
        left: StatisticKind,
        right: StatisticKind,
    },

    /// Statistic queried before any sample was folded.
    #[error("Statistic queried before any sample was folded")]
    NoSamples,

    /// Moment order queried above the configured maximum.
    #[error("Moment order {requested} not tracked (max order {max_order})")]
    OrderNotTracked { requested: u8, max_order: u8 },

    /// Moments accumulator configured with an order outside 1..=4.
    #[error("Invalid maximum moment order {max_order} (must be 1..=4)")]
    InvalidOrder { max_order: u8 },

    /// Quantile level outside the open interval (0, 1).
    #[error("Quantile level {alpha} outside (0, 1)")]
    InvalidQuantileLevel { alpha: f64 },

    /// Quantile gain constant must be positive and finite.
    #[error("Quantile gain {gain} must be positive and finite")]
    InvalidGain { gain: f64 },

    /// Merge partners configured with different thresholds.
    #[error("Cannot merge accumulators with thresholds {left} and {right}")]
    ThresholdMismatch { left: f64, right: f64 },

    /// Merge partners configured with different quantile level sets.
    #[error("Cannot merge quantile accumulators with different level sets")]
    QuantileLevelsMismatch,

    /// Quantile accumulator configured with no levels.
    #[error("Quantile accumulator requires at least one level")]
    NoQuantileLevels,

    /// Quantile level index out of range.
    #[error("Quantile level index {index} out of range ({count} levels)")]
    QuantileIndexOutOfRange { index: usize, count: usize },
}

/// Errors from the field table.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FieldTableError {
    /// Field was never registered.
    #[error("Unknown field '{name}'")]
    UnknownField { name: String },

    /// Field registered twice.
    #[error("Field '{name}' already registered")]
    FieldAlreadyRegistered { name: String },

    /// Field name exceeds the length bound.
    #[error("Field name of {len} bytes exceeds maximum {max}")]
    FieldNameTooLong { len: usize, max: usize },

    /// Partition sizes do not sum to the declared vector size.
    #[error("Partition sizes sum to {partition_total}, expected vector size {vect_size}")]
    PartitionLayoutMismatch {
        vect_size: usize,
        partition_total: usize,
    },

    /// Field registered with no enabled statistics.
    #[error("Field registered with no enabled statistics")]
    NoStatistics,

    /// Sender rank outside the declared partition layout.
    #[error("Rank {rank} outside declared layout of {num_ranks} ranks")]
    UnknownRank { rank: ClientRank, num_ranks: usize },

    /// Partial vector length does not match the rank's partition size.
    #[error("Partial vector of length {actual} from {rank}, expected {expected}")]
    SizeMismatch {
        rank: ClientRank,
        expected: usize,
        actual: usize,
    },

    /// Same rank delivered its partition twice for one (step, member) key.
    #[error("Duplicate partition from {rank} at {time_step}")]
    DuplicatePartition { rank: ClientRank, time_step: TimeStep },

    /// Message arrived for a field already finalized.
    #[error("Field '{name}' is finalized; message dropped")]
    FieldFinalized { name: String },

    /// No accumulator set exists for the requested time step.
    #[error("No data folded for {time_step}")]
    NoSuchTimeStep { time_step: TimeStep },

    /// Requested statistic was not enabled for this field.
    #[error("Statistic {kind} not enabled for this field")]
    StatisticNotEnabled { kind: StatisticKind },

    /// Merge partner table declares an incompatible field layout.
    #[error("Field '{name}' has incompatible layout in merge partner")]
    IncompatibleMergeLayout { name: String },

    /// Underlying accumulator failure.
    #[error(transparent)]
    Accumulator(#[from] AccumulatorError),
}
