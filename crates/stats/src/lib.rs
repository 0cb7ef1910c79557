//! Incremental, mergeable ensemble statistics.
//!
//! This crate holds the two layers of the statistics pipeline:
//!
//! - [`accumulator`]: the per-statistic state (mean, variance, central
//!   moments up to order 4, min/max with contributing member ids,
//!   stochastic quantile estimates, threshold exceedance counts). Each
//!   accumulator folds one sample vector at a time and can be pairwise
//!   merged with an independently accumulated peer, so cross-shard
//!   reduction never needs raw samples.
//! - [`FieldTable`]: the per-field registry that owns one accumulator
//!   set per retained time step, reassembles partial vectors from the
//!   simulation's client ranks, and answers read-only queries.
//!
//! Accumulators are never mutated concurrently: each (field, time step,
//! shard) is handled by a single thread, and `merge` is the explicit
//! reduction point between shards.

pub mod accumulator;
mod error;
mod field_table;

pub use accumulator::{Accumulator, StatisticKind, StatisticSpec};
pub use error::{AccumulatorError, FieldTableError};
pub use field_table::{FieldTable, FoldOutcome, MAX_FIELD_NAME_LEN};
