//! Ensemble member registry and fault-tolerance tracking.
//!
//! [`SlotStore`] is the generic arena backing the registry: stable
//! generation-counted handles instead of raw indices, so references held
//! by the coupling layer never dangle across removals.
//!
//! [`FaultToleranceTracker`] owns one record per admitted ensemble
//! member and implements the periodic timeout sweep that detects
//! stalled simulations among thousands of concurrent jobs. Time is
//! caller-provided (a monotonic `Duration` since server start); the
//! tracker itself never reads a clock.

mod store;
mod tracker;

pub use store::{SlotHandle, SlotStore};
pub use tracker::{FaultToleranceTracker, SimulationRecord, TrackerError};
