//! Checkpoint/restart for the statistics server.
//!
//! # File format
//!
//! ```text
//! [8-byte magic "ENSTCKPT"][u32 LE format version][bincode body]
//! ```
//!
//! The body is the bincode encoding of the full field table and the
//! simulation registry: raw accumulator internals and increment counts,
//! not derived metrics, so loading a checkpoint and folding one more
//! sample is bit-for-bit identical to never having checkpointed.
//!
//! Saves are atomic: the file is written to a temporary sibling and
//! renamed into place, so a crash mid-write never leaves a truncated
//! checkpoint behind. A missing, truncated, or incompatible file loads
//! as [`CheckpointError::Unavailable`], which callers treat as a cold
//! start; a failed save is escalated instead, because silently losing
//! persisted state defeats fault tolerance.

mod manager;

pub use manager::{CheckpointError, CheckpointManager, FORMAT_VERSION};
