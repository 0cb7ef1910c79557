//! Core types for the enstat in-transit statistics server.
//!
//! Shared identifiers, lifecycle enums, and the message/report types
//! exchanged between the server core and its transport/notifier
//! collaborators.

mod identifiers;
mod lifecycle;
mod message;

pub use identifiers::{ClientRank, IdError, JobId, SimulationId, TimeStep, MAX_JOB_ID_LEN};
pub use lifecycle::{JobStatus, SimulationStatus};
pub use message::{DataMessage, TimeoutReport};
