//! Deterministic server state machine for in-transit statistics.
//!
//! This crate composes the field table and the fault-tolerance tracker
//! into a single event-driven state machine:
//!
//! ```text
//! transport/coupling layer              runner
//!        │                                │
//!        ▼                                │
//!   Event (data, liveness, timers) ──► Server::handle ──► Vec<Action>
//!                                         │                  │
//!                      FieldTable ◄───────┤                  ▼
//!                      FaultToleranceTracker          report timeouts,
//!                                                     write checkpoint
//! ```
//!
//! The state machine is synchronous, deterministic, and performs no
//! I/O: time is injected via [`StateMachine::set_time`], and all side
//! effects (notifying the orchestrator, persisting checkpoints) are
//! returned as [`Action`]s for the runner to execute. Within a worker,
//! events are handled by a single thread per field shard, so no locking
//! is needed inside the accumulators; cross-shard reduction goes
//! through [`Server::merge_statistics_from`] at an explicit boundary.

mod config;
mod event;
mod state;
mod traits;

pub use config::ServerConfig;
pub use event::{Action, Event};
pub use state::Server;
pub use traits::StateMachine;
