//! Core trait for the server state machine.

use crate::{Action, Event};
use std::time::Duration;

/// An event-driven state machine.
///
/// All server logic is synchronous and deterministic: same state + same
/// event = same actions, with no I/O and no clock reads. The runner
/// injects time before each `handle` call and executes the returned
/// actions (timeout notification, checkpoint writes).
pub trait StateMachine {
    /// Process an event, returning actions for the runner to execute.
    fn handle(&mut self, event: Event) -> Vec<Action>;

    /// Set the current time (monotonic, since server start).
    ///
    /// Called by the runner before each `handle()` call.
    fn set_time(&mut self, now: Duration);

    /// The time last set via `set_time()`.
    fn now(&self) -> Duration;
}
