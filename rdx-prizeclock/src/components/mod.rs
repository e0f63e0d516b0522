//! The building blocks the `StateHub` is assembled from.
//!
//! Each component owns one concern of a session: evaluating the time-delta
//! expressions, picking a winner, counting down, and tracking which
//! presentation surfaces are live. None of them know about the engine or
//! its channels.

pub mod expr;
pub mod registry;
pub mod selector;
pub mod timer;
