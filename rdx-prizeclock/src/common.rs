//! Contains common, primitive types shared across the Prizeclock engine.
//!
//! This module defines the identifiers and small enums used to address
//! presentation surfaces and to name commands. Using distinct types
//! improves type safety and code clarity.

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use std::fmt;

new_key_type! {
    /// Uniquely and safely identifies a presentation surface registered with the hub.
    ///
    /// A closed surface keeps its key; opening the same role again yields a
    /// fresh key, so a stale id can never address the new surface.
    pub struct SurfaceId;
}

/// The part a presentation surface plays in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SurfaceRole {
    /// The primary panel. Closing it ends the session.
    Controller,
    /// Renders the wheel and plays back spins.
    WheelDisplay,
    /// Renders the countdown.
    TimerDisplay,
}

impl fmt::Display for SurfaceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SurfaceRole::Controller => "controller",
            SurfaceRole::WheelDisplay => "wheel",
            SurfaceRole::TimerDisplay => "timer",
        };
        f.write_str(label)
    }
}

/// The display surfaces a controller can toggle or open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    Wheel,
    Timer,
}

impl WindowKind {
    pub fn role(self) -> SurfaceRole {
        match self {
            WindowKind::Wheel => SurfaceRole::WheelDisplay,
            WindowKind::Timer => SurfaceRole::TimerDisplay,
        }
    }
}

/// The `timer-control` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimerCommand {
    StartPause,
    Reset,
}
