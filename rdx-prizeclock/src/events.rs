//! Defines all outbound event types published by the Prizeclock engine.
//!
//! `HubMessage` is what a presentation surface receives on its outbox.
//! `SystemEvent` is a broadcast stream about the engine itself, meant for
//! logging and observers rather than rendering.

use crate::common::{SurfaceId, SurfaceRole};
use crate::components::selector::SpinPlan;
use crate::session::{ColorTheme, FontSelection, SessionState, Segment, WheelOption};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// Which display surfaces are currently open. Only the controller gets this.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSummary {
    pub wheel_display_open: bool,
    pub timer_display_open: bool,
}

/// A message from the hub to one presentation surface.
#[derive(Debug, Clone, PartialEq)]
pub enum HubMessage {
    /// `time-update`: the formatted countdown.
    TimeUpdate(String),
    /// `wheel-updated`: the option list and its drawable segments.
    WheelUpdated {
        options: Vec<WheelOption>,
        segments: Vec<Segment>,
    },
    /// `window-state-update`: display liveness, controller only.
    WindowStateUpdate(WindowSummary),
    /// `load-state`: a full snapshot, sent on restore and after import.
    LoadState(SessionState),
    ThemeUpdate(ColorTheme),
    FontChange(FontSelection),
    /// A spin whose winner is already fixed, for playback.
    SpinPlanned(SpinPlan),
    /// An edit was refused. Sent to the editing surface only.
    EditRejected { reason: String },
    /// Result of an export. Sent to the requesting surface only.
    ExportFinished(Result<PathBuf, String>),
    /// An import failed; state is unchanged. Sent to the requesting surface only.
    ImportFailed { reason: String },
    /// The surface is already open; bring it forward.
    Focus,
    /// The surface has been closed by the hub and should tear itself down.
    Close,
}

/// Events related to the lifecycle and state of the engine itself.
#[derive(Debug, Clone)]
pub enum SystemEvent {
    /// Fired once when the engine's dispatcher begins.
    EngineStarted { at: DateTime<Utc> },
    /// Fired when the session was built from an autosave instead of defaults.
    SessionRestored { path: PathBuf },
    /// Fired when a surface is registered.
    SurfaceOpened { id: SurfaceId, role: SurfaceRole },
    /// Fired when a surface stops being live.
    SurfaceClosed { id: SurfaceId, role: SurfaceRole },
    /// Fired after a successful autosave.
    Autosaved { path: PathBuf, at: DateTime<Utc> },
    /// Fired once when the session is over and the engine is about to exit.
    SessionEnded { at: DateTime<Utc> },
}
