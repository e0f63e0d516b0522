// Commands from presentation surfaces to the hub.
//
// Commands are the ONLY way a surface can mutate session state. They are
// queued on the engine inbox and applied one at a time, to completion.

use crate::common::{SurfaceId, TimerCommand, WindowKind};
use crate::session::{ColorTheme, FontSelection, SessionPatch, SessionState, TimeDeltas};
use std::path::PathBuf;

/// A command sent by a presentation surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `edit/state-update`: replace the fields present in the patch.
    Edit(SessionPatch),
    /// Ask the hub to pick a winner and plan the playback.
    Spin,
    /// `spin-result`: playback finished, apply the winner's time deltas.
    SpinResult(TimeDeltas),
    /// `timer-control`
    TimerControl(TimerCommand),
    /// `time-adjust`: signed seconds, never clamped.
    TimeAdjust(i64),
    /// `color-update`
    ColorUpdate(ColorTheme),
    /// `font-change`
    FontChange(FontSelection),
    /// `toggle-window`: close the display if open, otherwise open it.
    ToggleWindow(WindowKind),
    /// Open the display, or focus it if it is already open.
    OpenWindow(WindowKind),
    /// `export-data`: the path is already resolved by the surface.
    ExportData(PathBuf),
    /// `import-data`: the path is already resolved by the surface.
    ImportData(PathBuf),
    /// The surface is going away.
    Close,
}

/// Everything that can enter the hub's single mutation path.
#[derive(Debug)]
pub enum HubInput {
    Surface { from: SurfaceId, command: Command },
    /// A ticker firing. Stale generations are ignored.
    Tick { generation: u64 },
    /// An export finished on the I/O pool.
    ExportCompleted {
        from: SurfaceId,
        result: Result<PathBuf, String>,
    },
    /// An import finished on the I/O pool.
    ImportCompleted {
        from: SurfaceId,
        result: Result<SessionState, String>,
    },
    /// Process-level shutdown request; handled like closing the controller.
    Shutdown,
}

impl HubInput {
    pub fn surface(from: SurfaceId, command: Command) -> Self {
        HubInput::Surface { from, command }
    }
}
