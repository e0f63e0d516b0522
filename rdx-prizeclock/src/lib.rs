//! # Prizeclock
//!
//! A session engine for a weighted prize wheel that drives a shared countdown.
//!
//! A host runs one controller surface and up to two display surfaces, one
//! showing the wheel and one showing the timer. Prizeclock keeps the single
//! authoritative copy of the session and is the only thing allowed to change
//! it; surfaces send commands in and render what comes back.
//!
//! ## Core Concepts
//!
//! - **StateHub**: Owns the session and applies every command to completion,
//!   then broadcasts what changed to all live surfaces.
//! - **TimerEngine**: A Stopped/Running countdown that may go negative. Each
//!   run has its own ticker generation, so a cancelled ticker can never count.
//! - **WheelSelector**: Picks the winner from the weights before any
//!   animation runs, then hands out a stop angle inside the winner's slice.
//! - **Expressions**: The `h`/`m`/`s` fields of an option are small
//!   arithmetic expressions applied to the remaining time when it wins.
//! - **Persistence**: The session is silently saved on shutdown and restored
//!   on the next start, and can be exported and imported as JSON.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use prizeclock::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // 1. Load configuration; a missing file gives the defaults.
//!     let config = PrizeclockConfig::load(None)?;
//!
//!     // 2. Restore the last session, or start a fresh one.
//!     let mut engine = PrizeclockEngine::bootstrap(config).await;
//!
//!     // 3. Attach the controller before running.
//!     let controller = engine.attach_controller()?;
//!     controller.send(Command::TimerControl(TimerCommand::StartPause))?;
//!
//!     // 4. Run until the controller closes or Ctrl+C.
//!     let session = engine.run().await?;
//!     println!("Final countdown: {}", session.timer.remaining_seconds);
//!     Ok(())
//! }
//! ```

pub const ENGINE_NAME: &str = "Prizeclock Engine";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Declare all the modules in the crate.
pub mod command;
pub mod common;
pub mod components;
pub mod config;
pub mod engine;
pub mod events;
pub mod hub;
pub mod persistence;
pub mod session;
pub mod time;

/// A prelude module for easy importing of the most common Prizeclock types.
pub mod prelude {
    pub use crate::command::{Command, HubInput};
    pub use crate::common::{SurfaceId, SurfaceRole, TimerCommand, WindowKind};
    pub use crate::components::expr::{apply_field, decompose, evaluate};
    pub use crate::components::selector::{SpinPlan, WheelSelector};
    pub use crate::components::timer::{format_clock, TimerEngine};
    pub use crate::config::PrizeclockConfig;
    pub use crate::engine::{
        EngineError, EngineHandle, HeadlessLauncher, PrizeclockEngine, SurfaceLauncher,
        SurfaceLink,
    };
    pub use crate::events::{HubMessage, SystemEvent, WindowSummary};
    pub use crate::persistence::PersistenceError;
    pub use crate::session::{
        ColorTheme, FontSelection, SessionPatch, SessionState, TimeDeltas, WheelOption,
        WheelState,
    };
    pub use crate::time::{ManualTickSource, TickSource, TokioTickSource};
}
