//! The controller's local view of the session, kept current from hub messages.

use colored::Colorize;
use prizeclock::prelude::*;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

#[derive(Debug, Default)]
pub struct Mirror {
    pub options: Vec<WheelOption>,
    pub time: String,
    pub windows: WindowSummary,
    pub theme: ColorTheme,
    pub font: FontSelection,
    pub last_spin: Option<SpinPlan>,
}

impl Mirror {
    fn load(&mut self, state: SessionState) {
        self.options = state.wheel.options().to_vec();
        self.time = format_clock(state.timer.remaining_seconds);
        self.theme = state.theme;
        self.font = state.font;
    }
}

/// Applies controller messages to the mirror and reports the ones a user
/// needs to see.
pub fn spawn_controller_listener(
    mut messages: mpsc::UnboundedReceiver<HubMessage>,
    mirror: Arc<RwLock<Mirror>>,
) {
    tokio::spawn(async move {
        while let Some(message) = messages.recv().await {
            let mut view = mirror.write().await;
            match message {
                HubMessage::TimeUpdate(time) => view.time = time,
                HubMessage::WheelUpdated { options, .. } => view.options = options,
                HubMessage::WindowStateUpdate(summary) => view.windows = summary,
                HubMessage::LoadState(state) => {
                    view.load(state);
                    println!("\n<-- [SESSION] Loaded session, countdown {}", view.time.bold());
                }
                HubMessage::ThemeUpdate(theme) => view.theme = theme,
                HubMessage::FontChange(font) => view.font = font,
                HubMessage::SpinPlanned(plan) => view.last_spin = Some(plan),
                HubMessage::EditRejected { reason } => {
                    println!("\n<-- [REJECTED] {}", reason.red());
                }
                HubMessage::ExportFinished(Ok(path)) => {
                    println!("\n<-- [EXPORT] Saved to {}", path.display().to_string().green());
                }
                HubMessage::ExportFinished(Err(reason)) => {
                    println!("\n<-- [EXPORT] {}", reason.red());
                }
                HubMessage::ImportFailed { reason } => {
                    println!("\n<-- [IMPORT] {}", reason.red());
                }
                HubMessage::Focus | HubMessage::Close => {}
            }
        }
    });
}
