//! Terminal stand-ins for the wheel and timer displays.

use colored::Colorize;
use prizeclock::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Launches displays as background tasks that print to the terminal.
///
/// The wheel "plays" a spin by waiting out its duration before reporting
/// the result. The timer only prints while `watching` is set.
pub struct ShellLauncher {
    watching: Arc<AtomicBool>,
}

impl ShellLauncher {
    pub fn new(watching: Arc<AtomicBool>) -> Self {
        Self { watching }
    }
}

impl SurfaceLauncher for ShellLauncher {
    fn launch(&mut self, link: SurfaceLink) {
        println!("\n<-- [DISPLAY] {} display opened", link.role.to_string().cyan());
        match link.role {
            SurfaceRole::WheelDisplay => {
                tokio::spawn(run_wheel(link));
            }
            SurfaceRole::TimerDisplay => {
                tokio::spawn(run_timer(link, self.watching.clone()));
            }
            SurfaceRole::Controller => {
                debug!("Ignoring launch request for a controller surface");
            }
        }
    }
}

async fn run_wheel(mut link: SurfaceLink) {
    while let Some(message) = link.messages.recv().await {
        match message {
            HubMessage::SpinPlanned(plan) => {
                println!(
                    "\n<-- [WHEEL] Spinning {} turns for {}s...",
                    plan.spins, plan.duration_secs
                );
                tokio::time::sleep(Duration::from_secs(plan.duration_secs.into())).await;
                println!(
                    "<-- [WHEEL] Landed on {} at {:.1} degrees",
                    plan.name.green().bold(),
                    plan.stop_angle
                );
                if link.send(Command::SpinResult(plan.deltas)).is_err() {
                    break;
                }
            }
            HubMessage::WheelUpdated { segments, .. } => {
                debug!("Wheel redrawn with {} segments", segments.len());
            }
            HubMessage::Focus => println!("\n<-- [WHEEL] Display brought to front"),
            HubMessage::Close => break,
            _ => {}
        }
    }
    println!("\n<-- [DISPLAY] {} display closed", "wheel".cyan());
}

async fn run_timer(mut link: SurfaceLink, watching: Arc<AtomicBool>) {
    while let Some(message) = link.messages.recv().await {
        match message {
            HubMessage::TimeUpdate(time) => {
                if watching.load(Ordering::Relaxed) {
                    println!("<-- [TIMER] {}", time.bold());
                }
            }
            HubMessage::ThemeUpdate(theme) => {
                debug!("Timer theme is now {} on {}", theme.font, theme.background);
            }
            HubMessage::FontChange(font) => debug!("Timer font is now {}", font.0),
            HubMessage::Focus => println!("\n<-- [TIMER] Display brought to front"),
            HubMessage::Close => break,
            _ => {}
        }
    }
    println!("\n<-- [DISPLAY] {} display closed", "timer".cyan());
}
