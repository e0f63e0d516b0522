//! The authoritative session-state container.
//!
//! `StateHub` owns the one `SessionState` of a run, split across the wheel,
//! the `TimerEngine`, theme and font. Every input is applied to completion
//! and followed by a broadcast of whatever it changed to all live surfaces.
//! The hub never spawns, sleeps or touches the disk: anything with a side
//! effect outside the state is returned as an `Effect` for the engine to
//! carry out.

use crate::command::{Command, HubInput};
use crate::common::{SurfaceId, SurfaceRole, TimerCommand, WindowKind};
use crate::components::expr::apply_time_deltas;
use crate::components::registry::{Liveness, SurfaceOutbox, WindowRegistry};
use crate::components::selector::{SpinPlan, WheelSelector};
use crate::components::timer::{TickerChange, TimerEngine};
use crate::config::SpinConfig;
use crate::events::{HubMessage, SystemEvent};
use crate::session::{
    ColorTheme, FontSelection, SessionPatch, SessionState, TimeDeltas, WheelState,
};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::Rng;
use std::path::PathBuf;
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

/// A side effect requested by the hub.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    StartTicker { generation: u64 },
    CancelTicker { generation: u64 },
    /// Realize a display surface for `role` and register it.
    Launch(SurfaceRole),
    Export {
        from: SurfaceId,
        path: PathBuf,
        snapshot: SessionState,
    },
    Import { from: SurfaceId, path: PathBuf },
    /// The controller is gone: autosave `snapshot` and stop.
    EndSession { snapshot: SessionState },
}

/// Which parts of the session an input touched.
#[derive(Debug, Clone, Copy, Default)]
struct Changes {
    wheel: bool,
    time: bool,
    theme: bool,
    font: bool,
}

impl Changes {
    fn time() -> Self {
        Self {
            time: true,
            ..Default::default()
        }
    }

    fn all() -> Self {
        Self {
            wheel: true,
            time: true,
            theme: true,
            font: true,
        }
    }
}

pub struct StateHub<R = StdRng> {
    wheel: WheelState,
    timer: TimerEngine,
    theme: ColorTheme,
    font: FontSelection,
    registry: WindowRegistry,
    selector: WheelSelector<R>,
    /// A spin whose playback has not reported back yet.
    pending_spin: Option<SpinPlan>,
    /// Whether the session came from a persisted snapshot.
    restored: bool,
    ended: bool,
    system_event_sender: broadcast::Sender<SystemEvent>,
}

impl StateHub<StdRng> {
    pub fn new(
        session: SessionState,
        restored: bool,
        spin: SpinConfig,
        system_event_sender: broadcast::Sender<SystemEvent>,
    ) -> Self {
        Self::with_selector(
            session,
            restored,
            WheelSelector::from_entropy(spin),
            system_event_sender,
        )
    }
}

impl<R: Rng> StateHub<R> {
    /// Builds a hub around `session`. The timer always starts stopped.
    /// Surface lifecycle events go out on `system_event_sender`.
    pub fn with_selector(
        session: SessionState,
        restored: bool,
        selector: WheelSelector<R>,
        system_event_sender: broadcast::Sender<SystemEvent>,
    ) -> Self {
        Self {
            wheel: session.wheel,
            timer: TimerEngine::new(session.timer.remaining_seconds),
            theme: session.theme,
            font: session.font,
            registry: WindowRegistry::new(),
            selector,
            pending_spin: None,
            restored,
            ended: false,
            system_event_sender,
        }
    }

    pub fn set_selector(&mut self, selector: WheelSelector<R>) {
        self.selector = selector;
    }

    pub fn snapshot(&self) -> SessionState {
        SessionState {
            wheel: self.wheel.clone(),
            timer: self.timer.state(),
            theme: self.theme.clone(),
            font: self.font.clone(),
        }
    }

    pub fn registry(&self) -> &WindowRegistry {
        &self.registry
    }

    pub fn timer(&self) -> &TimerEngine {
        &self.timer
    }

    pub fn pending_spin(&self) -> Option<&SpinPlan> {
        self.pending_spin.as_ref()
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn subscribe_system_events(&self) -> broadcast::Receiver<SystemEvent> {
        self.system_event_sender.subscribe()
    }

    /// The single dispatch entry point.
    pub fn handle(&mut self, input: HubInput) -> Vec<Effect> {
        if self.ended {
            debug!("Session already ended, dropping {:?}", input);
            return Vec::new();
        }
        match input {
            HubInput::Surface { from, command } => self.handle_command(from, command),
            HubInput::Tick { generation } => {
                if let Some(remaining) = self.timer.tick(generation) {
                    trace!("Tick #{} -> {}", generation, remaining);
                    self.publish(Changes::time());
                } else {
                    trace!("Ignoring stale tick from ticker #{}", generation);
                }
                Vec::new()
            }
            HubInput::ExportCompleted { from, result } => {
                self.registry.send(from, HubMessage::ExportFinished(result));
                Vec::new()
            }
            HubInput::ImportCompleted { from, result } => match result {
                Ok(session) => self.replace_session(session),
                Err(reason) => {
                    self.registry.send(from, HubMessage::ImportFailed { reason });
                    Vec::new()
                }
            },
            HubInput::Shutdown => match self.registry.live_of(SurfaceRole::Controller) {
                Some(controller) => self.unregister_surface(controller),
                None => self.end_session(),
            },
        }
    }

    fn handle_command(&mut self, from: SurfaceId, command: Command) -> Vec<Effect> {
        let role = match self.registry.liveness(from) {
            Liveness::Live => self.registry.role(from),
            Liveness::Unregistered | Liveness::Closed => None,
        };
        let Some(role) = role else {
            warn!("Dropping {:?} from surface {:?} that is not live", command, from);
            return Vec::new();
        };
        debug!("{} surface sent {:?}", role, command);

        match command {
            Command::Edit(patch) => self.apply_edit(Some(from), patch),
            Command::Spin => self.spin(),
            Command::SpinResult(deltas) => self.record_spin_outcome(&deltas),
            Command::TimerControl(TimerCommand::StartPause) => {
                let change = self.timer.toggle();
                self.publish(Changes::time());
                ticker_effects(change)
            }
            Command::TimerControl(TimerCommand::Reset) => {
                let change = self.timer.reset();
                self.publish(Changes::time());
                ticker_effects(change)
            }
            Command::TimeAdjust(delta) => {
                self.timer.adjust(delta);
                self.publish(Changes::time());
                Vec::new()
            }
            Command::ColorUpdate(theme) => self.apply_edit(Some(from), SessionPatch::theme(theme)),
            Command::FontChange(font) => self.apply_edit(Some(from), SessionPatch::font(font)),
            Command::ToggleWindow(kind) => self.toggle_window(kind),
            Command::OpenWindow(kind) => self.open_window(kind),
            Command::ExportData(path) => vec![Effect::Export {
                from,
                path,
                snapshot: self.snapshot(),
            }],
            Command::ImportData(path) => vec![Effect::Import { from, path }],
            Command::Close => self.unregister_surface(from),
        }
    }

    /// Applies the fields present in `patch`; absent fields are untouched.
    ///
    /// A wheel whose time fields are a bare `*` or `/` is refused and the
    /// refusal goes back to `from` only.
    pub fn apply_edit(&mut self, from: Option<SurfaceId>, patch: SessionPatch) -> Vec<Effect> {
        if patch.is_empty() {
            return Vec::new();
        }
        if let Some(options) = &patch.options {
            let lone_operator = options.iter().find(|option| {
                option
                    .deltas
                    .fields()
                    .iter()
                    .any(|field| matches!(field.trim(), "*" | "/"))
            });
            if let Some(option) = lone_operator {
                let reason = format!(
                    "Option {:?} has an incomplete expression; write e.g. *2 or /2, not a bare operator.",
                    option.name
                );
                debug!("Rejecting edit: {}", reason);
                if let Some(from) = from {
                    self.registry.send(from, HubMessage::EditRejected { reason });
                }
                return Vec::new();
            }
        }

        let mut changes = Changes::default();
        if let Some(options) = patch.options {
            self.wheel = WheelState::new(options);
            changes.wheel = true;
        }
        if let Some(remaining) = patch.remaining_seconds {
            self.timer.set_remaining(remaining);
            changes.time = true;
        }
        if let Some(theme) = patch.theme {
            self.theme = theme;
            changes.theme = true;
        }
        if let Some(font) = patch.font {
            self.font = font;
            changes.font = true;
        }
        self.publish(changes);
        Vec::new()
    }

    /// Runs the selector and sends the plan out for playback.
    ///
    /// Ignored while a previous plan is still playing or when nothing is
    /// playable. Without a live wheel display there is nothing to play the
    /// plan back, so the outcome is applied straight away.
    pub fn spin(&mut self) -> Vec<Effect> {
        if self.pending_spin.is_some() {
            debug!("Spin requested while one is still playing, ignoring");
            return Vec::new();
        }
        if !self.wheel.is_spinnable() {
            debug!("Spin requested on a wheel with nothing playable, ignoring");
            return Vec::new();
        }
        let Some(plan) = self.selector.plan(&self.wheel) else {
            return Vec::new();
        };
        info!(
            "Spin landed on {:?} at {:.1} degrees after {} turns",
            plan.name, plan.stop_angle, plan.spins
        );
        self.registry.broadcast(&HubMessage::SpinPlanned(plan.clone()));

        if self.registry.is_live(SurfaceRole::WheelDisplay) {
            self.pending_spin = Some(plan);
            Vec::new()
        } else {
            self.record_spin_outcome(&plan.deltas)
        }
    }

    /// Applies a winner's time deltas to the countdown, never below zero.
    pub fn record_spin_outcome(&mut self, deltas: &TimeDeltas) -> Vec<Effect> {
        self.pending_spin = None;
        let total = apply_time_deltas(self.timer.remaining(), deltas).max(0);
        debug!("Spin outcome moves countdown {} -> {}", self.timer.remaining(), total);
        self.timer.set_remaining(total);
        self.publish(Changes::time());
        Vec::new()
    }

    /// Adds a live surface and pushes it the state its role renders.
    pub fn register_surface(&mut self, role: SurfaceRole, outbox: SurfaceOutbox) -> SurfaceId {
        let id = self.registry.register(role, outbox);
        info!("{} surface {:?} opened", role, id);
        self.system_event_sender
            .send(SystemEvent::SurfaceOpened { id, role })
            .ok();

        match role {
            SurfaceRole::Controller => {
                if self.restored {
                    self.registry.send(id, HubMessage::LoadState(self.snapshot()));
                }
                self.registry.send(id, self.wheel_message());
                self.registry.send(id, HubMessage::TimeUpdate(self.timer.display()));
            }
            SurfaceRole::WheelDisplay => {
                self.registry.send(id, self.wheel_message());
                self.registry.send(id, HubMessage::FontChange(self.font.clone()));
            }
            SurfaceRole::TimerDisplay => {
                self.registry.send(id, HubMessage::TimeUpdate(self.timer.display()));
                self.registry.send(id, HubMessage::ThemeUpdate(self.theme.clone()));
                self.registry.send(id, HubMessage::FontChange(self.font.clone()));
            }
        }
        self.send_window_summary();
        id
    }

    /// Marks a surface closed.
    ///
    /// Closing the controller closes every other surface and ends the
    /// session. Closing a display only updates liveness.
    pub fn unregister_surface(&mut self, id: SurfaceId) -> Vec<Effect> {
        let Some(role) = self.close_surface(id) else {
            return Vec::new();
        };

        match role {
            SurfaceRole::Controller => {
                for other in self.registry.live_ids() {
                    self.registry.send(other, HubMessage::Close);
                    self.close_surface(other);
                }
                self.end_session()
            }
            SurfaceRole::WheelDisplay | SurfaceRole::TimerDisplay => {
                self.send_window_summary();
                Vec::new()
            }
        }
    }

    fn close_surface(&mut self, id: SurfaceId) -> Option<SurfaceRole> {
        let role = self.registry.close(id)?;
        info!("{} surface {:?} closed", role, id);
        if role == SurfaceRole::WheelDisplay && self.pending_spin.take().is_some() {
            debug!("Wheel display closed mid-spin, abandoning the spin");
        }
        self.system_event_sender
            .send(SystemEvent::SurfaceClosed { id, role })
            .ok();
        Some(role)
    }

    fn end_session(&mut self) -> Vec<Effect> {
        self.ended = true;
        let mut effects = ticker_effects(self.timer.stop());
        effects.push(Effect::EndSession {
            snapshot: self.snapshot(),
        });
        self.system_event_sender
            .send(SystemEvent::SessionEnded { at: Utc::now() })
            .ok();
        info!("Session ended");
        effects
    }

    fn toggle_window(&mut self, kind: WindowKind) -> Vec<Effect> {
        match self.registry.live_of(kind.role()) {
            Some(id) => {
                self.registry.send(id, HubMessage::Close);
                self.unregister_surface(id)
            }
            None => vec![Effect::Launch(kind.role())],
        }
    }

    fn open_window(&mut self, kind: WindowKind) -> Vec<Effect> {
        match self.registry.live_of(kind.role()) {
            Some(id) => {
                self.registry.send(id, HubMessage::Focus);
                Vec::new()
            }
            None => vec![Effect::Launch(kind.role())],
        }
    }

    /// Swaps in an imported session wholesale. The timer is stopped.
    fn replace_session(&mut self, session: SessionState) -> Vec<Effect> {
        let effects = ticker_effects(self.timer.stop());
        self.timer.set_remaining(session.timer.remaining_seconds);
        self.wheel = session.wheel;
        self.theme = session.theme;
        self.font = session.font;
        self.pending_spin = None;
        info!("Session replaced by import");
        self.registry.broadcast(&HubMessage::LoadState(self.snapshot()));
        self.publish(Changes::all());
        effects
    }

    fn wheel_message(&self) -> HubMessage {
        HubMessage::WheelUpdated {
            options: self.wheel.options().to_vec(),
            segments: self.wheel.segments(),
        }
    }

    fn publish(&self, changes: Changes) {
        if changes.wheel {
            self.registry.broadcast(&self.wheel_message());
        }
        if changes.time {
            self.registry
                .broadcast(&HubMessage::TimeUpdate(self.timer.display()));
        }
        if changes.theme {
            self.registry
                .broadcast(&HubMessage::ThemeUpdate(self.theme.clone()));
        }
        if changes.font {
            self.registry
                .broadcast(&HubMessage::FontChange(self.font.clone()));
        }
    }

    fn send_window_summary(&self) {
        if let Some(controller) = self.registry.live_of(SurfaceRole::Controller) {
            self.registry.send(
                controller,
                HubMessage::WindowStateUpdate(self.registry.summary()),
            );
        }
    }
}

fn ticker_effects(change: TickerChange) -> Vec<Effect> {
    match change {
        TickerChange::Start { generation } => vec![Effect::StartTicker { generation }],
        TickerChange::Cancel { generation } => vec![Effect::CancelTicker { generation }],
        TickerChange::None => Vec::new(),
    }
}
