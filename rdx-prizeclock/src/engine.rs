//! The engine that runs a Prizeclock session.
//!
//! `PrizeclockEngine` owns the `StateHub` and is the only task that ever
//! touches it. Surfaces, tickers and finished file operations all feed one
//! inbox; the dispatcher loop takes one input at a time, lets the hub apply
//! it, then carries out the effects the hub asked for.

use crate::command::{Command, HubInput};
use crate::common::{SurfaceId, SurfaceRole};
use crate::components::selector::WheelSelector;
use crate::config::PrizeclockConfig;
use crate::events::{HubMessage, SystemEvent};
use crate::hub::{Effect, StateHub};
use crate::persistence::{load_session_async, save_session_async};
use crate::session::SessionState;
use crate::time::{TickHandle, TickSink, TickSource, TokioTickSource};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("a controller surface is already attached")]
    ControllerAlreadyAttached,

    #[error("the engine cannot run without a controller surface")]
    NoController,

    #[error("the engine has shut down")]
    Closed,
}

/// A cloneable way to talk to a running engine.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    inbox: mpsc::UnboundedSender<HubInput>,
    system_event_sender: broadcast::Sender<SystemEvent>,
}

impl EngineHandle {
    pub fn send(&self, from: SurfaceId, command: Command) -> Result<(), EngineError> {
        self.inbox
            .send(HubInput::surface(from, command))
            .map_err(|_| EngineError::Closed)
    }

    /// Asks the engine to end the session as if the controller had closed.
    pub fn shutdown(&self) -> Result<(), EngineError> {
        self.inbox
            .send(HubInput::Shutdown)
            .map_err(|_| EngineError::Closed)
    }

    pub fn subscribe_system_events(&self) -> broadcast::Receiver<SystemEvent> {
        self.system_event_sender.subscribe()
    }
}

/// One registered surface's end of the connection.
#[derive(Debug)]
pub struct SurfaceLink {
    pub id: SurfaceId,
    pub role: SurfaceRole,
    pub messages: mpsc::UnboundedReceiver<HubMessage>,
    pub hub: EngineHandle,
}

impl SurfaceLink {
    pub fn send(&self, command: Command) -> Result<(), EngineError> {
        self.hub.send(self.id, command)
    }
}

/// Realizes a display surface when the hub asks for one.
///
/// The surface is already registered and live when `launch` is called; it
/// should read `link.messages` until it sees `HubMessage::Close`.
pub trait SurfaceLauncher: Send {
    fn launch(&mut self, link: SurfaceLink);
}

/// Displays with nothing to draw on. Each one drains its messages until the
/// hub closes it; a headless wheel reports spin results without playback.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessLauncher;

impl SurfaceLauncher for HeadlessLauncher {
    fn launch(&mut self, mut link: SurfaceLink) {
        tokio::spawn(async move {
            while let Some(message) = link.messages.recv().await {
                match message {
                    HubMessage::Close => break,
                    HubMessage::SpinPlanned(plan) if link.role == SurfaceRole::WheelDisplay => {
                        if link.send(Command::SpinResult(plan.deltas)).is_err() {
                            break;
                        }
                    }
                    _ => {}
                }
            }
            debug!("Headless {} surface {:?} finished", link.role, link.id);
        });
    }
}

/// The main Prizeclock engine.
pub struct PrizeclockEngine {
    config: Arc<PrizeclockConfig>,
    hub: StateHub,
    inbox_tx: mpsc::UnboundedSender<HubInput>,
    inbox_rx: mpsc::UnboundedReceiver<HubInput>,
    system_event_sender: broadcast::Sender<SystemEvent>,
    tick_source: Box<dyn TickSource>,
    launcher: Box<dyn SurfaceLauncher>,
    ticker: Option<TickHandle>,
    restored_from: Option<PathBuf>,
    controller: Option<SurfaceId>,
    handle_ctrl_c: bool,
}

impl PrizeclockEngine {
    /// Creates an engine around `session`. `restored_from` names the autosave
    /// the session came from, if any.
    pub fn new(
        config: PrizeclockConfig,
        session: SessionState,
        restored_from: Option<PathBuf>,
    ) -> Self {
        let (system_event_sender, _) = broadcast::channel(config.system_channel_capacity.max(1));
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let hub = StateHub::new(
            session,
            restored_from.is_some(),
            config.spin.clone(),
            system_event_sender.clone(),
        );

        Self {
            config: Arc::new(config),
            hub,
            inbox_tx,
            inbox_rx,
            system_event_sender,
            tick_source: Box::new(TokioTickSource),
            launcher: Box::new(HeadlessLauncher),
            ticker: None,
            restored_from,
            controller: None,
            handle_ctrl_c: true,
        }
    }

    /// Creates an engine from the autosave at the configured path, or from
    /// the configured defaults when there is none.
    ///
    /// A missing autosave is normal and silent. An unreadable one is logged
    /// and the defaults are used.
    pub async fn bootstrap(config: PrizeclockConfig) -> Self {
        let path = config.persistence.autosave_path.clone();
        match load_session_async(path.clone(), config.defaults.clone()).await {
            Ok(session) => {
                info!("Restored session from {}", path.display());
                Self::new(config, session, Some(path))
            }
            Err(e) => {
                if e.is_not_found() {
                    debug!("No autosave at {}, starting fresh", path.display());
                } else {
                    warn!("Ignoring autosave: {}", e.user_message());
                }
                let session = config.defaults.session();
                Self::new(config, session, None)
            }
        }
    }

    pub fn with_tick_source(mut self, source: impl TickSource + 'static) -> Self {
        self.tick_source = Box::new(source);
        self
    }

    pub fn with_launcher(mut self, launcher: impl SurfaceLauncher + 'static) -> Self {
        self.launcher = Box::new(launcher);
        self
    }

    /// Makes spins reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.hub
            .set_selector(WheelSelector::seeded(seed, self.config.spin.clone()));
        self
    }

    /// Leaves Ctrl+C to the embedding application.
    pub fn without_ctrl_c(mut self) -> Self {
        self.handle_ctrl_c = false;
        self
    }

    pub fn config(&self) -> &PrizeclockConfig {
        &self.config
    }

    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            inbox: self.inbox_tx.clone(),
            system_event_sender: self.system_event_sender.clone(),
        }
    }

    pub fn subscribe_system_events(&self) -> broadcast::Receiver<SystemEvent> {
        self.system_event_sender.subscribe()
    }

    /// Registers the one controller surface. Must happen before `run`.
    pub fn attach_controller(&mut self) -> Result<SurfaceLink, EngineError> {
        if self.controller.is_some() {
            return Err(EngineError::ControllerAlreadyAttached);
        }
        let link = self.register(SurfaceRole::Controller);
        self.controller = Some(link.id);
        Ok(link)
    }

    /// Runs the dispatcher until the session ends, then autosaves.
    ///
    /// The session ends when the controller closes, when any `EngineHandle`
    /// asks for shutdown, or on Ctrl+C. Returns the final session.
    pub async fn run(mut self) -> anyhow::Result<SessionState> {
        if self.controller.is_none() {
            return Err(EngineError::NoController.into());
        }
        info!("PrizeclockEngine starting up...");
        self.system_event_sender
            .send(SystemEvent::EngineStarted { at: Utc::now() })
            .ok();
        if let Some(path) = self.restored_from.clone() {
            self.system_event_sender
                .send(SystemEvent::SessionRestored { path })
                .ok();
        }

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let mut watch_ctrl_c = self.handle_ctrl_c;

        loop {
            let input = tokio::select! {
                biased;
                signal = &mut ctrl_c, if watch_ctrl_c => {
                    watch_ctrl_c = false;
                    if let Err(e) = signal {
                        error!("Failed to listen for Ctrl+C: {}", e);
                        continue;
                    }
                    info!("Shutdown signal received. Closing the controller...");
                    HubInput::Shutdown
                }
                Some(input) = self.inbox_rx.recv() => input,
                else => return Ok(self.hub.snapshot()),
            };

            let effects = self.hub.handle(input);
            for effect in effects {
                if let Some(session) = self.apply(effect).await {
                    info!("PrizeclockEngine has shut down.");
                    return Ok(session);
                }
            }
        }
    }

    /// Carries out one effect. Returns the final session once it has ended.
    async fn apply(&mut self, effect: Effect) -> Option<SessionState> {
        match effect {
            Effect::StartTicker { generation } => {
                let sink = TickSink::new(generation, self.inbox_tx.clone());
                let period = self.config.timer.tick_period();
                // Replacing the handle stops any previous ticker.
                self.ticker = Some(self.tick_source.start(period, sink));
            }
            Effect::CancelTicker { generation } => {
                let live = self.ticker.as_ref().map(TickHandle::generation);
                if live == Some(generation) {
                    if let Some(ticker) = self.ticker.take() {
                        ticker.cancel();
                    }
                }
            }
            Effect::Launch(role) => {
                let link = self.register(role);
                self.launcher.launch(link);
            }
            Effect::Export {
                from,
                path,
                snapshot,
            } => {
                let inbox = self.inbox_tx.clone();
                tokio::spawn(async move {
                    let result = save_session_async(snapshot, path.clone())
                        .await
                        .map(|()| path)
                        .map_err(|e| e.user_message());
                    inbox.send(HubInput::ExportCompleted { from, result }).ok();
                });
            }
            Effect::Import { from, path } => {
                let inbox = self.inbox_tx.clone();
                let defaults = self.config.defaults.clone();
                tokio::spawn(async move {
                    let result = load_session_async(path, defaults)
                        .await
                        .map_err(|e| e.user_message());
                    inbox.send(HubInput::ImportCompleted { from, result }).ok();
                });
            }
            Effect::EndSession { snapshot } => {
                self.ticker = None;
                let path = self.config.persistence.autosave_path.clone();
                autosave(snapshot.clone(), path, self.system_event_sender.clone()).await;
                return Some(snapshot);
            }
        }
        None
    }

    fn register(&mut self, role: SurfaceRole) -> SurfaceLink {
        let (tx, messages) = mpsc::unbounded_channel();
        let id = self.hub.register_surface(role, tx);
        SurfaceLink {
            id,
            role,
            messages,
            hub: self.handle(),
        }
    }
}

/// Writes the session to the autosave path. Failures are logged only.
async fn autosave(
    snapshot: SessionState,
    path: PathBuf,
    system_event_sender: broadcast::Sender<SystemEvent>,
) {
    match save_session_async(snapshot, path.clone()).await {
        Ok(()) => {
            system_event_sender
                .send(SystemEvent::Autosaved {
                    path,
                    at: Utc::now(),
                })
                .ok();
        }
        Err(e) => warn!("Autosave failed: {}", e.user_message()),
    }
}
