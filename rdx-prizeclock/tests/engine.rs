use prizeclock::config::PrizeclockConfig;
use prizeclock::persistence::{load_session, save_session};
use prizeclock::prelude::*;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Hands every launched display back to the test.
struct ChannelLauncher(mpsc::UnboundedSender<SurfaceLink>);

impl SurfaceLauncher for ChannelLauncher {
    fn launch(&mut self, link: SurfaceLink) {
        self.0.send(link).ok();
    }
}

fn config_in(dir: &Path) -> PrizeclockConfig {
    let mut config = PrizeclockConfig::default();
    config.persistence.autosave_path = dir.join("app-state.json");
    config
}

fn engine_in(dir: &Path) -> PrizeclockEngine {
    let config = config_in(dir);
    let session = config.defaults.session();
    PrizeclockEngine::new(config, session, None).without_ctrl_c()
}

fn spawn(engine: PrizeclockEngine) -> JoinHandle<anyhow::Result<SessionState>> {
    tokio::spawn(engine.run())
}

/// Waits for the first message matching `pred`, skipping the rest.
async fn next_matching(
    link: &mut SurfaceLink,
    pred: impl Fn(&HubMessage) -> bool,
) -> HubMessage {
    tokio::time::timeout(Duration::from_secs(30), async {
        loop {
            let message = link.messages.recv().await.expect("surface closed");
            if pred(&message) {
                return message;
            }
        }
    })
    .await
    .expect("timed out waiting for message")
}

async fn next_time(link: &mut SurfaceLink) -> String {
    match next_matching(link, |m| matches!(m, HubMessage::TimeUpdate(_))).await {
        HubMessage::TimeUpdate(time) => time,
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn manual_ticks_count_down_and_autosave_on_close() {
    let dir = tempfile::tempdir().unwrap();
    let source = ManualTickSource::new();
    let mut engine = engine_in(dir.path()).with_tick_source(source.clone());
    let mut controller = engine.attach_controller().unwrap();
    let run = spawn(engine);

    assert_eq!(next_time(&mut controller).await, "00:00:00");
    controller
        .send(Command::TimerControl(TimerCommand::StartPause))
        .unwrap();
    assert_eq!(next_time(&mut controller).await, "00:00:00");
    assert_eq!(source.active(), 1);

    assert_eq!(source.fire(), 1);
    assert_eq!(next_time(&mut controller).await, "-00:00:01");
    source.fire();
    assert_eq!(next_time(&mut controller).await, "-00:00:02");

    // Pausing cancels the ticker; further fires reach nothing.
    controller
        .send(Command::TimerControl(TimerCommand::StartPause))
        .unwrap();
    assert_eq!(next_time(&mut controller).await, "-00:00:02");
    assert_eq!(source.fire(), 0);

    controller.send(Command::Close).unwrap();
    let session = run.await.unwrap().unwrap();
    assert_eq!(session.timer.remaining_seconds, -2);
    assert!(!session.timer.running);

    let saved = load_session(
        &dir.path().join("app-state.json"),
        &PrizeclockConfig::default().defaults,
    )
    .unwrap();
    assert_eq!(saved, session);
}

#[tokio::test(start_paused = true)]
async fn tokio_ticker_removes_one_second_per_period() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = engine_in(dir.path());
    let mut controller = engine.attach_controller().unwrap();
    let run = spawn(engine);

    controller.send(Command::TimeAdjust(10)).unwrap();
    controller
        .send(Command::TimerControl(TimerCommand::StartPause))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(3500)).await;
    controller
        .send(Command::TimerControl(TimerCommand::StartPause))
        .unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    controller.send(Command::Close).unwrap();
    let session = run.await.unwrap().unwrap();
    assert_eq!(session.timer.remaining_seconds, 7);
}

#[tokio::test(start_paused = true)]
async fn restarting_never_runs_two_tickers() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = engine_in(dir.path());
    let mut controller = engine.attach_controller().unwrap();
    let run = spawn(engine);

    for _ in 0..3 {
        controller
            .send(Command::TimerControl(TimerCommand::StartPause))
            .unwrap();
        controller
            .send(Command::TimerControl(TimerCommand::StartPause))
            .unwrap();
    }
    controller
        .send(Command::TimerControl(TimerCommand::StartPause))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(2500)).await;

    controller.send(Command::Close).unwrap();
    let session = run.await.unwrap().unwrap();
    assert_eq!(session.timer.remaining_seconds, -2);
}

#[tokio::test]
async fn closing_the_controller_closes_every_display() {
    let dir = tempfile::tempdir().unwrap();
    let (tx, mut launched) = mpsc::unbounded_channel();
    let mut engine = engine_in(dir.path()).with_launcher(ChannelLauncher(tx));
    let mut controller = engine.attach_controller().unwrap();
    let run = spawn(engine);

    controller
        .send(Command::ToggleWindow(WindowKind::Wheel))
        .unwrap();
    controller.send(Command::OpenWindow(WindowKind::Timer)).unwrap();
    let mut wheel = launched.recv().await.unwrap();
    let mut timer = launched.recv().await.unwrap();
    assert_eq!(wheel.role, SurfaceRole::WheelDisplay);
    assert_eq!(timer.role, SurfaceRole::TimerDisplay);

    let both_open = WindowSummary {
        wheel_display_open: true,
        timer_display_open: true,
    };
    next_matching(&mut controller, |m| {
        *m == HubMessage::WindowStateUpdate(both_open)
    })
    .await;

    controller.send(Command::Close).unwrap();
    next_matching(&mut wheel, |m| *m == HubMessage::Close).await;
    next_matching(&mut timer, |m| *m == HubMessage::Close).await;
    run.await.unwrap().unwrap();
}

#[tokio::test]
async fn spin_playback_applies_the_planned_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let (tx, mut launched) = mpsc::unbounded_channel();
    let mut engine = engine_in(dir.path())
        .with_launcher(ChannelLauncher(tx))
        .with_seed(42);
    let mut controller = engine.attach_controller().unwrap();
    let run = spawn(engine);

    controller.send(Command::TimeAdjust(600)).unwrap();
    assert_eq!(next_time(&mut controller).await, "00:00:00");
    assert_eq!(next_time(&mut controller).await, "00:10:00");

    controller.send(Command::OpenWindow(WindowKind::Wheel)).unwrap();
    let mut wheel = launched.recv().await.unwrap();
    controller.send(Command::Spin).unwrap();

    let plan = match next_matching(&mut wheel, |m| matches!(m, HubMessage::SpinPlanned(_))).await
    {
        HubMessage::SpinPlanned(plan) => plan,
        _ => unreachable!(),
    };
    assert!((8..=15).contains(&plan.spins));
    assert!((6..=8).contains(&plan.duration_secs));

    wheel.send(Command::SpinResult(plan.deltas.clone())).unwrap();
    let expected = prizeclock::components::expr::apply_time_deltas(600, &plan.deltas).max(0);
    assert_eq!(next_time(&mut controller).await, format_clock(expected));

    controller.send(Command::Close).unwrap();
    let session = run.await.unwrap().unwrap();
    assert_eq!(session.timer.remaining_seconds, expected);
}

#[tokio::test]
async fn export_and_import_report_to_the_requester() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = engine_in(dir.path());
    let mut controller = engine.attach_controller().unwrap();
    let run = spawn(engine);

    let export_path = dir.path().join("exports").join("session.json");
    controller
        .send(Command::ExportData(export_path.clone()))
        .unwrap();
    let exported = next_matching(&mut controller, |m| {
        matches!(m, HubMessage::ExportFinished(_))
    })
    .await;
    assert_eq!(exported, HubMessage::ExportFinished(Ok(export_path.clone())));

    let theme = ColorTheme {
        background: "#000000".into(),
        font: "#ff0000".into(),
    };
    controller
        .send(Command::ColorUpdate(theme.clone()))
        .unwrap();
    next_matching(&mut controller, |m| *m == HubMessage::ThemeUpdate(theme.clone())).await;

    controller
        .send(Command::ImportData(dir.path().join("missing.json")))
        .unwrap();
    next_matching(&mut controller, |m| {
        matches!(m, HubMessage::ImportFailed { .. })
    })
    .await;

    controller.send(Command::ImportData(export_path)).unwrap();
    let loaded = match next_matching(&mut controller, |m| matches!(m, HubMessage::LoadState(_))).await
    {
        HubMessage::LoadState(state) => state,
        _ => unreachable!(),
    };
    assert_eq!(loaded.theme, ColorTheme::default());

    controller.send(Command::Close).unwrap();
    let session = run.await.unwrap().unwrap();
    assert_eq!(session.theme, ColorTheme::default());
}

#[tokio::test]
async fn bootstrap_restores_the_autosave() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let mut saved = config.defaults.session();
    saved.timer.remaining_seconds = 95;
    saved.font = FontSelection("Excalifont".into());
    save_session(&saved, &config.persistence.autosave_path).unwrap();

    let mut engine = PrizeclockEngine::bootstrap(config).await.without_ctrl_c();
    let mut events = engine.subscribe_system_events();
    let mut controller = engine.attach_controller().unwrap();
    let run = spawn(engine);

    assert_eq!(
        controller.messages.recv().await,
        Some(HubMessage::LoadState(saved.clone()))
    );
    assert_eq!(next_time(&mut controller).await, "00:01:35");

    controller.send(Command::Close).unwrap();
    assert_eq!(run.await.unwrap().unwrap(), saved);

    let mut restored = false;
    while let Ok(event) = events.try_recv() {
        restored |= matches!(event, SystemEvent::SessionRestored { .. });
    }
    assert!(restored);
}

#[tokio::test]
async fn bootstrap_without_autosave_starts_from_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let defaults = config.defaults.session();

    let mut engine = PrizeclockEngine::bootstrap(config).await.without_ctrl_c();
    let mut controller = engine.attach_controller().unwrap();
    assert!(matches!(
        controller.messages.recv().await,
        Some(HubMessage::WheelUpdated { .. })
    ));

    let run = spawn(engine);
    controller.send(Command::Close).unwrap();
    assert_eq!(run.await.unwrap().unwrap(), defaults);
}

#[tokio::test]
async fn engine_requires_exactly_one_controller() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_in(dir.path());
    assert!(engine.run().await.is_err());

    let mut engine = engine_in(dir.path());
    engine.attach_controller().unwrap();
    assert!(matches!(
        engine.attach_controller(),
        Err(EngineError::ControllerAlreadyAttached)
    ));
}

#[tokio::test]
async fn shutdown_handle_ends_the_session() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = engine_in(dir.path());
    let handle = engine.handle();
    let _controller = engine.attach_controller().unwrap();
    let run = spawn(engine);

    handle.shutdown().unwrap();
    run.await.unwrap().unwrap();
    assert!(dir.path().join("app-state.json").exists());
    assert!(matches!(handle.shutdown(), Err(EngineError::Closed)));
}
