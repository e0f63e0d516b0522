mod displays;
mod mirror;

use anyhow::Result;
use chrono::Local;
use colored::Colorize;
use displays::ShellLauncher;
use mirror::{spawn_controller_listener, Mirror};
use prizeclock::components::expr::evaluate;
use prizeclock::prelude::*;
use prizeclock::{ENGINE_NAME, VERSION as LIB_VERSION};
use rustyline::highlight::Highlighter;
use rustyline::Editor;
use rustyline_derive::{Completer, Helper, Hinter, Validator};
use std::borrow::Cow;
use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SHELL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Colors handed to options added from the shell, in turn.
const PALETTE: [&str; 7] = [
    "#e74c3c", "#3498db", "#2ecc71", "#f1c40f", "#9b59b6", "#e67e22", "#1abc9c",
];

/// A custom helper struct for rustyline that enables syntax highlighting.
#[derive(Completer, Helper, Hinter, Validator)]
struct ShellHighlighter;

impl Highlighter for ShellHighlighter {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if let Some((command, rest)) = line.split_once(' ') {
            let colored_command = command.yellow().bold();
            let colored_rest = rest.yellow();
            Cow::Owned(format!("{} {}", colored_command, colored_rest))
        } else {
            Cow::Owned(line.yellow().bold().to_string())
        }
    }
    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

fn print_banner() {
    if env::var("QUIET_MODE").is_ok() {
        return;
    }
    // Embedded at compile time; `logo.log` sits in the crate root.
    const LOGO_TEXT: &str = include_str!("../logo.log");
    println!("{}", LOGO_TEXT.cyan());

    let version_string = format!(
        "          Shell   v{:<8} Library   v{:<8}",
        SHELL_VERSION, LIB_VERSION
    );
    let rule = "-".repeat(80);
    let license_blurb = "
    This software is provided 'as is', without warranty of any kind.
    Distributed under the MIT OR Apache-2.0 license. Use at your own risk.
    ";

    println!("{}", rule.dimmed());
    println!("{}", version_string);
    println!("{}", license_blurb.dimmed());
    println!("{}", rule.dimmed());
}

fn print_help() {
    println!("Available commands:");
    println!("  spin                      - Spins the wheel.");
    println!("  start | pause             - Starts or pauses the countdown.");
    println!("  reset                     - Stops the countdown and sets it to zero.");
    println!("  adjust <SECONDS>          - Adds seconds (an expression, e.g. -30 or 5*60).");
    println!("  toggle wheel|timer        - Opens or closes a display.");
    println!("  open wheel|timer          - Opens a display, or brings it to front.");
    println!("  watch on|off              - Prints the timer display as it counts.");
    println!("  options                   - Lists the wheel options.");
    println!("  add <NAME> [W] [H] [M] [S] - Adds an option with weight and time fields.");
    println!("  set <N> <h|m|s|w|name> <V> - Changes one field of option N.");
    println!("  remove <N>                - Removes option N.");
    println!("  move <N> up|down          - Reorders option N.");
    println!("  color bg|font <HEX>       - Sets the timer display colors.");
    println!("  font <NAME>               - Sets the display font.");
    println!("  export [PATH]             - Exports the session as JSON.");
    println!("  import <PATH>             - Replaces the session from a JSON file.");
    println!("  status                    - Shows the countdown and open displays.");
    println!("  exit                      - Saves the session and quits.");
}

fn print_options(options: &[WheelOption]) {
    if options.is_empty() {
        println!("The wheel has no options.");
        return;
    }
    let total: f64 = options
        .iter()
        .filter(|o| o.is_playable())
        .map(|o| o.weight)
        .sum();
    println!("Wheel options:");
    for (index, option) in options.iter().enumerate() {
        let share = if option.is_playable() && total > 0.0 {
            format!("{:5.1}%", option.weight / total * 100.0)
        } else {
            "  --  ".to_string()
        };
        println!(
            "  #{:<2} {:<20} w={:<6} {} h={:?} m={:?} s={:?} {}",
            index,
            option.name.bold(),
            option.weight,
            share,
            option.deltas.h,
            option.deltas.m,
            option.deltas.s,
            option.color.dimmed()
        );
    }
}

/// Sends a command as the controller and reports a dead engine.
fn send(hub: &EngineHandle, id: SurfaceId, command: Command) {
    if let Err(e) = hub.send(id, command) {
        println!("{} {}", "Error:".red(), e);
    }
}

fn parse_window(arg: Option<&&str>) -> Option<WindowKind> {
    match arg.copied() {
        Some("wheel") => Some(WindowKind::Wheel),
        Some("timer") => Some(WindowKind::Timer),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config_path = env::args().nth(1).map(PathBuf::from);
    let config = PrizeclockConfig::load(config_path.as_deref())?;

    let watching = Arc::new(AtomicBool::new(false));
    let mut engine = PrizeclockEngine::bootstrap(config)
        .await
        .with_launcher(ShellLauncher::new(watching.clone()));

    let mut system_rx = engine.subscribe_system_events();
    tokio::spawn(async move {
        while let Ok(event) = system_rx.recv().await {
            info!("[SYSTEM EVENT] {:?}", event);
        }
    });

    let SurfaceLink {
        id, messages, hub, ..
    } = engine.attach_controller()?;
    let mirror = Arc::new(RwLock::new(Mirror::default()));
    spawn_controller_listener(messages, mirror.clone());

    info!("Spawning {} in the background...", ENGINE_NAME.cyan());
    let run = tokio::spawn(engine.run());

    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut rl = Editor::new()?;
    rl.set_helper(Some(ShellHighlighter));

    println!(
        "{} is running. Type 'help' for commands or 'exit' to quit.",
        ENGINE_NAME.cyan()
    );

    loop {
        if run.is_finished() {
            break;
        }
        let prompt = format!("{}", ">> ".cyan().bold());
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(_) => {
                println!("Exiting prizeshell...");
                break;
            }
        };
        rl.add_history_entry(line.as_str())?;
        let args = line.split_whitespace().collect::<Vec<_>>();
        let Some(command) = args.first() else {
            continue;
        };

        match *command {
            "spin" => send(&hub, id, Command::Spin),
            "start" | "pause" => {
                send(&hub, id, Command::TimerControl(TimerCommand::StartPause))
            }
            "reset" => send(&hub, id, Command::TimerControl(TimerCommand::Reset)),
            "adjust" => {
                let expr = args[1..].concat();
                match evaluate(&expr) {
                    Some(seconds) => send(&hub, id, Command::TimeAdjust(seconds.round() as i64)),
                    None => println!("Usage: adjust <SECONDS>"),
                }
            }
            "toggle" => match parse_window(args.get(1)) {
                Some(kind) => send(&hub, id, Command::ToggleWindow(kind)),
                None => println!("Usage: toggle wheel|timer"),
            },
            "open" => match parse_window(args.get(1)) {
                Some(kind) => send(&hub, id, Command::OpenWindow(kind)),
                None => println!("Usage: open wheel|timer"),
            },
            "watch" => match args.get(1) {
                Some(&"on") => {
                    watching.store(true, Ordering::Relaxed);
                    println!("--> Printing the timer display.");
                }
                Some(&"off") => {
                    watching.store(false, Ordering::Relaxed);
                    println!("--> Stopped printing the timer display.");
                }
                _ => println!("Usage: watch on|off"),
            },
            "options" => print_options(&mirror.read().await.options),
            "add" => {
                let Some(name) = args.get(1) else {
                    println!("Usage: add <NAME> [WEIGHT] [H] [M] [S]");
                    continue;
                };
                let weight = args.get(2).and_then(|w| w.parse().ok()).unwrap_or(1.0);
                let field = |i: usize| args.get(i).map_or(String::new(), |f| f.to_string());
                let mut options = mirror.read().await.options.clone();
                let color = PALETTE[options.len() % PALETTE.len()];
                options.push(WheelOption::new(
                    *name,
                    weight,
                    color,
                    TimeDeltas::new(field(3), field(4), field(5)),
                ));
                send(&hub, id, Command::Edit(SessionPatch::options(options)));
            }
            "set" => {
                let mut options = mirror.read().await.options.clone();
                let index = args.get(1).and_then(|n| n.parse::<usize>().ok());
                let (Some(index), Some(field), Some(_)) = (index, args.get(2), args.get(3)) else {
                    println!("Usage: set <N> <h|m|s|w|name> <VALUE>");
                    continue;
                };
                let value = args[3..].join(" ");
                let Some(option) = options.get_mut(index) else {
                    println!("Error: no option #{}. Use 'options' to list them.", index);
                    continue;
                };
                match *field {
                    "h" => option.deltas.h = value,
                    "m" => option.deltas.m = value,
                    "s" => option.deltas.s = value,
                    "w" => option.weight = value.parse().unwrap_or(1.0),
                    "name" => option.name = value,
                    _ => {
                        println!("Unknown field '{}'. Use h, m, s, w or name.", field);
                        continue;
                    }
                }
                send(&hub, id, Command::Edit(SessionPatch::options(options)));
            }
            "remove" => {
                let mut options = mirror.read().await.options.clone();
                match args.get(1).and_then(|n| n.parse::<usize>().ok()) {
                    Some(index) if index < options.len() => {
                        let removed = options.remove(index);
                        println!("--> Removed option {}", removed.name);
                        send(&hub, id, Command::Edit(SessionPatch::options(options)));
                    }
                    _ => println!("Usage: remove <N>"),
                }
            }
            "move" => {
                let mut options = mirror.read().await.options.clone();
                let index = args.get(1).and_then(|n| n.parse::<usize>().ok());
                let target = match (index, args.get(2)) {
                    (Some(i), Some(&"up")) if i > 0 && i < options.len() => Some((i, i - 1)),
                    (Some(i), Some(&"down")) if i + 1 < options.len() => Some((i, i + 1)),
                    _ => None,
                };
                match target {
                    Some((from, to)) => {
                        options.swap(from, to);
                        send(&hub, id, Command::Edit(SessionPatch::options(options)));
                    }
                    None => println!("Usage: move <N> up|down"),
                }
            }
            "color" => {
                let mut theme = mirror.read().await.theme.clone();
                match (args.get(1), args.get(2)) {
                    (Some(&"bg"), Some(hex)) => theme.background = hex.to_string(),
                    (Some(&"font"), Some(hex)) => theme.font = hex.to_string(),
                    _ => {
                        println!("Usage: color bg|font <HEX>");
                        continue;
                    }
                }
                send(&hub, id, Command::ColorUpdate(theme));
            }
            "font" => {
                if args.len() < 2 {
                    println!("Usage: font <NAME>");
                    continue;
                }
                let font = FontSelection(args[1..].join(" "));
                send(&hub, id, Command::FontChange(font));
            }
            "export" => {
                let path = args.get(1).map(PathBuf::from).unwrap_or_else(|| {
                    PathBuf::from(format!("wheel-data-{}.json", Local::now().format("%Y-%m-%d")))
                });
                send(&hub, id, Command::ExportData(path));
            }
            "import" => match args.get(1) {
                Some(path) => send(&hub, id, Command::ImportData(PathBuf::from(path))),
                None => println!("Usage: import <PATH>"),
            },
            "status" => {
                let view = mirror.read().await;
                let open = |live: bool| if live { "open".green() } else { "closed".dimmed() };
                println!("Countdown:      {}", view.time.bold());
                println!("Wheel display:  {}", open(view.windows.wheel_display_open));
                println!("Timer display:  {}", open(view.windows.timer_display_open));
                println!(
                    "Theme:          {} on {}, font {}",
                    view.theme.font, view.theme.background, view.font.0
                );
                if let Some(plan) = &view.last_spin {
                    println!("Last spin:      {}", plan.name);
                }
            }
            "help" => print_help(),
            "exit" => break,
            _ => println!("Unknown command: '{}'. Type 'help'.", line),
        }
    }

    hub.send(id, Command::Close).ok();
    match run.await? {
        Ok(session) => println!(
            "Session saved. Final countdown {}.",
            format_clock(session.timer.remaining_seconds).bold()
        ),
        Err(e) => eprintln!("\nEngine stopped with an error: {}", e),
    }
    Ok(())
}
