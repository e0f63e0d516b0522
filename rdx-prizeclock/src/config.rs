//! Defines all configuration structures for the Prizeclock engine.
//!
//! These structs are deserialized with `serde`, usually from a TOML file
//! through the `config` crate. Every field has a default, so a missing file
//! or a partial one is fine. There is no environment source.

use crate::components::timer::TimerEngine;
use crate::session::{
    ColorTheme, FontSelection, SessionState, TimeDeltas, WheelOption, WheelState,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The top-level configuration for the `PrizeclockEngine`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PrizeclockConfig {
    pub timer: TimerConfig,
    pub spin: SpinConfig,
    pub persistence: PersistenceConfig,
    /// What a fresh session looks like when there is no autosave.
    pub defaults: SessionDefaults,
    /// Capacity of the `SystemEvent` broadcast channel.
    pub system_channel_capacity: usize,
}

impl Default for PrizeclockConfig {
    fn default() -> Self {
        Self {
            timer: TimerConfig::default(),
            spin: SpinConfig::default(),
            persistence: PersistenceConfig::default(),
            defaults: SessionDefaults::default(),
            system_channel_capacity: default_system_channel_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Nominal ticker period. Each tick removes one second regardless.
    pub tick_period_ms: u64,
}

impl TimerConfig {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms.max(1))
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 1000,
        }
    }
}

/// Ranges for the presentation parameters of a spin.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SpinConfig {
    pub min_spins: u32,
    pub max_spins: u32,
    pub min_duration_secs: u32,
    pub max_duration_secs: u32,
}

impl Default for SpinConfig {
    fn default() -> Self {
        Self {
            min_spins: 8,
            max_spins: 15,
            min_duration_secs: 6,
            max_duration_secs: 8,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Where the session is silently saved on shutdown and restored from.
    pub autosave_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            autosave_path: PathBuf::from("app-state.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionDefaults {
    pub background: String,
    pub font_color: String,
    pub font_family: String,
    pub options: Vec<OptionConfig>,
}

/// A default wheel option as written in the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct OptionConfig {
    pub name: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    pub color: String,
    #[serde(default)]
    pub h: String,
    #[serde(default)]
    pub m: String,
    #[serde(default)]
    pub s: String,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        let theme = ColorTheme::default();
        let option = |name: &str, color: &str, m: &str, s: &str| OptionConfig {
            name: name.to_string(),
            weight: 1.0,
            color: color.to_string(),
            h: String::new(),
            m: m.to_string(),
            s: s.to_string(),
        };
        Self {
            background: theme.background,
            font_color: theme.font,
            font_family: FontSelection::default().0,
            options: vec![
                option("+1 min", "#2ecc71", "1", ""),
                option("-30 sec", "#e74c3c", "", "-30"),
                option("+5 min", "#3498db", "5", ""),
            ],
        }
    }
}

impl SessionDefaults {
    pub fn theme(&self) -> ColorTheme {
        ColorTheme {
            background: self.background.clone(),
            font: self.font_color.clone(),
        }
    }

    pub fn font(&self) -> FontSelection {
        FontSelection(self.font_family.clone())
    }

    pub fn options(&self) -> Vec<WheelOption> {
        self.options
            .iter()
            .map(|o| {
                WheelOption::new(
                    o.name.clone(),
                    o.weight,
                    o.color.clone(),
                    TimeDeltas::new(o.h.clone(), o.m.clone(), o.s.clone()),
                )
            })
            .collect()
    }

    /// A stopped, zeroed session with the default options, theme and font.
    pub fn session(&self) -> SessionState {
        SessionState {
            wheel: WheelState::new(self.options()),
            timer: TimerEngine::default().state(),
            theme: self.theme(),
            font: self.font(),
        }
    }
}

impl PrizeclockConfig {
    /// Loads configuration from an optional TOML file. A path that does not
    /// exist yields the defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        let mut config: Self = builder.build()?.try_deserialize()?;
        config.system_channel_capacity = config.system_channel_capacity.max(1);
        Ok(config)
    }
}

// --- Default value functions for serde ---

fn default_system_channel_capacity() -> usize {
    64
}

fn default_weight() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PrizeclockConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.timer.tick_period(), Duration::from_secs(1));
        assert_eq!(config.spin, SpinConfig::default());
        assert_eq!(config.defaults.options.len(), 3);
    }

    #[test]
    fn partial_file_overrides_only_named_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prizeclock.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r##"
[timer]
tick_period_ms = 250

[persistence]
autosave_path = "/tmp/elsewhere.json"

[[defaults.options]]
name = "Double"
color = "#123456"
m = "*2"
"##
        )
        .unwrap();

        let config = PrizeclockConfig::load(Some(&path)).unwrap();
        assert_eq!(config.timer.tick_period(), Duration::from_millis(250));
        assert_eq!(config.persistence.autosave_path, PathBuf::from("/tmp/elsewhere.json"));
        assert_eq!(config.spin.max_spins, 15);
        assert_eq!(config.system_channel_capacity, 64);

        let session = config.defaults.session();
        assert_eq!(session.wheel.options().len(), 1);
        assert_eq!(session.wheel.options()[0].deltas.m, "*2");
        assert_eq!(session.wheel.options()[0].weight, 1.0);
        assert_eq!(session.theme, ColorTheme::default());
    }
}
