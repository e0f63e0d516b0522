//! The on-disk JSON shape of a session.
//!
//! ```json
//! {
//!   "options": [{ "name": "+1 min", "probability": 1, "color": "#2ecc71", "h": "", "m": "1", "s": "" }],
//!   "countdownSeconds": 90,
//!   "timerColors": { "background": "#2c3e50", "font": "#ecf0f1" },
//!   "fontFamily": "cwTeXFangSong"
//! }
//! ```
//!
//! Reading is lenient: older files store `h`/`m`/`s` as numbers, weights can
//! be missing or junk, and the options, theme and font may be absent. An
//! explicit empty `options` list is an empty wheel, not a missing one.

use crate::components::timer::TimerEngine;
use crate::config::SessionDefaults;
use crate::session::{
    normalize_weight, ColorTheme, FontSelection, SessionState, TimeDeltas, WheelOption,
    WheelState,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionFile {
    #[serde(default)]
    pub options: Option<Vec<OptionRecord>>,
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub countdown_seconds: i64,
    #[serde(default)]
    pub timer_colors: Option<ColorTheme>,
    #[serde(default)]
    pub font_family: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_probability", deserialize_with = "lenient_weight")]
    pub probability: f64,
    #[serde(default)]
    pub color: String,
    #[serde(default, deserialize_with = "lenient_expression")]
    pub h: String,
    #[serde(default, deserialize_with = "lenient_expression")]
    pub m: String,
    #[serde(default, deserialize_with = "lenient_expression")]
    pub s: String,
}

impl SessionFile {
    pub fn from_session(state: &SessionState) -> Self {
        Self {
            options: Some(
                state
                    .wheel
                    .options()
                    .iter()
                    .map(|option| OptionRecord {
                        name: option.name.clone(),
                        probability: option.weight,
                        color: option.color.clone(),
                        h: option.deltas.h.clone(),
                        m: option.deltas.m.clone(),
                        s: option.deltas.s.clone(),
                    })
                    .collect(),
            ),
            countdown_seconds: state.timer.remaining_seconds,
            timer_colors: Some(state.theme.clone()),
            font_family: Some(state.font.0.clone()),
        }
    }

    /// Builds a stopped session from the file, filling gaps from `defaults`.
    /// A file without an `options` key loads the default options.
    pub fn into_session(self, defaults: &SessionDefaults) -> SessionState {
        let options = match self.options {
            None => defaults.options(),
            Some(records) => records
                .into_iter()
                .map(|record| {
                    WheelOption::new(
                        record.name,
                        record.probability,
                        record.color,
                        TimeDeltas::new(record.h, record.m, record.s),
                    )
                })
                .collect(),
        };

        SessionState {
            wheel: WheelState::new(options),
            timer: TimerEngine::new(self.countdown_seconds).state(),
            theme: self.timer_colors.unwrap_or_else(|| defaults.theme()),
            font: self
                .font_family
                .map(FontSelection)
                .unwrap_or_else(|| defaults.font()),
        }
    }
}

fn default_probability() -> f64 {
    1.0
}

fn lenient_weight<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let weight = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().unwrap_or(1.0),
        Value::String(s) => s.trim().parse().unwrap_or(1.0),
        _ => 1.0,
    };
    Ok(normalize_weight(weight))
}

fn lenient_expression<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

fn lenient_seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}
