//! The session data model: wheel options, timer state, theme and font.
//!
//! `SessionState` is the unit of persistence and broadcast. It is only ever
//! mutated by the `StateHub`; everything here is plain data plus the derived
//! wheel geometry.

use serde::{Deserialize, Serialize};

/// A full turn, in degrees.
pub const FULL_TURN: f64 = 360.0;

/// Replaces a weight that is not a positive finite number with 1.
pub fn normalize_weight(weight: f64) -> f64 {
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        1.0
    }
}

/// The hour/minute/second expressions attached to an option.
///
/// Each field is user text interpreted by the expression evaluator against the
/// current countdown when the option wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeDeltas {
    pub h: String,
    pub m: String,
    pub s: String,
}

impl TimeDeltas {
    pub fn new(h: impl Into<String>, m: impl Into<String>, s: impl Into<String>) -> Self {
        Self {
            h: h.into(),
            m: m.into(),
            s: s.into(),
        }
    }

    pub fn fields(&self) -> [&str; 3] {
        [&self.h, &self.m, &self.s]
    }
}

/// One weighted entry on the wheel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WheelOption {
    pub name: String,
    pub weight: f64,
    pub color: String,
    pub deltas: TimeDeltas,
    /// Position in the wheel. Reassigned from sequence position whenever the
    /// option list is replaced.
    pub order: usize,
}

impl WheelOption {
    pub fn new(
        name: impl Into<String>,
        weight: f64,
        color: impl Into<String>,
        deltas: TimeDeltas,
    ) -> Self {
        Self {
            name: name.into(),
            weight: normalize_weight(weight),
            color: color.into(),
            deltas,
            order: 0,
        }
    }

    /// Options with a blank name stay in the list but are not drawn or picked.
    pub fn is_playable(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

/// The angular slice of the wheel assigned to one playable option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    /// Index of the option in `WheelState::options`.
    pub option: usize,
    pub name: String,
    pub color: String,
    pub start_angle: f64,
    pub end_angle: f64,
}

impl Segment {
    pub fn sweep(&self) -> f64 {
        self.end_angle - self.start_angle
    }

    pub fn contains(&self, angle: f64) -> bool {
        angle >= self.start_angle && angle < self.end_angle
    }
}

/// The ordered option list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WheelState {
    options: Vec<WheelOption>,
}

impl WheelState {
    pub fn new(options: Vec<WheelOption>) -> Self {
        let options = options
            .into_iter()
            .enumerate()
            .map(|(order, mut option)| {
                option.weight = normalize_weight(option.weight);
                option.order = order;
                option
            })
            .collect();
        Self { options }
    }

    pub fn options(&self) -> &[WheelOption] {
        &self.options
    }

    /// Iterates the options that take part in drawing and selection, with
    /// their index in the full list.
    pub fn playable(&self) -> impl Iterator<Item = (usize, &WheelOption)> {
        self.options
            .iter()
            .enumerate()
            .filter(|(_, option)| option.is_playable())
    }

    pub fn total_weight(&self) -> f64 {
        self.playable().map(|(_, option)| option.weight).sum()
    }

    /// Selection is disabled when nothing is playable.
    pub fn is_spinnable(&self) -> bool {
        self.playable().next().is_some()
    }

    /// Lays the playable options out around a full turn.
    ///
    /// The last segment always ends at exactly 360 degrees so rounding never
    /// leaves a gap or an overlap.
    pub fn segments(&self) -> Vec<Segment> {
        let total = self.total_weight();
        let playable: Vec<_> = self.playable().collect();
        let last = playable.len().saturating_sub(1);
        let mut start = 0.0;
        playable
            .into_iter()
            .enumerate()
            .map(|(position, (index, option))| {
                let end = if position == last {
                    FULL_TURN
                } else {
                    start + FULL_TURN * option.weight / total
                };
                let segment = Segment {
                    option: index,
                    name: option.name.clone(),
                    color: option.color.clone(),
                    start_angle: start,
                    end_angle: end,
                };
                start = end;
                segment
            })
            .collect()
    }
}

/// The countdown. `remaining_seconds` may be negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub remaining_seconds: i64,
    pub running: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorTheme {
    pub background: String,
    pub font: String,
}

impl Default for ColorTheme {
    fn default() -> Self {
        Self {
            background: "#2c3e50".to_string(),
            font: "#ecf0f1".to_string(),
        }
    }
}

/// An opaque font identifier. Mapping it to a concrete font stack is the
/// presentation layer's job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FontSelection(pub String);

impl Default for FontSelection {
    fn default() -> Self {
        Self("cwTeXFangSong".to_string())
    }
}

/// The single authoritative snapshot of wheel, timer, theme and font.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub wheel: WheelState,
    pub timer: TimerState,
    pub theme: ColorTheme,
    pub font: FontSelection,
}

/// A partial edit. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionPatch {
    pub options: Option<Vec<WheelOption>>,
    pub remaining_seconds: Option<i64>,
    pub theme: Option<ColorTheme>,
    pub font: Option<FontSelection>,
}

impl SessionPatch {
    pub fn options(options: Vec<WheelOption>) -> Self {
        Self {
            options: Some(options),
            ..Default::default()
        }
    }

    pub fn theme(theme: ColorTheme) -> Self {
        Self {
            theme: Some(theme),
            ..Default::default()
        }
    }

    pub fn font(font: FontSelection) -> Self {
        Self {
            font: Some(font),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_none()
            && self.remaining_seconds.is_none()
            && self.theme.is_none()
            && self.font.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn option(name: &str, weight: f64) -> WheelOption {
        WheelOption::new(name, weight, "#ffffff", TimeDeltas::default())
    }

    #[test]
    fn bad_weights_become_one() {
        assert_eq!(normalize_weight(0.0), 1.0);
        assert_eq!(normalize_weight(-3.0), 1.0);
        assert_eq!(normalize_weight(f64::NAN), 1.0);
        assert_eq!(normalize_weight(f64::INFINITY), 1.0);
        assert_eq!(normalize_weight(2.5), 2.5);
    }

    #[test]
    fn order_follows_sequence_position() {
        let mut moved = option("b", 1.0);
        moved.order = 7;
        let wheel = WheelState::new(vec![option("a", 1.0), moved]);
        let orders: Vec<_> = wheel.options().iter().map(|o| o.order).collect();
        assert_eq!(orders, vec![0, 1]);
    }

    #[test]
    fn segments_are_proportional_to_weight() {
        let wheel = WheelState::new(vec![option("a", 1.0), option("b", 3.0)]);
        let segments = wheel.segments();
        assert_eq!(segments.len(), 2);
        assert!((segments[0].sweep() - 90.0).abs() < 1e-9);
        assert!((segments[1].sweep() - 270.0).abs() < 1e-9);
        assert_eq!(segments[1].start_angle, segments[0].end_angle);
    }

    #[test]
    fn blank_names_are_not_drawn() {
        let wheel = WheelState::new(vec![option("  ", 5.0), option("keep", 1.0)]);
        let segments = wheel.segments();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].option, 1);
        assert_eq!(wheel.total_weight(), 1.0);
        assert!(wheel.is_spinnable());
    }

    #[test]
    fn empty_wheel_is_not_spinnable() {
        let wheel = WheelState::default();
        assert!(!wheel.is_spinnable());
        assert!(wheel.segments().is_empty());
    }

    proptest! {
        #[test]
        fn arcs_always_cover_a_full_turn(weights in prop::collection::vec(1e-6f64..1e6, 1..64)) {
            let options = weights
                .iter()
                .enumerate()
                .map(|(i, w)| option(&format!("o{i}"), *w))
                .collect();
            let segments = WheelState::new(options).segments();
            let sum: f64 = segments.iter().map(Segment::sweep).sum();
            prop_assert!((sum - FULL_TURN).abs() < 1e-6);
            prop_assert_eq!(segments.last().map(|s| s.end_angle), Some(FULL_TURN));
        }
    }
}
