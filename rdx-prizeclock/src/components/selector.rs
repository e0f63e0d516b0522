//! Weighted wheel selection.
//!
//! The winner is decided first, from the weights alone. The stop angle handed
//! to the renderer is then drawn from inside the winner's segment, so the
//! animation can only ever land on the option that already won.

use crate::config::SpinConfig;
use crate::session::{TimeDeltas, WheelState};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

/// Everything the renderer needs to play back a spin whose outcome is fixed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinPlan {
    /// Index of the winning option in `WheelState::options`.
    pub winner: usize,
    pub name: String,
    pub deltas: TimeDeltas,
    /// Degrees within the winner's segment where the wheel comes to rest.
    pub stop_angle: f64,
    /// Full rotations before stopping.
    pub spins: u32,
    pub duration_secs: u32,
}

pub struct WheelSelector<R = StdRng> {
    rng: R,
    config: SpinConfig,
}

impl WheelSelector<StdRng> {
    pub fn from_entropy(config: SpinConfig) -> Self {
        Self::with_rng(StdRng::from_entropy(), config)
    }

    pub fn seeded(seed: u64, config: SpinConfig) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), config)
    }
}

impl<R: Rng> WheelSelector<R> {
    pub fn with_rng(rng: R, config: SpinConfig) -> Self {
        Self { rng, config }
    }

    /// Picks a winning option index, or `None` when nothing is playable.
    ///
    /// Draws `r` in `[0, total)` and walks the playable options subtracting
    /// weights; the first option that takes `r` to zero or below wins. If
    /// float rounding walks off the end, the last playable option wins.
    pub fn select(&mut self, wheel: &WheelState) -> Option<usize> {
        let total = wheel.total_weight();
        if !total.is_finite() || total <= 0.0 {
            return None;
        }
        let mut last = None;
        let mut remaining = self.rng.gen_range(0.0..total);
        for (index, option) in wheel.playable() {
            remaining -= option.weight;
            if remaining <= 0.0 {
                return Some(index);
            }
            last = Some(index);
        }
        last
    }

    /// Selects a winner and derives the presentation parameters for it.
    pub fn plan(&mut self, wheel: &WheelState) -> Option<SpinPlan> {
        let winner = self.select(wheel)?;
        let segment = wheel
            .segments()
            .into_iter()
            .find(|segment| segment.option == winner)?;

        let stop_angle = if segment.sweep() > 0.0 {
            self.rng.gen_range(segment.start_angle..segment.end_angle)
        } else {
            segment.start_angle
        };
        let spins = self
            .rng
            .gen_range(self.config.min_spins..=self.config.max_spins.max(self.config.min_spins));
        let duration_secs = self.rng.gen_range(
            self.config.min_duration_secs
                ..=self
                    .config
                    .max_duration_secs
                    .max(self.config.min_duration_secs),
        );

        let option = &wheel.options()[winner];
        Some(SpinPlan {
            winner,
            name: option.name.clone(),
            deltas: option.deltas.clone(),
            stop_angle,
            spins,
            duration_secs,
        })
    }
}
