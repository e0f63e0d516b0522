//! The countdown state machine.
//!
//! Every start hands out a new ticker generation. A tick only counts when it
//! carries the generation of the ticker currently running, so a ticker that
//! was cancelled but still had a tick in flight can never decrement.

use crate::session::TimerState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Stopped,
    Running { generation: u64 },
}

/// What the caller must do with the tick source after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerChange {
    /// Start a ticker stamped with this generation.
    Start { generation: u64 },
    /// Cancel the ticker with this generation.
    Cancel { generation: u64 },
    None,
}

#[derive(Debug, Clone)]
pub struct TimerEngine {
    remaining: i64,
    phase: TimerPhase,
    next_generation: u64,
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new(0)
    }
}

impl TimerEngine {
    /// A stopped timer holding `remaining` seconds.
    pub fn new(remaining: i64) -> Self {
        Self {
            remaining,
            phase: TimerPhase::Stopped,
            next_generation: 1,
        }
    }

    pub fn remaining(&self) -> i64 {
        self.remaining
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, TimerPhase::Running { .. })
    }

    pub fn state(&self) -> TimerState {
        TimerState {
            remaining_seconds: self.remaining,
            running: self.is_running(),
        }
    }

    /// The `start-pause` command: Stopped -> Running or Running -> Stopped.
    pub fn toggle(&mut self) -> TickerChange {
        match self.phase {
            TimerPhase::Running { generation } => {
                self.phase = TimerPhase::Stopped;
                TickerChange::Cancel { generation }
            }
            TimerPhase::Stopped => {
                let generation = self.next_generation;
                self.next_generation += 1;
                self.phase = TimerPhase::Running { generation };
                TickerChange::Start { generation }
            }
        }
    }

    /// Forces Stopped, cancelling any ticker. Remaining is left as is.
    pub fn stop(&mut self) -> TickerChange {
        match std::mem::replace(&mut self.phase, TimerPhase::Stopped) {
            TimerPhase::Running { generation } => TickerChange::Cancel { generation },
            TimerPhase::Stopped => TickerChange::None,
        }
    }

    /// The `reset` command: zero and Stopped, from either state.
    pub fn reset(&mut self) -> TickerChange {
        self.remaining = 0;
        self.stop()
    }

    /// Adds `delta` seconds without touching run state. May go negative.
    pub fn adjust(&mut self, delta: i64) {
        self.remaining = self.remaining.saturating_add(delta);
    }

    pub fn set_remaining(&mut self, remaining: i64) {
        self.remaining = remaining;
    }

    /// Counts down exactly one second if `generation` is the live ticker.
    ///
    /// Elapsed wall-clock time is not consulted: a late tick still removes
    /// exactly one second. Returns the new remaining value, or `None` for a
    /// stale tick.
    pub fn tick(&mut self, generation: u64) -> Option<i64> {
        match self.phase {
            TimerPhase::Running { generation: live } if live == generation => {
                self.remaining = self.remaining.saturating_sub(1);
                Some(self.remaining)
            }
            _ => None,
        }
    }

    pub fn display(&self) -> String {
        format_clock(self.remaining)
    }
}

/// Formats seconds as `HH:MM:SS`, prefixed with `-` when negative.
///
/// Hours are not capped at two digits.
pub fn format_clock(total_seconds: i64) -> String {
    let sign = if total_seconds < 0 { "-" } else { "" };
    let abs = total_seconds.unsigned_abs();
    let hours = abs / 3600;
    let minutes = (abs % 3600) / 60;
    let seconds = abs % 60;
    format!("{sign}{hours:02}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_stopped_at_zero() {
        let timer = TimerEngine::default();
        assert_eq!(timer.phase(), TimerPhase::Stopped);
        assert_eq!(timer.remaining(), 0);
    }

    #[test]
    fn start_pause_toggles() {
        let mut timer = TimerEngine::new(10);
        let TickerChange::Start { generation } = timer.toggle() else {
            panic!("expected a start");
        };
        assert!(timer.is_running());
        assert_eq!(timer.toggle(), TickerChange::Cancel { generation });
        assert!(!timer.is_running());
    }

    #[test]
    fn each_start_gets_a_new_generation() {
        let mut timer = TimerEngine::default();
        let first = timer.toggle();
        timer.toggle();
        let second = timer.toggle();
        assert_ne!(first, second);
    }

    #[test]
    fn reset_from_either_state() {
        let mut timer = TimerEngine::new(42);
        assert_eq!(timer.reset(), TickerChange::None);
        assert_eq!(timer.state(), TimerState { remaining_seconds: 0, running: false });

        let mut timer = TimerEngine::new(42);
        let TickerChange::Start { generation } = timer.toggle() else {
            panic!("expected a start");
        };
        assert_eq!(timer.reset(), TickerChange::Cancel { generation });
        assert_eq!(timer.state(), TimerState { remaining_seconds: 0, running: false });
    }

    #[test]
    fn tick_decrements_by_one_only_for_live_generation() {
        let mut timer = TimerEngine::new(3);
        assert_eq!(timer.tick(1), None);

        let TickerChange::Start { generation: old } = timer.toggle() else {
            panic!("expected a start");
        };
        assert_eq!(timer.tick(old), Some(2));
        timer.toggle();
        let TickerChange::Start { generation: new } = timer.toggle() else {
            panic!("expected a start");
        };
        assert_eq!(timer.tick(old), None);
        assert_eq!(timer.tick(new), Some(1));
        assert_eq!(timer.tick(new), Some(0));
        assert_eq!(timer.tick(new), Some(-1));
    }

    #[test]
    fn adjust_keeps_run_state_and_may_go_negative() {
        let mut timer = TimerEngine::new(10);
        timer.toggle();
        timer.adjust(-30);
        assert_eq!(timer.remaining(), -20);
        assert!(timer.is_running());
        assert_eq!(timer.display(), "-00:00:20");
    }

    #[test]
    fn clock_formatting() {
        assert_eq!(format_clock(0), "00:00:00");
        assert_eq!(format_clock(59), "00:00:59");
        assert_eq!(format_clock(3725), "01:02:05");
        assert_eq!(format_clock(-3725), "-01:02:05");
        assert_eq!(format_clock(100 * 3600), "100:00:00");
        assert_eq!(format_clock(i64::MIN).chars().next(), Some('-'));
    }
}
