//! Tick sources that drive a running countdown.
//!
//! A ticker is started per run of the timer and stamped with that run's
//! generation. It feeds `HubInput::Tick` into the engine inbox until its
//! `TickHandle` is cancelled or dropped. The production source is backed by
//! `tokio::time`; tests can swap in `ManualTickSource` and fire ticks by hand.

use crate::command::HubInput;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace};

/// Where a ticker delivers its ticks.
#[derive(Debug, Clone)]
pub struct TickSink {
    generation: u64,
    inbox: mpsc::UnboundedSender<HubInput>,
}

impl TickSink {
    pub fn new(generation: u64, inbox: mpsc::UnboundedSender<HubInput>) -> Self {
        Self { generation, inbox }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Sends one tick. Returns `false` once the engine has gone away.
    pub fn tick(&self) -> bool {
        self.inbox
            .send(HubInput::Tick {
                generation: self.generation,
            })
            .is_ok()
    }
}

/// Keeps a ticker alive. Dropping the handle stops it.
#[derive(Debug)]
pub struct TickHandle {
    generation: u64,
    _cancel: oneshot::Sender<()>,
}

impl TickHandle {
    /// A handle plus the receiver a ticker watches to learn it was stopped.
    pub fn new(generation: u64) -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                generation,
                _cancel: tx,
            },
            rx,
        )
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cancel(self) {
        debug!("Cancelling ticker #{}", self.generation);
    }
}

pub trait TickSource: Send {
    fn start(&mut self, period: Duration, sink: TickSink) -> TickHandle;
}

/// Ticks on the tokio timer. The first tick arrives one period after start.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioTickSource;

impl TickSource for TokioTickSource {
    fn start(&mut self, period: Duration, sink: TickSink) -> TickHandle {
        let (handle, mut cancelled) = TickHandle::new(sink.generation());
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::spawn(async move {
            debug!("Ticker #{} started at {:?}", sink.generation(), period);
            loop {
                tokio::select! {
                    biased;
                    _ = &mut cancelled => break,
                    _ = ticker.tick() => {
                        trace!("Ticker #{} fired", sink.generation());
                        if !sink.tick() {
                            break;
                        }
                    }
                }
            }
            debug!("Ticker #{} stopped", sink.generation());
        });
        handle
    }
}

/// A tick source that only ticks when told to.
#[derive(Debug, Default, Clone)]
pub struct ManualTickSource {
    tickers: Arc<Mutex<Vec<(TickSink, oneshot::Receiver<()>)>>>,
}

impl ManualTickSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires one tick on every ticker still running. Returns how many fired.
    pub fn fire(&self) -> usize {
        let mut tickers = self.tickers.lock().unwrap_or_else(PoisonError::into_inner);
        tickers.retain_mut(|(_, cancelled)| {
            matches!(cancelled.try_recv(), Err(oneshot::error::TryRecvError::Empty))
        });
        tickers.iter().filter(|(sink, _)| sink.tick()).count()
    }

    /// Number of tickers that have not been cancelled yet.
    pub fn active(&self) -> usize {
        let mut tickers = self.tickers.lock().unwrap_or_else(PoisonError::into_inner);
        tickers.retain_mut(|(_, cancelled)| {
            matches!(cancelled.try_recv(), Err(oneshot::error::TryRecvError::Empty))
        });
        tickers.len()
    }
}

impl TickSource for ManualTickSource {
    fn start(&mut self, _period: Duration, sink: TickSink) -> TickHandle {
        let (handle, cancelled) = TickHandle::new(sink.generation());
        self.tickers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((sink, cancelled));
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticks(rx: &mut mpsc::UnboundedReceiver<HubInput>) -> Vec<u64> {
        std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|input| match input {
                HubInput::Tick { generation } => Some(generation),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn manual_source_stops_on_drop() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut source = ManualTickSource::new();
        let first = source.start(Duration::from_secs(1), TickSink::new(1, tx.clone()));
        let second = source.start(Duration::from_secs(1), TickSink::new(2, tx));

        assert_eq!(source.fire(), 2);
        drop(first);
        assert_eq!(source.active(), 1);
        assert_eq!(source.fire(), 1);
        second.cancel();
        assert_eq!(source.fire(), 0);

        assert_eq!(ticks(&mut rx), vec![1, 2, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_source_ticks_once_per_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = TokioTickSource.start(Duration::from_secs(1), TickSink::new(4, tx));

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(ticks(&mut rx), vec![4, 4, 4]);

        handle.cancel();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(ticks(&mut rx).is_empty());
    }
}
