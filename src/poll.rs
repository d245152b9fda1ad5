use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::warn;

/// Shortest period a [`PollLoop`] will tick at.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// A fixed-period re-evaluation loop that owns its timer.
///
/// The first tick fires immediately, then once per `period`. Each tick gets
/// a sequence number starting at 1 and runs as its own task, so a slow tick
/// may overlap the next one. Stopping or dropping the loop aborts the driver
/// and every in-flight tick; no tick fires afterwards.
pub struct PollLoop {
    driver: JoinHandle<()>,
}

impl PollLoop {
    /// Start ticking. Must be called from within a tokio runtime.
    ///
    /// A zero `period` is raised to [`MIN_PERIOD`].
    pub fn start<F, Fut>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let period = period.max(MIN_PERIOD);
        let driver = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut in_flight = JoinSet::new();
            let mut seq: u64 = 0;
            loop {
                interval.tick().await;
                while let Some(done) = in_flight.try_join_next() {
                    if let Err(e) = done {
                        if e.is_panic() {
                            warn!("Poll tick panicked: {e}");
                        }
                    }
                }
                seq += 1;
                in_flight.spawn(tick(seq));
            }
        });
        Self { driver }
    }

    /// Cancel the loop. Equivalent to dropping it.
    pub fn stop(self) {
        self.driver.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.driver.is_finished()
    }
}

impl Drop for PollLoop {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

/// A value tagged with the tick that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequenced<T> {
    pub seq: u64,
    pub value: T,
}

/// Most-recent-tick-wins slot.
///
/// `publish` only applies a result whose sequence number is higher than the
/// last applied one, so a slow tick finishing late cannot overwrite newer
/// state.
pub struct LatestValue<T> {
    tx: watch::Sender<Option<Sequenced<T>>>,
}

impl<T: Clone> LatestValue<T> {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Offer the result of tick `seq`. Returns `false` if it was stale and discarded.
    pub fn publish(&self, seq: u64, value: T) -> bool {
        self.tx.send_if_modified(|current| {
            if current.as_ref().is_some_and(|c| c.seq >= seq) {
                return false;
            }
            *current = Some(Sequenced { seq, value });
            true
        })
    }

    pub fn get(&self) -> Option<T> {
        self.tx.borrow().as_ref().map(|s| s.value.clone())
    }

    /// Sequence number of the last applied result, 0 if none.
    pub fn latest_seq(&self) -> u64 {
        self.tx.borrow().as_ref().map_or(0, |s| s.seq)
    }

    /// Receiver notified whenever a newer result is applied.
    pub fn subscribe(&self) -> watch::Receiver<Option<Sequenced<T>>> {
        self.tx.subscribe()
    }
}

impl<T: Clone> Default for LatestValue<T> {
    fn default() -> Self {
        Self::new()
    }
}
