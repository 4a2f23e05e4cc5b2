//! Per-provider minimum call spacing.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Spaces calls to one provider at least `min_interval` apart, across every
/// task sharing the gate.
///
/// Callers reserve the next free slot under the lock and sleep outside it,
/// so a waiting task never blocks others from queueing behind it.
#[derive(Debug)]
pub struct RateGate {
    min_interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits until the caller may issue its call.
    pub async fn acquire(&self) {
        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next {
                Some(at) if at > now => at,
                _ => now,
            };
            *next = Some(slot + self.min_interval);
            slot
        };
        tokio::time::sleep_until(slot).await;
    }

    /// Holds every caller back until at least `delay` from now. Used when
    /// the provider signals throttling.
    pub async fn defer(&self, delay: Duration) {
        let mut next = self.next_slot.lock().await;
        let until = Instant::now() + delay;
        if next.map_or(true, |at| at < until) {
            *next = Some(until);
        }
    }
}
