//! Request pacing for the TMDB API.

use std::time::{Duration, Instant};

/// Default minimum spacing between requests (~40 req/s).
const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(25);

/// Single-slot pacer: each request reserves the next free slot
/// `min_interval` after the previous one.
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum spacing between two requests.
    min_interval: Duration,
    /// Earliest instant the next request may start.
    next_slot: Option<Instant>,
}

impl RateLimiter {
    /// Creates a limiter with the given spacing.
    pub(crate) const fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: None,
        }
    }

    /// Creates a limiter with the default spacing (25ms).
    pub(crate) const fn with_default_interval() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }

    /// Time left before the next slot opens, measured from `now`.
    fn delay_at(&self, now: Instant) -> Duration {
        self.next_slot
            .map_or(Duration::ZERO, |slot| slot.saturating_duration_since(now))
    }

    /// Sleeps until a slot is free, then reserves the following one.
    pub async fn acquire(&mut self) {
        let delay = self.delay_at(Instant::now());
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let started = Instant::now();
        self.next_slot = started.checked_add(self.min_interval);
    }
}
