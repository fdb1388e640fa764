//! Simulated "new event nearby" notification feed.
//!
//! While the feed runs, every tick rolls the dice once and, on a hit,
//! publishes an informational notification. The random source is owned by
//! the environment so tests can seed it or pin the chance to 0 or 100.

use crate::config::FeedConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Title of feed notifications
pub const FEED_TITLE: &str = "New event added to your area!";

/// Body of feed notifications
pub const FEED_MESSAGE: &str = "Check out the latest events";

/// Interval and odds of the notification feed
#[derive(Clone)]
pub struct NotificationFeed {
    interval: Duration,
    chance_percent: u32,
    rng: Arc<Mutex<StdRng>>,
}

impl NotificationFeed {
    /// Feed ticking every `interval`, publishing with `chance_percent` odds
    ///
    /// Chances above 100 are treated as 100.
    #[must_use]
    pub fn new(interval: Duration, chance_percent: u32, rng: StdRng) -> Self {
        Self {
            interval,
            chance_percent: chance_percent.min(100),
            rng: Arc::new(Mutex::new(rng)),
        }
    }

    /// Feed configured from `config`; entropy-seeded unless a seed is set
    #[must_use]
    pub fn from_config(config: &FeedConfig) -> Self {
        Self::new(
            config.interval(),
            config.chance_percent,
            crate::sample::rng(config.seed),
        )
    }

    /// Time between ticks
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Publishing odds in percent
    #[must_use]
    pub const fn chance_percent(&self) -> u32 {
        self.chance_percent
    }

    /// Whether this tick publishes
    ///
    /// Clones share one random source, so a seeded feed yields the same
    /// sequence however many environment copies exist.
    #[must_use]
    pub fn roll(&self) -> bool {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.gen_ratio(self.chance_percent, 100)
    }
}

impl Default for NotificationFeed {
    /// Every 30 seconds with 30% odds
    fn default() -> Self {
        Self::new(Duration::from_secs(30), 30, StdRng::from_entropy())
    }
}

impl std::fmt::Debug for NotificationFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationFeed")
            .field("interval", &self.interval)
            .field("chance_percent", &self.chance_percent)
            .finish_non_exhaustive()
    }
}
