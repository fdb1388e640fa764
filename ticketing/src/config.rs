//! Configuration management for TicketDesk.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Snapshot persistence
    pub snapshot: SnapshotConfig,
    /// Reminder scheduling
    pub reminders: ReminderConfig,
    /// Simulated notification feed
    pub feed: FeedConfig,
    /// Sample catalogue used when no snapshot can be restored
    pub sample: SampleConfig,
    /// Current session
    pub session: SessionConfig,
    /// Logging
    pub logging: LoggingConfig,
}

/// Snapshot persistence configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Path of the JSON snapshot document
    pub path: String,
}

/// Reminder configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderConfig {
    /// Seconds between reminder polls (default: 60)
    pub poll_interval_secs: u64,
    /// Hours before an event that booking reminders fire (default: 24)
    pub lead_hours: i64,
}

/// Notification feed configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Seconds between feed ticks (default: 30)
    pub interval_secs: u64,
    /// Odds in percent that a tick publishes (default: 30)
    pub chance_percent: u32,
    /// Seed for reproducible feeds; random when unset
    pub seed: Option<u64>,
}

/// Sample catalogue configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleConfig {
    /// Number of generated events (default: 12)
    pub event_count: usize,
    /// Seed for reproducible samples; random when unset
    pub seed: Option<u64>,
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Organizer id of the current user (default: 1)
    pub organizer_id: u64,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (default: info)
    pub level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unparseable values fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            snapshot: SnapshotConfig {
                path: env::var("TICKETDESK_SNAPSHOT_PATH").unwrap_or(defaults.snapshot.path),
            },
            reminders: ReminderConfig {
                poll_interval_secs: env::var("TICKETDESK_REMINDER_POLL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|secs| *secs > 0)
                    .unwrap_or(defaults.reminders.poll_interval_secs),
                lead_hours: env::var("TICKETDESK_REMINDER_LEAD_HOURS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.reminders.lead_hours),
            },
            feed: FeedConfig {
                interval_secs: env::var("TICKETDESK_FEED_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|secs| *secs > 0)
                    .unwrap_or(defaults.feed.interval_secs),
                chance_percent: env::var("TICKETDESK_FEED_CHANCE_PERCENT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|percent| *percent <= 100)
                    .unwrap_or(defaults.feed.chance_percent),
                seed: env::var("TICKETDESK_FEED_SEED")
                    .ok()
                    .and_then(|s| s.parse().ok()),
            },
            sample: SampleConfig {
                event_count: env::var("TICKETDESK_SAMPLE_EVENTS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.sample.event_count),
                seed: env::var("TICKETDESK_SAMPLE_SEED")
                    .ok()
                    .and_then(|s| s.parse().ok()),
            },
            session: SessionConfig {
                organizer_id: env::var("TICKETDESK_ORGANIZER_ID")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.session.organizer_id),
            },
            logging: LoggingConfig {
                level: env::var("RUST_LOG").unwrap_or(defaults.logging.level),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snapshot: SnapshotConfig {
                path: "ticketdesk-snapshot.json".to_string(),
            },
            reminders: ReminderConfig {
                poll_interval_secs: 60,
                lead_hours: 24,
            },
            feed: FeedConfig {
                interval_secs: 30,
                chance_percent: 30,
                seed: None,
            },
            sample: SampleConfig {
                event_count: 12,
                seed: None,
            },
            session: SessionConfig { organizer_id: 1 },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl ReminderConfig {
    /// Interval between reminder polls
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// How long before an event booking reminders fire
    ///
    /// Out-of-range hour counts fall back to one day.
    #[must_use]
    pub fn lead(&self) -> chrono::Duration {
        chrono::Duration::try_hours(self.lead_hours).unwrap_or_else(|| chrono::Duration::days(1))
    }
}

impl FeedConfig {
    /// Interval between feed ticks
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}
