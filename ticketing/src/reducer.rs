//! Reducer for the session ledger.
//!
//! Commands are validated against the [`Ledger`] (its `plan_*` methods),
//! turned into events, and applied with [`LedgerReducer::apply_event`].
//! Every applied change returns a snapshot-save effect; reminder polling
//! and the notification feed reschedule themselves with delayed effects.

use crate::error::LedgerError;
use crate::feed::{NotificationFeed, FEED_MESSAGE, FEED_TITLE};
use crate::ledger::{BookingPlan, BookingRequest, FiredReminder, Ledger};
use crate::snapshot::SnapshotStore;
use crate::types::{
    BookingId, Event, EventId, NewEvent, Notification, NotificationId, NotificationKind, Reminder,
    ReminderId,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use ticketdesk_core::{
    async_effect, delay, effect::Effect, environment::Clock, reducer::Reducer, smallvec, SmallVec,
};
use ticketdesk_macros::Action;

/// Actions of the ledger reducer
#[derive(Action, Clone, Debug, PartialEq)]
pub enum LedgerAction {
    // ========== Commands ==========
    /// Publish a new event
    #[command]
    CreateEvent {
        /// Organizer input
        draft: NewEvent,
    },

    /// Remove an event (bookings and reminders stay)
    #[command]
    DeleteEvent {
        /// Event to remove
        event_id: EventId,
    },

    /// Sell tickets
    #[command]
    CommitBooking {
        /// Booking input
        request: BookingRequest,
    },

    /// Cancel a booking and release its tickets
    #[command]
    CancelBooking {
        /// Booking to cancel
        booking_id: BookingId,
    },

    /// Schedule a manual reminder
    #[command]
    AddReminder {
        /// Event the reminder is about
        event_id: EventId,
        /// When it becomes due
        fire_at: DateTime<Utc>,
        /// Notification text
        message: String,
    },

    /// Delete a reminder
    #[command]
    DeleteReminder {
        /// Reminder to delete
        reminder_id: ReminderId,
    },

    /// Fire due reminders once
    #[command]
    PollReminders,

    /// Start the periodic reminder poll
    #[command]
    StartReminderPolling,

    /// Stop the periodic reminder poll
    #[command]
    StopReminderPolling,

    /// One periodic poll; ignored unless `generation` is the active loop
    #[command]
    ReminderTick {
        /// Loop that scheduled this tick
        generation: u64,
    },

    /// Publish a notification
    #[command]
    AddNotification {
        /// Severity
        kind: NotificationKind,
        /// Short title
        title: String,
        /// Body
        message: String,
    },

    /// Empty the notification list
    #[command]
    ClearNotifications,

    /// Start the simulated notification feed
    #[command]
    StartNotificationFeed,

    /// Stop the simulated notification feed
    #[command]
    StopNotificationFeed,

    /// One feed roll; ignored unless `generation` is the active feed
    #[command]
    NotificationFeedTick {
        /// Feed that scheduled this tick
        generation: u64,
    },

    // ========== Events ==========
    /// An event was published
    #[event]
    EventCreated {
        /// The new event
        event: Event,
    },

    /// An event was removed
    #[event]
    EventDeleted {
        /// Removed event
        event_id: EventId,
    },

    /// Tickets were sold
    #[event]
    BookingCommitted {
        /// Booking, reminder and confirmation
        plan: BookingPlan,
    },

    /// A booking was cancelled
    #[event]
    BookingCancelled {
        /// Cancelled booking
        booking_id: BookingId,
    },

    /// A reminder was scheduled
    #[event]
    ReminderAdded {
        /// The new reminder
        reminder: Reminder,
    },

    /// A reminder was deleted
    #[event]
    ReminderDeleted {
        /// Deleted reminder
        reminder_id: ReminderId,
    },

    /// Due reminders fired
    #[event]
    RemindersFired {
        /// Reminders and their notifications
        fired: Vec<FiredReminder>,
    },

    /// A notification was published
    #[event]
    NotificationAdded {
        /// The notification
        notification: Notification,
    },

    /// The notification list was emptied
    #[event]
    NotificationsCleared,

    /// Periodic polling started
    #[event]
    ReminderPollingStarted {
        /// Identifies this polling loop
        generation: u64,
    },

    /// Periodic polling stopped
    #[event]
    ReminderPollingStopped,

    /// The feed published a notification
    #[event]
    FeedNotificationPublished {
        /// The notification
        notification: Notification,
    },

    /// The notification feed started
    #[event]
    NotificationFeedStarted {
        /// Identifies this feed loop
        generation: u64,
    },

    /// The notification feed stopped
    #[event]
    NotificationFeedStopped,

    /// A command was rejected
    #[event]
    ValidationFailed {
        /// Why
        error: LedgerError,
    },

    /// Writing the snapshot failed
    #[event]
    SnapshotFailed {
        /// Error message
        error: String,
    },
}

/// State owned by the store
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LedgerState {
    /// The session ledger
    pub ledger: Ledger,
    /// Error of the last rejected command, cleared by the next accepted one
    pub last_error: Option<LedgerError>,
    /// Error of the last failed snapshot write
    pub last_snapshot_error: Option<String>,
    /// Generation of the running poll loop, if any
    pub reminder_polling: Option<u64>,
    /// Last generation handed out
    pub poll_generation: u64,
    /// Generation of the running notification feed, if any
    pub notification_feed: Option<u64>,
    /// Last feed generation handed out
    pub feed_generation: u64,
    /// Notification created by the last `AddNotification`
    pub last_notification: Option<NotificationId>,
}

impl LedgerState {
    /// State wrapping `ledger`
    #[must_use]
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger,
            ..Self::default()
        }
    }
}

/// Environment dependencies for the ledger reducer
#[derive(Clone)]
pub struct LedgerEnvironment {
    /// Clock for timestamps and reminder due checks
    pub clock: Arc<dyn Clock>,
    /// Where snapshots are written
    pub snapshots: Arc<dyn SnapshotStore>,
    /// How long before an event booking reminders fire
    pub reminder_lead: chrono::Duration,
    /// Interval of the periodic reminder poll
    pub poll_interval: Duration,
    /// Interval and odds of the notification feed
    pub feed: NotificationFeed,
}

impl LedgerEnvironment {
    /// Environment with a one-day reminder lead, a one-minute poll and the
    /// default feed
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, snapshots: Arc<dyn SnapshotStore>) -> Self {
        Self {
            clock,
            snapshots,
            reminder_lead: chrono::Duration::days(1),
            poll_interval: Duration::from_secs(60),
            feed: NotificationFeed::default(),
        }
    }

    /// Override the reminder lead time
    #[must_use]
    pub fn with_reminder_lead(mut self, lead: chrono::Duration) -> Self {
        self.reminder_lead = lead;
        self
    }

    /// Override the poll interval
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Override the notification feed
    #[must_use]
    pub fn with_notification_feed(mut self, feed: NotificationFeed) -> Self {
        self.feed = feed;
        self
    }
}

impl std::fmt::Debug for LedgerEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerEnvironment")
            .field("reminder_lead", &self.reminder_lead)
            .field("poll_interval", &self.poll_interval)
            .field("feed", &self.feed)
            .finish_non_exhaustive()
    }
}

/// Reducer for the session ledger
#[derive(Clone, Copy, Debug, Default)]
pub struct LedgerReducer;

type Effects = SmallVec<[Effect<LedgerAction>; 4]>;

impl LedgerReducer {
    /// Creates a new `LedgerReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Records a rejection; no effects
    fn reject(state: &mut LedgerState, error: LedgerError) -> Effects {
        tracing::warn!(%error, "Ledger command rejected");
        Self::apply_event(state, &LedgerAction::ValidationFailed { error });
        SmallVec::new()
    }

    /// Applies an event and saves the resulting snapshot
    fn accept(state: &mut LedgerState, env: &LedgerEnvironment, event: &LedgerAction) -> Effects {
        Self::apply_event(state, event);
        smallvec![Self::persist(state, env)]
    }

    /// Effect writing the current ledger to the snapshot store
    fn persist(state: &LedgerState, env: &LedgerEnvironment) -> Effect<LedgerAction> {
        let snapshot = state.ledger.to_snapshot();
        let snapshots = Arc::clone(&env.snapshots);
        async_effect! {
            match snapshots.save(&snapshot).await {
                Ok(()) => None,
                Err(error) => Some(LedgerAction::SnapshotFailed {
                    error: error.to_string(),
                }),
            }
        }
    }

    /// Fires due reminders; returns the persist effect if any fired
    fn poll(state: &mut LedgerState, env: &LedgerEnvironment) -> Option<Effect<LedgerAction>> {
        let fired = state.ledger.plan_due_reminders(env.clock.now());
        if fired.is_empty() {
            return None;
        }
        tracing::info!(count = fired.len(), "Reminders fired");
        metrics::counter!("ledger.reminders.fired").increment(fired.len() as u64);
        Self::apply_event(state, &LedgerAction::RemindersFired { fired });
        Some(Self::persist(state, env))
    }

    /// Rolls the feed; returns the persist effect on a hit
    fn publish_feed(
        state: &mut LedgerState,
        env: &LedgerEnvironment,
    ) -> Option<Effect<LedgerAction>> {
        if !env.feed.roll() {
            return None;
        }
        let notification = state.ledger.plan_notification(
            NotificationKind::Info,
            FEED_TITLE,
            FEED_MESSAGE,
            env.clock.now(),
        );
        tracing::debug!(notification_id = %notification.id, "Feed notification published");
        Self::apply_event(state, &LedgerAction::FeedNotificationPublished { notification });
        Some(Self::persist(state, env))
    }

    /// Applies an event to state
    ///
    /// Events describing accepted commands clear `last_error`. Reminder
    /// firing, feed notifications and snapshot failures come from background
    /// work and leave it alone.
    pub fn apply_event(state: &mut LedgerState, action: &LedgerAction) {
        match action {
            LedgerAction::EventCreated { event } => {
                state.ledger.record_event(event.clone());
                state.last_error = None;
            },
            LedgerAction::EventDeleted { event_id } => {
                state.ledger.record_event_deleted(*event_id);
                state.last_error = None;
            },
            LedgerAction::BookingCommitted { plan } => {
                state.ledger.record_booking(plan.clone());
                state.last_error = None;
            },
            LedgerAction::BookingCancelled { booking_id } => {
                state.ledger.record_booking_cancelled(*booking_id);
                state.last_error = None;
            },
            LedgerAction::ReminderAdded { reminder } => {
                state.ledger.record_reminder(reminder.clone());
                state.last_error = None;
            },
            LedgerAction::ReminderDeleted { reminder_id } => {
                state.ledger.record_reminder_deleted(*reminder_id);
                state.last_error = None;
            },
            LedgerAction::RemindersFired { fired } => {
                state.ledger.record_reminders_fired(fired.clone());
            },
            LedgerAction::NotificationAdded { notification } => {
                state.last_notification = Some(notification.id);
                state.ledger.record_notification(notification.clone());
                state.last_error = None;
            },
            LedgerAction::NotificationsCleared => {
                state.ledger.record_notifications_cleared();
                state.last_error = None;
            },
            LedgerAction::ReminderPollingStarted { generation } => {
                state.reminder_polling = Some(*generation);
                state.poll_generation = state.poll_generation.max(*generation);
            },
            LedgerAction::ReminderPollingStopped => {
                state.reminder_polling = None;
            },
            LedgerAction::FeedNotificationPublished { notification } => {
                state.ledger.record_notification(notification.clone());
            },
            LedgerAction::NotificationFeedStarted { generation } => {
                state.notification_feed = Some(*generation);
                state.feed_generation = state.feed_generation.max(*generation);
            },
            LedgerAction::NotificationFeedStopped => {
                state.notification_feed = None;
            },
            LedgerAction::ValidationFailed { error } => {
                state.last_error = Some(error.clone());
            },
            LedgerAction::SnapshotFailed { error } => {
                state.last_snapshot_error = Some(error.clone());
            },
            // Commands are not applied to state
            LedgerAction::CreateEvent { .. }
            | LedgerAction::DeleteEvent { .. }
            | LedgerAction::CommitBooking { .. }
            | LedgerAction::CancelBooking { .. }
            | LedgerAction::AddReminder { .. }
            | LedgerAction::DeleteReminder { .. }
            | LedgerAction::PollReminders
            | LedgerAction::StartReminderPolling
            | LedgerAction::StopReminderPolling
            | LedgerAction::ReminderTick { .. }
            | LedgerAction::AddNotification { .. }
            | LedgerAction::ClearNotifications
            | LedgerAction::StartNotificationFeed
            | LedgerAction::StopNotificationFeed
            | LedgerAction::NotificationFeedTick { .. } => {},
        }
    }
}

impl Reducer for LedgerReducer {
    type State = LedgerState;
    type Action = LedgerAction;
    type Environment = LedgerEnvironment;

    #[allow(clippy::too_many_lines)] // one arm per action
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        tracing::trace!(action = action.name(), "Reducing ledger action");

        match action {
            // ========== Commands ==========
            LedgerAction::CreateEvent { draft } => match state.ledger.plan_event(draft) {
                Ok(event) => {
                    tracing::info!(event_id = %event.id, title = %event.title, "Event created");
                    Self::accept(state, env, &LedgerAction::EventCreated { event })
                },
                Err(error) => Self::reject(state, error),
            },

            LedgerAction::DeleteEvent { event_id } => {
                if state.ledger.event(event_id).is_none() {
                    return Self::reject(state, LedgerError::EventNotFound(event_id));
                }
                tracing::info!(%event_id, "Event deleted");
                Self::accept(state, env, &LedgerAction::EventDeleted { event_id })
            },

            LedgerAction::CommitBooking { request } => {
                match state
                    .ledger
                    .plan_booking(&request, env.clock.now(), env.reminder_lead)
                {
                    Ok(plan) => {
                        let tickets = plan.booking.ticket_count();
                        tracing::info!(
                            booking_id = %plan.booking.id,
                            event_id = %plan.booking.event_id,
                            tickets,
                            total = %plan.booking.total,
                            "Booking committed"
                        );
                        metrics::counter!("ledger.bookings.committed").increment(1);
                        metrics::counter!("ledger.tickets.sold").increment(tickets);
                        Self::accept(state, env, &LedgerAction::BookingCommitted { plan })
                    },
                    Err(error) => Self::reject(state, error),
                }
            },

            LedgerAction::CancelBooking { booking_id } => {
                if state.ledger.booking(booking_id).is_none() {
                    return Self::reject(state, LedgerError::BookingNotFound(booking_id));
                }
                tracing::info!(%booking_id, "Booking cancelled");
                metrics::counter!("ledger.bookings.cancelled").increment(1);
                Self::accept(state, env, &LedgerAction::BookingCancelled { booking_id })
            },

            LedgerAction::AddReminder {
                event_id,
                fire_at,
                message,
            } => match state.ledger.plan_reminder(event_id, fire_at, &message) {
                Ok(reminder) => {
                    tracing::debug!(reminder_id = %reminder.id, %fire_at, "Reminder scheduled");
                    Self::accept(state, env, &LedgerAction::ReminderAdded { reminder })
                },
                Err(error) => Self::reject(state, error),
            },

            LedgerAction::DeleteReminder { reminder_id } => {
                if state.ledger.reminder(reminder_id).is_none() {
                    return Self::reject(state, LedgerError::ReminderNotFound(reminder_id));
                }
                Self::accept(state, env, &LedgerAction::ReminderDeleted { reminder_id })
            },

            LedgerAction::PollReminders => Self::poll(state, env).into_iter().collect(),

            LedgerAction::StartReminderPolling => {
                if state.reminder_polling.is_some() {
                    return SmallVec::new();
                }
                let generation = state.poll_generation + 1;
                tracing::debug!(generation, interval = ?env.poll_interval, "Reminder polling started");
                Self::apply_event(state, &LedgerAction::ReminderPollingStarted { generation });
                smallvec![delay! {
                    duration: env.poll_interval,
                    action: LedgerAction::ReminderTick { generation }
                }]
            },

            LedgerAction::StopReminderPolling => {
                if state.reminder_polling.is_some() {
                    tracing::debug!("Reminder polling stopped");
                    Self::apply_event(state, &LedgerAction::ReminderPollingStopped);
                }
                SmallVec::new()
            },

            LedgerAction::ReminderTick { generation } => {
                if state.reminder_polling != Some(generation) {
                    tracing::trace!(generation, "Dropping tick of a stopped poll loop");
                    return SmallVec::new();
                }
                let mut effects: Effects = Self::poll(state, env).into_iter().collect();
                effects.push(delay! {
                    duration: env.poll_interval,
                    action: LedgerAction::ReminderTick { generation }
                });
                effects
            },

            LedgerAction::AddNotification {
                kind,
                title,
                message,
            } => {
                let notification =
                    state
                        .ledger
                        .plan_notification(kind, title, message, env.clock.now());
                Self::accept(state, env, &LedgerAction::NotificationAdded { notification })
            },

            LedgerAction::ClearNotifications => {
                Self::accept(state, env, &LedgerAction::NotificationsCleared)
            },

            LedgerAction::StartNotificationFeed => {
                if state.notification_feed.is_some() {
                    return SmallVec::new();
                }
                let generation = state.feed_generation + 1;
                tracing::debug!(
                    generation,
                    interval = ?env.feed.interval(),
                    chance_percent = env.feed.chance_percent(),
                    "Notification feed started"
                );
                Self::apply_event(state, &LedgerAction::NotificationFeedStarted { generation });
                smallvec![delay! {
                    duration: env.feed.interval(),
                    action: LedgerAction::NotificationFeedTick { generation }
                }]
            },

            LedgerAction::StopNotificationFeed => {
                if state.notification_feed.is_some() {
                    tracing::debug!("Notification feed stopped");
                    Self::apply_event(state, &LedgerAction::NotificationFeedStopped);
                }
                SmallVec::new()
            },

            LedgerAction::NotificationFeedTick { generation } => {
                if state.notification_feed != Some(generation) {
                    tracing::trace!(generation, "Dropping tick of a stopped feed");
                    return SmallVec::new();
                }
                let mut effects: Effects = Self::publish_feed(state, env).into_iter().collect();
                effects.push(delay! {
                    duration: env.feed.interval(),
                    action: LedgerAction::NotificationFeedTick { generation }
                });
                effects
            },

            // ========== Events ==========
            LedgerAction::EventCreated { .. }
            | LedgerAction::EventDeleted { .. }
            | LedgerAction::BookingCommitted { .. }
            | LedgerAction::BookingCancelled { .. }
            | LedgerAction::ReminderAdded { .. }
            | LedgerAction::ReminderDeleted { .. }
            | LedgerAction::RemindersFired { .. }
            | LedgerAction::NotificationAdded { .. }
            | LedgerAction::NotificationsCleared
            | LedgerAction::ReminderPollingStarted { .. }
            | LedgerAction::ReminderPollingStopped
            | LedgerAction::FeedNotificationPublished { .. }
            | LedgerAction::NotificationFeedStarted { .. }
            | LedgerAction::NotificationFeedStopped
            | LedgerAction::ValidationFailed { .. } => {
                Self::apply_event(state, &action);
                SmallVec::new()
            },

            LedgerAction::SnapshotFailed { error } => {
                tracing::warn!(%error, "Snapshot write failed; session continues in memory");
                Self::apply_event(state, &LedgerAction::SnapshotFailed { error });
                SmallVec::new()
            },
        }
    }
}
