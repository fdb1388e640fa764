//! Session facade.
//!
//! [`TicketDesk`] owns the store for one session: it restores the ledger from
//! the snapshot store (or seeds the sample catalogue), sends commands through
//! the reducer, waits for their snapshot writes, and reports the outcome as a
//! `Result`.

use crate::config::Config;
use crate::error::{DeskError, LedgerError};
use crate::feed::NotificationFeed;
use crate::filter::{search, EventFilter};
use crate::ledger::{BookingRequest, Ledger};
use crate::pricing::{Quote, Selection};
use crate::reducer::{LedgerAction, LedgerEnvironment, LedgerReducer, LedgerState};
use crate::sample;
use crate::snapshot::SnapshotStore;
use crate::types::{
    Booking, BookingId, Event, EventId, EventStats, NewEvent, Notification, NotificationId,
    NotificationKind, OrganizerId, Reminder, ReminderId,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use ticketdesk_core::environment::Clock;
use ticketdesk_runtime::Store;
use tokio::sync::Mutex;

/// Store type driving a session
pub type LedgerStore = Store<LedgerState, LedgerAction, LedgerEnvironment, LedgerReducer>;

/// Where the session's initial ledger came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionOrigin {
    /// Loaded from the snapshot store
    Restored,
    /// Generated because nothing usable was stored
    Seeded,
}

/// One booking session
///
/// Commands are serialized: each one is reduced, its snapshot write awaited,
/// and its outcome read back before the next command starts. Background
/// reminder polling and the notification feed may interleave; they only add
/// notifications and never change command outcomes.
pub struct TicketDesk {
    store: LedgerStore,
    organizer: OrganizerId,
    clock: Arc<dyn Clock>,
    origin: SessionOrigin,
    commands: Mutex<()>,
}

impl TicketDesk {
    /// Opens a session
    ///
    /// A missing, unreadable, unsupported, or inconsistent snapshot is
    /// replaced by the sample catalogue, which is saved straight away.
    pub async fn open(
        config: &Config,
        clock: Arc<dyn Clock>,
        snapshots: Arc<dyn SnapshotStore>,
    ) -> Self {
        let (ledger, origin) = load_or_seed(config, clock.as_ref(), snapshots.as_ref()).await;
        let mut state = LedgerState::new(ledger);

        if origin == SessionOrigin::Seeded {
            if let Err(error) = snapshots.save(&state.ledger.to_snapshot()).await {
                tracing::warn!(%error, "Could not save seeded catalogue");
                state.last_snapshot_error = Some(error.to_string());
            }
        }

        let environment = LedgerEnvironment::new(Arc::clone(&clock), snapshots)
            .with_reminder_lead(config.reminders.lead())
            .with_poll_interval(config.reminders.poll_interval())
            .with_notification_feed(NotificationFeed::from_config(&config.feed));

        Self {
            store: Store::new(state, LedgerReducer::new(), environment),
            organizer: OrganizerId::new(config.session.organizer_id),
            clock,
            origin,
            commands: Mutex::new(()),
        }
    }

    /// Organizer the session acts for
    #[must_use]
    pub const fn organizer(&self) -> OrganizerId {
        self.organizer
    }

    /// How the session started
    #[must_use]
    pub const fn origin(&self) -> SessionOrigin {
        self.origin
    }

    /// Current time of the session clock
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// The underlying store
    #[must_use]
    pub const fn store(&self) -> &LedgerStore {
        &self.store
    }

    // ========== Commands ==========

    /// Publishes an event owned by the session organizer
    ///
    /// # Errors
    ///
    /// [`LedgerError::Validation`] for a rejected draft.
    pub async fn create_event(&self, mut draft: NewEvent) -> Result<Event, DeskError> {
        draft.organizer = self.organizer;
        let _serial = self.commands.lock().await;
        let id = EventId::new(self.next_ids().await.event + 1);
        self.execute(LedgerAction::CreateEvent { draft }, move |state| {
            state.ledger.event(id).cloned().ok_or(LedgerError::EventNotFound(id))
        })
        .await
    }

    /// Removes an event
    ///
    /// # Errors
    ///
    /// [`LedgerError::EventNotFound`] for an unknown id.
    pub async fn delete_event(&self, event_id: EventId) -> Result<(), DeskError> {
        let _serial = self.commands.lock().await;
        self.execute(LedgerAction::DeleteEvent { event_id }, |_| Ok(()))
            .await
    }

    /// Books tickets
    ///
    /// # Errors
    ///
    /// Validation, not-found, and inventory errors from the ledger.
    pub async fn book(&self, request: BookingRequest) -> Result<Booking, DeskError> {
        let _serial = self.commands.lock().await;
        let id = BookingId::new(self.next_ids().await.booking + 1);
        self.execute(LedgerAction::CommitBooking { request }, move |state| {
            state.ledger.booking(id).cloned().ok_or(LedgerError::BookingNotFound(id))
        })
        .await
    }

    /// Cancels a booking and returns its tickets to inventory
    ///
    /// # Errors
    ///
    /// [`LedgerError::BookingNotFound`] for an unknown id.
    pub async fn cancel_booking(&self, booking_id: BookingId) -> Result<(), DeskError> {
        let _serial = self.commands.lock().await;
        self.execute(LedgerAction::CancelBooking { booking_id }, |_| Ok(()))
            .await
    }

    /// Schedules a reminder
    ///
    /// # Errors
    ///
    /// [`LedgerError::EventNotFound`] or a validation error for a blank message.
    pub async fn add_reminder(
        &self,
        event_id: EventId,
        fire_at: DateTime<Utc>,
        message: impl Into<String>,
    ) -> Result<Reminder, DeskError> {
        let action = LedgerAction::AddReminder {
            event_id,
            fire_at,
            message: message.into(),
        };
        let _serial = self.commands.lock().await;
        let id = ReminderId::new(self.next_ids().await.reminder + 1);
        self.execute(action, move |state| {
            state.ledger.reminder(id).cloned().ok_or(LedgerError::ReminderNotFound(id))
        })
        .await
    }

    /// Deletes a reminder
    ///
    /// # Errors
    ///
    /// [`LedgerError::ReminderNotFound`] for an unknown id.
    pub async fn delete_reminder(&self, reminder_id: ReminderId) -> Result<(), DeskError> {
        let _serial = self.commands.lock().await;
        self.execute(LedgerAction::DeleteReminder { reminder_id }, |_| Ok(()))
            .await
    }

    /// Publishes a notification
    ///
    /// The id is read back from the reducer rather than predicted: feed and
    /// reminder ticks draw notification ids without the command lock.
    ///
    /// # Errors
    ///
    /// [`DeskError::Store`] once the session is shut down.
    pub async fn notify(
        &self,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<NotificationId, DeskError> {
        let action = LedgerAction::AddNotification {
            kind,
            title: title.into(),
            message: message.into(),
        };
        let _serial = self.commands.lock().await;
        self.execute(action, |state| {
            state
                .last_notification
                .ok_or_else(|| LedgerError::validation("notification was not recorded"))
        })
        .await
    }

    /// Empties the notification list
    ///
    /// # Errors
    ///
    /// [`DeskError::Store`] once the session is shut down.
    pub async fn clear_notifications(&self) -> Result<(), DeskError> {
        let _serial = self.commands.lock().await;
        self.execute(LedgerAction::ClearNotifications, |_| Ok(()))
            .await
    }

    /// Fires due reminders now; returns how many fired
    ///
    /// # Errors
    ///
    /// [`DeskError::Store`] once the session is shut down.
    pub async fn poll_reminders(&self) -> Result<usize, DeskError> {
        let _serial = self.commands.lock().await;
        let pending = |state: &LedgerState| {
            state.ledger.reminders().iter().filter(|r| !r.fired).count()
        };
        let before = self.store.state(pending).await;
        self.store.send(LedgerAction::PollReminders).await?.wait().await;
        let after = self.store.state(pending).await;
        Ok(before.saturating_sub(after))
    }

    /// Starts periodic reminder polling; a no-op while already running
    ///
    /// # Errors
    ///
    /// [`DeskError::Store`] once the session is shut down.
    pub async fn start_reminder_polling(&self) -> Result<(), DeskError> {
        self.store.send(LedgerAction::StartReminderPolling).await?;
        Ok(())
    }

    /// Stops periodic reminder polling
    ///
    /// # Errors
    ///
    /// [`DeskError::Store`] once the session is shut down.
    pub async fn stop_reminder_polling(&self) -> Result<(), DeskError> {
        self.store.send(LedgerAction::StopReminderPolling).await?;
        Ok(())
    }

    /// Starts the simulated notification feed; a no-op while already running
    ///
    /// # Errors
    ///
    /// [`DeskError::Store`] once the session is shut down.
    pub async fn start_notification_feed(&self) -> Result<(), DeskError> {
        self.store.send(LedgerAction::StartNotificationFeed).await?;
        Ok(())
    }

    /// Stops the notification feed
    ///
    /// # Errors
    ///
    /// [`DeskError::Store`] once the session is shut down.
    pub async fn stop_notification_feed(&self) -> Result<(), DeskError> {
        self.store.send(LedgerAction::StopNotificationFeed).await?;
        Ok(())
    }

    /// Stops accepting commands; pending reminder and feed ticks are dropped
    pub fn shutdown(&self) {
        self.store.shutdown();
    }

    // ========== Queries ==========

    /// Catalogue, newest first
    pub async fn events(&self) -> Vec<Event> {
        self.read(|ledger| ledger.events().to_vec()).await
    }

    /// Events matching `filter`
    pub async fn filter_events(&self, filter: &EventFilter) -> Vec<Event> {
        self.read(|ledger| filter.apply(ledger.events()).into_iter().cloned().collect())
            .await
    }

    /// Events whose title, category, or city contains `term`
    pub async fn search_events(&self, term: &str) -> Vec<Event> {
        self.read(|ledger| search(ledger.events(), term).into_iter().cloned().collect())
            .await
    }

    /// One event
    pub async fn event(&self, event_id: EventId) -> Option<Event> {
        self.read(|ledger| ledger.event(event_id).cloned()).await
    }

    /// Events owned by the session organizer
    pub async fn my_events(&self) -> Vec<Event> {
        let organizer = self.organizer;
        self.read(|ledger| {
            ledger
                .events_by_organizer(organizer)
                .into_iter()
                .cloned()
                .collect()
        })
        .await
    }

    /// Sales figures of an event
    ///
    /// # Errors
    ///
    /// [`LedgerError::EventNotFound`] for an unknown id.
    pub async fn stats(&self, event_id: EventId) -> Result<EventStats, DeskError> {
        Ok(self.read(|ledger| ledger.stats(event_id)).await?)
    }

    /// Prices a selection without booking it
    ///
    /// # Errors
    ///
    /// [`LedgerError::EventNotFound`], or pricing errors for the selection.
    pub async fn quote(&self, event_id: EventId, selection: &Selection) -> Result<Quote, DeskError> {
        Ok(self
            .read(|ledger| ledger.price_selection(event_id, selection))
            .await?)
    }

    /// All bookings, oldest first
    pub async fn bookings(&self) -> Vec<Booking> {
        self.read(|ledger| ledger.bookings().to_vec()).await
    }

    /// Bookings for one event
    pub async fn bookings_for_event(&self, event_id: EventId) -> Vec<Booking> {
        self.read(|ledger| {
            ledger
                .bookings_for_event(event_id)
                .into_iter()
                .cloned()
                .collect()
        })
        .await
    }

    /// All reminders
    pub async fn reminders(&self) -> Vec<Reminder> {
        self.read(|ledger| ledger.reminders().to_vec()).await
    }

    /// Notifications, newest first
    pub async fn notifications(&self) -> Vec<Notification> {
        self.read(|ledger| ledger.notifications().to_vec()).await
    }

    /// Number of notifications
    pub async fn notification_count(&self) -> usize {
        self.read(Ledger::notification_count).await
    }

    /// Copy of the whole ledger
    pub async fn ledger(&self) -> Ledger {
        self.read(Ledger::clone).await
    }

    /// Message of the last failed snapshot write, if any
    pub async fn last_snapshot_error(&self) -> Option<String> {
        self.store
            .state(|state| state.last_snapshot_error.clone())
            .await
    }

    /// Whether periodic reminder polling is running
    pub async fn is_polling_reminders(&self) -> bool {
        self.store
            .state(|state| state.reminder_polling.is_some())
            .await
    }

    /// Whether the notification feed is running
    pub async fn is_feed_running(&self) -> bool {
        self.store
            .state(|state| state.notification_feed.is_some())
            .await
    }

    async fn read<T>(&self, f: impl FnOnce(&Ledger) -> T) -> T {
        self.store.state(|state| f(&state.ledger)).await
    }

    async fn next_ids(&self) -> crate::ledger::Sequences {
        self.read(Ledger::sequences).await
    }

    /// Sends a command, waits for its effects, and reads back the outcome
    ///
    /// Callers hold the command lock so `last_error` belongs to this command.
    async fn execute<T>(
        &self,
        action: LedgerAction,
        outcome: impl FnOnce(&LedgerState) -> Result<T, LedgerError>,
    ) -> Result<T, DeskError> {
        self.store.send(action).await?.wait().await;
        self.store
            .state(|state| match &state.last_error {
                Some(error) => Err(DeskError::from(error.clone())),
                None => outcome(state).map_err(DeskError::from),
            })
            .await
    }
}

impl std::fmt::Debug for TicketDesk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketDesk")
            .field("organizer", &self.organizer)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

/// Restores the stored ledger, or generates the sample catalogue
async fn load_or_seed(
    config: &Config,
    clock: &dyn Clock,
    snapshots: &dyn SnapshotStore,
) -> (Ledger, SessionOrigin) {
    match snapshots.load().await {
        Ok(Some(snapshot)) => match Ledger::from_snapshot(snapshot) {
            Ok(ledger) => {
                tracing::info!(
                    events = ledger.events().len(),
                    bookings = ledger.bookings().len(),
                    revision = ledger.revision(),
                    "Restored session"
                );
                return (ledger, SessionOrigin::Restored);
            },
            Err(error) => tracing::warn!(%error, "Discarding stored snapshot"),
        },
        Ok(None) => tracing::info!("No stored session; seeding sample catalogue"),
        Err(error) => tracing::warn!(%error, "Could not load snapshot; seeding sample catalogue"),
    }

    let ledger = sample::sample_ledger(
        &mut sample::rng(config.sample.seed),
        config.sample.event_count,
        OrganizerId::new(config.session.organizer_id),
        clock.now(),
    );
    (ledger, SessionOrigin::Seeded)
}
