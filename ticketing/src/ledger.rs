//! The session ledger.
//!
//! [`Ledger`] owns every collection of a session (events, bookings,
//! reminders, notifications) and the sequences that number them.
//!
//! Each mutation comes in two halves:
//!
//! - a `plan_*` method that validates input against the current state and
//!   returns the complete change (new ids included) without touching
//!   anything, and
//! - a `record_*` method that applies a planned change and cannot fail.
//!
//! The reducer validates with the first half and applies events with the
//! second. Callers without a store use the combined methods
//! ([`Ledger::commit_booking`], [`Ledger::cancel_booking`], ...), which plan
//! and record in one step. A rejected operation never changes the ledger.

use crate::error::{LedgerError, Result};
use crate::pricing::{self, Quote, Selection};
use crate::snapshot::{Snapshot, SnapshotError, SCHEMA_VERSION};
use crate::types::{
    Booking, BookingId, BookingStatus, Contact, Event, EventId, EventStats, LineItem, Money,
    NewEvent, Notification, NotificationId, NotificationKind, OrganizerId, Reminder, ReminderId,
    TicketTier,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Lead time of reminders scheduled by bookings
pub const DEFAULT_REMINDER_LEAD_HOURS: i64 = 24;

/// Last id issued per collection
///
/// Ids are never reused, even after deletions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequences {
    /// Last event id
    pub event: u64,
    /// Last booking id
    pub booking: u64,
    /// Last reminder id
    pub reminder: u64,
    /// Last notification id
    pub notification: u64,
}

/// Input of [`Ledger::commit_booking`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    /// Event to book
    pub event_id: EventId,
    /// Quantity per tier index
    pub selection: Selection,
    /// Purchaser
    pub contact: Contact,
    /// Schedule a reminder before the event starts
    pub with_reminder: bool,
}

impl BookingRequest {
    /// Request without a reminder
    #[must_use]
    pub const fn new(event_id: EventId, selection: Selection, contact: Contact) -> Self {
        Self {
            event_id,
            selection,
            contact,
            with_reminder: false,
        }
    }

    /// Ask for a reminder before the event starts
    #[must_use]
    pub const fn with_reminder(mut self) -> Self {
        self.with_reminder = true;
        self
    }
}

/// A validated booking, ready to record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingPlan {
    /// The booking to append
    pub booking: Booking,
    /// Reminder to schedule, if requested
    pub reminder: Option<Reminder>,
    /// Confirmation notification
    pub notification: Notification,
}

/// One reminder that came due and the notification it produces
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiredReminder {
    /// Reminder to mark as fired
    pub reminder_id: ReminderId,
    /// Notification to publish
    pub notification: Notification,
}

/// All state of one session
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ledger {
    events: Vec<Event>,
    bookings: Vec<Booking>,
    reminders: Vec<Reminder>,
    notifications: Vec<Notification>,
    sequences: Sequences,
    revision: u64,
}

impl Ledger {
    /// Empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Catalogue, newest first
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Event by id
    #[must_use]
    pub fn event(&self, id: EventId) -> Option<&Event> {
        self.events.iter().find(|event| event.id == id)
    }

    /// Bookings in commit order
    #[must_use]
    pub fn bookings(&self) -> &[Booking] {
        &self.bookings
    }

    /// Booking by id
    #[must_use]
    pub fn booking(&self, id: BookingId) -> Option<&Booking> {
        self.bookings.iter().find(|booking| booking.id == id)
    }

    /// Bookings for one event
    #[must_use]
    pub fn bookings_for_event(&self, event_id: EventId) -> Vec<&Booking> {
        self.bookings
            .iter()
            .filter(|booking| booking.event_id == event_id)
            .collect()
    }

    /// Reminders in scheduling order
    #[must_use]
    pub fn reminders(&self) -> &[Reminder] {
        &self.reminders
    }

    /// Reminder by id
    #[must_use]
    pub fn reminder(&self, id: ReminderId) -> Option<&Reminder> {
        self.reminders.iter().find(|reminder| reminder.id == id)
    }

    /// Notifications, newest first
    #[must_use]
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Badge count shown next to the notification bell
    #[must_use]
    pub fn notification_count(&self) -> usize {
        self.notifications.len()
    }

    /// Last issued ids
    #[must_use]
    pub const fn sequences(&self) -> Sequences {
        self.sequences
    }

    /// Number of changes recorded; orders snapshots of the same session
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Events created by `organizer`, in catalogue order
    #[must_use]
    pub fn events_by_organizer(&self, organizer: OrganizerId) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|event| event.organizer == organizer)
            .collect()
    }

    /// Dashboard figures for one event
    ///
    /// # Errors
    ///
    /// [`LedgerError::EventNotFound`] for an unknown id, [`LedgerError::Overflow`]
    /// if revenue does not fit.
    pub fn stats(&self, event_id: EventId) -> Result<EventStats> {
        let event = self
            .event(event_id)
            .ok_or(LedgerError::EventNotFound(event_id))?;
        Ok(EventStats {
            tickets_sold: event.tickets_sold(),
            revenue: event.revenue().ok_or(LedgerError::Overflow)?,
            attendees: event.attendees,
        })
    }

    /// Prices a selection for an event without changing anything
    ///
    /// # Errors
    ///
    /// [`LedgerError::EventNotFound`], or any error of [`pricing::quote`].
    pub fn price_selection(&self, event_id: EventId, selection: &Selection) -> Result<Quote> {
        let event = self
            .event(event_id)
            .ok_or(LedgerError::EventNotFound(event_id))?;
        pricing::quote(event, selection)
    }

    // ------------------------------------------------------------------
    // Planning: validate and build changes
    // ------------------------------------------------------------------

    /// Validates a draft and builds the event it would create
    ///
    /// The headline price is the first tier's price; nothing is sold yet.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Validation`] describing the first invalid field.
    pub fn plan_event(&self, draft: NewEvent) -> Result<Event> {
        validate_draft(&draft)?;

        let price = draft.tiers.first().map_or(Money::ZERO, |tier| tier.price);
        let tiers = draft
            .tiers
            .into_iter()
            .map(|tier| TicketTier::new(tier.ticket_type.trim(), tier.price, tier.quantity))
            .collect();

        Ok(Event {
            id: EventId::new(self.sequences.event + 1),
            title: draft.title.trim().to_string(),
            category: draft.category,
            description: draft.description,
            starts_at: draft.starts_at,
            ends_at: draft.ends_at,
            venue: draft.venue,
            price,
            tiers,
            vendors: draft.vendors,
            group_booking: draft.group_booking,
            organizer: draft.organizer,
            attendees: 0,
        })
    }

    /// Validates a booking request against current inventory
    ///
    /// Checks run in this order: non-empty selection, contact details, event
    /// existence, tier indices and amounts, then inventory for every tier.
    /// Nothing is changed.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Validation`] for an empty selection or bad contact
    /// - [`LedgerError::EventNotFound`] for an unknown event
    /// - [`LedgerError::InsufficientInventory`] when any tier is short
    /// - [`LedgerError::Overflow`] when an amount does not fit
    pub fn plan_booking(
        &self,
        request: &BookingRequest,
        now: DateTime<Utc>,
        reminder_lead: Duration,
    ) -> Result<BookingPlan> {
        if request.selection.is_empty() {
            return Err(LedgerError::validation("select at least one ticket"));
        }
        validate_contact(&request.contact)?;

        let event = self
            .event(request.event_id)
            .ok_or(LedgerError::EventNotFound(request.event_id))?;
        let quote = pricing::quote(event, &request.selection)?;

        let mut line_items = Vec::new();
        for (tier_index, quantity) in request.selection.iter() {
            let tier = event.tiers.get(tier_index).ok_or_else(|| {
                LedgerError::validation(format!("event {} has no ticket tier {tier_index}", event.id))
            })?;
            if quantity > tier.remaining() {
                return Err(LedgerError::InsufficientInventory {
                    tier: tier.ticket_type.clone(),
                    requested: quantity,
                    available: tier.remaining(),
                });
            }
            line_items.push(LineItem {
                tier_index,
                ticket_type: tier.ticket_type.clone(),
                quantity,
                unit_price: tier.price,
            });
        }

        let booking = Booking {
            id: BookingId::new(self.sequences.booking + 1),
            event_id: event.id,
            event_title: event.title.clone(),
            contact: normalized_contact(&request.contact),
            line_items,
            subtotal: quote.subtotal,
            discount: quote.discount,
            total: quote.total,
            booked_at: now,
            status: BookingStatus::Confirmed,
        };

        let reminder = request.with_reminder.then(|| Reminder {
            id: ReminderId::new(self.sequences.reminder + 1),
            event_id: event.id,
            event_title: event.title.clone(),
            booking_id: Some(booking.id),
            fire_at: event
                .starts_at
                .checked_sub_signed(reminder_lead)
                .unwrap_or(event.starts_at),
            message: format!("Don't forget! Your event \"{}\" starts tomorrow.", event.title),
            fired: false,
        });

        let notification = self.plan_notification(
            NotificationKind::Success,
            "Booking Confirmed",
            format!("Your tickets for {} have been booked successfully!", event.title),
            now,
        );

        Ok(BookingPlan {
            booking,
            reminder,
            notification,
        })
    }

    /// Validates and builds a manual reminder
    ///
    /// # Errors
    ///
    /// [`LedgerError::EventNotFound`] for an unknown event,
    /// [`LedgerError::Validation`] for a blank message.
    pub fn plan_reminder(
        &self,
        event_id: EventId,
        fire_at: DateTime<Utc>,
        message: &str,
    ) -> Result<Reminder> {
        let event = self
            .event(event_id)
            .ok_or(LedgerError::EventNotFound(event_id))?;
        if message.trim().is_empty() {
            return Err(LedgerError::validation("reminder message is required"));
        }
        Ok(Reminder {
            id: ReminderId::new(self.sequences.reminder + 1),
            event_id,
            event_title: event.title.clone(),
            booking_id: None,
            fire_at,
            message: message.trim().to_string(),
            fired: false,
        })
    }

    /// Unfired reminders due at `now`, each paired with its notification
    ///
    /// Notification ids continue the sequence in reminder order.
    #[must_use]
    pub fn plan_due_reminders(&self, now: DateTime<Utc>) -> Vec<FiredReminder> {
        self.reminders
            .iter()
            .filter(|reminder| reminder.is_due(now))
            .zip(self.sequences.notification + 1..)
            .map(|(reminder, id)| FiredReminder {
                reminder_id: reminder.id,
                notification: Notification {
                    id: NotificationId::new(id),
                    kind: NotificationKind::Info,
                    title: "Event Reminder".to_string(),
                    message: reminder.message.clone(),
                    created_at: now,
                },
            })
            .collect()
    }

    /// Builds the next notification
    #[must_use]
    pub fn plan_notification(
        &self,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Notification {
        Notification {
            id: NotificationId::new(self.sequences.notification + 1),
            kind,
            title: title.into(),
            message: message.into(),
            created_at: now,
        }
    }

    // ------------------------------------------------------------------
    // Recording: apply planned changes
    // ------------------------------------------------------------------

    /// Puts a planned event at the front of the catalogue
    pub(crate) fn record_event(&mut self, event: Event) {
        self.sequences.event = self.sequences.event.max(event.id.value());
        self.events.insert(0, event);
        self.revision += 1;
    }

    /// Removes an event; bookings and reminders stay
    pub(crate) fn record_event_deleted(&mut self, id: EventId) -> Option<Event> {
        let index = self.events.iter().position(|event| event.id == id)?;
        self.revision += 1;
        Some(self.events.remove(index))
    }

    /// Applies a planned booking: sells the tickets and appends the booking
    pub(crate) fn record_booking(&mut self, plan: BookingPlan) {
        let BookingPlan {
            booking,
            reminder,
            notification,
        } = plan;

        if let Some(event) = self.events.iter_mut().find(|event| event.id == booking.event_id) {
            for item in &booking.line_items {
                if let Some(tier) = event.tiers.get_mut(item.tier_index) {
                    tier.sold = tier.sold.saturating_add(item.quantity).min(tier.quantity);
                }
            }
        }

        self.sequences.booking = self.sequences.booking.max(booking.id.value());
        self.bookings.push(booking);
        if let Some(reminder) = reminder {
            self.push_reminder(reminder);
        }
        self.push_notification(notification);
        self.revision += 1;
    }

    /// Removes a booking, returns its tickets to inventory and drops the
    /// reminders it scheduled
    pub(crate) fn record_booking_cancelled(&mut self, id: BookingId) -> Option<Booking> {
        let index = self.bookings.iter().position(|booking| booking.id == id)?;
        let booking = self.bookings.remove(index);

        if let Some(event) = self.events.iter_mut().find(|event| event.id == booking.event_id) {
            for item in &booking.line_items {
                if let Some(tier) = event.tiers.get_mut(item.tier_index) {
                    tier.sold = tier.sold.saturating_sub(item.quantity);
                }
            }
        }
        self.reminders.retain(|reminder| reminder.booking_id != Some(id));
        self.revision += 1;
        Some(booking)
    }

    /// Appends a planned reminder
    pub(crate) fn record_reminder(&mut self, reminder: Reminder) {
        self.push_reminder(reminder);
        self.revision += 1;
    }

    /// Removes a reminder
    pub(crate) fn record_reminder_deleted(&mut self, id: ReminderId) -> Option<Reminder> {
        let index = self.reminders.iter().position(|reminder| reminder.id == id)?;
        self.revision += 1;
        Some(self.reminders.remove(index))
    }

    /// Marks reminders fired and publishes their notifications
    pub(crate) fn record_reminders_fired(&mut self, fired: Vec<FiredReminder>) {
        if fired.is_empty() {
            return;
        }
        for FiredReminder {
            reminder_id,
            notification,
        } in fired
        {
            if let Some(reminder) = self.reminders.iter_mut().find(|r| r.id == reminder_id) {
                reminder.fired = true;
            }
            self.push_notification(notification);
        }
        self.revision += 1;
    }

    /// Publishes a planned notification
    pub(crate) fn record_notification(&mut self, notification: Notification) {
        self.push_notification(notification);
        self.revision += 1;
    }

    /// Empties the notification list
    pub(crate) fn record_notifications_cleared(&mut self) {
        self.notifications.clear();
        self.revision += 1;
    }

    fn push_reminder(&mut self, reminder: Reminder) {
        self.sequences.reminder = self.sequences.reminder.max(reminder.id.value());
        self.reminders.push(reminder);
    }

    fn push_notification(&mut self, notification: Notification) {
        self.sequences.notification = self.sequences.notification.max(notification.id.value());
        self.notifications.insert(0, notification);
    }

    // ------------------------------------------------------------------
    // Operations: plan and record in one step
    // ------------------------------------------------------------------

    /// Publishes a new event at the front of the catalogue
    ///
    /// # Errors
    ///
    /// See [`Ledger::plan_event`].
    pub fn create_event(&mut self, draft: NewEvent) -> Result<EventId> {
        let event = self.plan_event(draft)?;
        let id = event.id;
        self.record_event(event);
        Ok(id)
    }

    /// Removes an event; its bookings and reminders are kept
    ///
    /// # Errors
    ///
    /// [`LedgerError::EventNotFound`] for an unknown id.
    pub fn delete_event(&mut self, id: EventId) -> Result<Event> {
        self.record_event_deleted(id)
            .ok_or(LedgerError::EventNotFound(id))
    }

    /// Sells the requested tickets and records the booking
    ///
    /// Either every tier is updated or none is.
    ///
    /// # Errors
    ///
    /// See [`Ledger::plan_booking`].
    pub fn commit_booking(
        &mut self,
        request: &BookingRequest,
        now: DateTime<Utc>,
        reminder_lead: Duration,
    ) -> Result<Booking> {
        let plan = self.plan_booking(request, now, reminder_lead)?;
        let booking = plan.booking.clone();
        self.record_booking(plan);
        Ok(booking)
    }

    /// Cancels a booking and releases its tickets
    ///
    /// # Errors
    ///
    /// [`LedgerError::BookingNotFound`] for an unknown id.
    pub fn cancel_booking(&mut self, id: BookingId) -> Result<Booking> {
        self.record_booking_cancelled(id)
            .ok_or(LedgerError::BookingNotFound(id))
    }

    /// Schedules a manual reminder
    ///
    /// # Errors
    ///
    /// See [`Ledger::plan_reminder`].
    pub fn add_reminder(
        &mut self,
        event_id: EventId,
        fire_at: DateTime<Utc>,
        message: &str,
    ) -> Result<ReminderId> {
        let reminder = self.plan_reminder(event_id, fire_at, message)?;
        let id = reminder.id;
        self.record_reminder(reminder);
        Ok(id)
    }

    /// Deletes a reminder
    ///
    /// # Errors
    ///
    /// [`LedgerError::ReminderNotFound`] for an unknown id.
    pub fn delete_reminder(&mut self, id: ReminderId) -> Result<Reminder> {
        self.record_reminder_deleted(id)
            .ok_or(LedgerError::ReminderNotFound(id))
    }

    /// Fires every due reminder exactly once
    ///
    /// Returns the notifications produced, oldest reminder first. A later
    /// poll never repeats a reminder.
    pub fn fire_due_reminders(&mut self, now: DateTime<Utc>) -> Vec<Notification> {
        let fired = self.plan_due_reminders(now);
        let notifications = fired.iter().map(|f| f.notification.clone()).collect();
        self.record_reminders_fired(fired);
        notifications
    }

    /// Publishes a notification
    pub fn add_notification(
        &mut self,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> NotificationId {
        let notification = self.plan_notification(kind, title, message, now);
        let id = notification.id;
        self.record_notification(notification);
        id
    }

    /// Empties the notification list
    pub fn clear_notifications(&mut self) {
        self.record_notifications_cleared();
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    /// Full copy of the session as a snapshot document
    #[must_use]
    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            schema_version: SCHEMA_VERSION,
            revision: self.revision,
            sequences: self.sequences,
            events: self.events.clone(),
            bookings: self.bookings.clone(),
            reminders: self.reminders.clone(),
            notifications: self.notifications.clone(),
        }
    }

    /// Rebuilds a ledger from a snapshot
    ///
    /// Sequences are raised to at least the largest id present, so restored
    /// documents that lost their counters never reissue an id.
    ///
    /// # Errors
    ///
    /// [`SnapshotError::UnsupportedVersion`] for another schema version,
    /// [`SnapshotError::Corrupt`] when a tier is sold beyond its quantity.
    pub fn from_snapshot(snapshot: Snapshot) -> std::result::Result<Self, SnapshotError> {
        if snapshot.schema_version != SCHEMA_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.schema_version));
        }
        if let Some((event, tier)) = snapshot.events.iter().find_map(|event| {
            event
                .tiers
                .iter()
                .find(|tier| tier.sold > tier.quantity)
                .map(|tier| (event.id, tier.ticket_type.clone()))
        }) {
            return Err(SnapshotError::Corrupt(format!(
                "tier {tier} of {event} is sold beyond its quantity"
            )));
        }

        Ok(Self::restore(snapshot))
    }

    /// Rebuilds a ledger from a snapshot known to be valid
    pub(crate) fn restore(snapshot: Snapshot) -> Self {
        let stored = snapshot.sequences;
        let sequences = Sequences {
            event: stored.event.max(max_id(snapshot.events.iter().map(|e| e.id.value()))),
            booking: stored
                .booking
                .max(max_id(snapshot.bookings.iter().map(|b| b.id.value()))),
            reminder: stored
                .reminder
                .max(max_id(snapshot.reminders.iter().map(|r| r.id.value()))),
            notification: stored
                .notification
                .max(max_id(snapshot.notifications.iter().map(|n| n.id.value()))),
        };

        Self {
            events: snapshot.events,
            bookings: snapshot.bookings,
            reminders: snapshot.reminders,
            notifications: snapshot.notifications,
            sequences,
            revision: snapshot.revision,
        }
    }
}

fn max_id(ids: impl Iterator<Item = u64>) -> u64 {
    ids.max().unwrap_or(0)
}

fn validate_draft(draft: &NewEvent) -> Result<()> {
    if draft.title.trim().is_empty() {
        return Err(LedgerError::validation("event title is required"));
    }
    if draft.venue.name.trim().is_empty() || draft.venue.city.trim().is_empty() {
        return Err(LedgerError::validation("venue name and city are required"));
    }
    if draft.ends_at < draft.starts_at {
        return Err(LedgerError::validation("event cannot end before it starts"));
    }
    if draft.tiers.is_empty() {
        return Err(LedgerError::validation("at least one ticket tier is required"));
    }
    for tier in &draft.tiers {
        if tier.ticket_type.trim().is_empty() {
            return Err(LedgerError::validation("ticket type is required"));
        }
        if tier.quantity == 0 {
            return Err(LedgerError::validation(format!(
                "ticket tier {} needs a positive quantity",
                tier.ticket_type.trim()
            )));
        }
    }
    let policy = draft.group_booking;
    if policy.discount_percent > 100 {
        return Err(LedgerError::validation("group discount cannot exceed 100%"));
    }
    if policy.enabled && policy.min_size == 0 {
        return Err(LedgerError::validation("group size must be at least 1"));
    }
    Ok(())
}

fn validate_contact(contact: &Contact) -> Result<()> {
    if contact.name.trim().is_empty() {
        return Err(LedgerError::validation("name is required"));
    }
    let email = contact.email.trim();
    if email.is_empty() {
        return Err(LedgerError::validation("email is required"));
    }
    if !email.contains('@') {
        return Err(LedgerError::validation(format!("invalid email address: {email}")));
    }
    Ok(())
}

fn normalized_contact(contact: &Contact) -> Contact {
    Contact {
        name: contact.name.trim().to_string(),
        email: contact.email.trim().to_string(),
        phone: contact
            .phone
            .as_deref()
            .map(str::trim)
            .filter(|phone| !phone.is_empty())
            .map(str::to_string),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Category, GroupBookingPolicy, NewTicketTier, Venue};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single().unwrap()
    }

    fn lead() -> Duration {
        Duration::hours(DEFAULT_REMINDER_LEAD_HOURS)
    }

    fn draft(title: &str) -> NewEvent {
        let starts_at = now() + Duration::days(10);
        NewEvent {
            title: title.to_string(),
            category: Category::Music,
            description: "Live on the lawn".to_string(),
            starts_at,
            ends_at: starts_at + Duration::hours(4),
            venue: Venue {
                name: "Chicago Convention Center".to_string(),
                address: "123 Main St, Chicago".to_string(),
                city: "Chicago".to_string(),
                state: "IL".to_string(),
            },
            tiers: vec![
                NewTicketTier::new("General", Money::from_dollars(20), 100),
                NewTicketTier::new("VIP", Money::from_dollars(40), 2),
            ],
            vendors: vec![],
            group_booking: GroupBookingPolicy::enabled(5, 10),
            organizer: OrganizerId::new(1),
        }
    }

    fn ledger_with_event() -> (Ledger, EventId) {
        let mut ledger = Ledger::new();
        let id = ledger.create_event(draft("Summer Concert")).unwrap();
        (ledger, id)
    }

    fn contact() -> Contact {
        Contact::new("Ada Lovelace", "ada@example.com")
    }

    #[test]
    fn test_create_event_sets_price_and_prepends() {
        let mut ledger = Ledger::new();
        let first = ledger.create_event(draft("First")).unwrap();
        let second = ledger.create_event(draft("Second")).unwrap();

        assert_eq!(first, EventId::new(1));
        assert_eq!(second, EventId::new(2));
        assert_eq!(ledger.events()[0].id, second);
        let event = ledger.event(first).unwrap();
        assert_eq!(event.price, Money::from_dollars(20));
        assert_eq!(event.tickets_sold(), 0);
    }

    #[test]
    fn test_create_event_validation() {
        let mut ledger = Ledger::new();

        let mut bad = draft("  ");
        assert!(matches!(ledger.create_event(bad.clone()), Err(LedgerError::Validation(_))));

        bad = draft("No tiers");
        bad.tiers.clear();
        assert!(matches!(ledger.create_event(bad), Err(LedgerError::Validation(_))));

        bad = draft("Backwards");
        bad.ends_at = bad.starts_at - Duration::hours(1);
        assert!(matches!(ledger.create_event(bad), Err(LedgerError::Validation(_))));

        bad = draft("Empty tier");
        bad.tiers[1].quantity = 0;
        assert!(matches!(ledger.create_event(bad), Err(LedgerError::Validation(_))));

        assert!(ledger.events().is_empty());
        assert_eq!(ledger.sequences().event, 0);
    }

    #[test]
    fn test_commit_booking_updates_inventory() {
        let (mut ledger, event_id) = ledger_with_event();
        let request = BookingRequest::new(event_id, Selection::new().with(0, 4).with(1, 1), contact());

        let booking = ledger.commit_booking(&request, now(), lead()).unwrap();

        assert_eq!(booking.id, BookingId::new(1));
        assert_eq!(booking.subtotal, Money::from_dollars(120));
        assert_eq!(booking.discount, Money::from_dollars(12));
        assert_eq!(booking.total, Money::from_dollars(108));
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.ticket_count(), 5);

        let event = ledger.event(event_id).unwrap();
        assert_eq!(event.tiers[0].sold, 4);
        assert_eq!(event.tiers[1].sold, 1);
        assert_eq!(ledger.bookings().len(), 1);
        assert_eq!(ledger.notifications()[0].title, "Booking Confirmed");
        assert!(ledger.reminders().is_empty());
    }

    #[test]
    fn test_commit_booking_schedules_reminder_a_day_before() {
        let (mut ledger, event_id) = ledger_with_event();
        let request =
            BookingRequest::new(event_id, Selection::new().with(0, 1), contact()).with_reminder();

        let booking = ledger.commit_booking(&request, now(), lead()).unwrap();

        let reminder = &ledger.reminders()[0];
        let event = ledger.event(event_id).unwrap();
        assert_eq!(reminder.booking_id, Some(booking.id));
        assert_eq!(reminder.fire_at, event.starts_at - Duration::hours(24));
        assert_eq!(
            reminder.message,
            "Don't forget! Your event \"Summer Concert\" starts tomorrow."
        );
        assert!(!reminder.fired);
    }

    #[test]
    fn test_oversell_is_rejected_atomically() {
        let (mut ledger, event_id) = ledger_with_event();
        let before = ledger.clone();
        let request = BookingRequest::new(event_id, Selection::new().with(0, 10).with(1, 3), contact());

        let result = ledger.commit_booking(&request, now(), lead());

        assert_eq!(
            result,
            Err(LedgerError::InsufficientInventory {
                tier: "VIP".to_string(),
                requested: 3,
                available: 2,
            })
        );
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_commit_booking_validation() {
        let (mut ledger, event_id) = ledger_with_event();
        let before = ledger.clone();

        let empty = BookingRequest::new(event_id, Selection::new().with(0, 0), contact());
        assert!(matches!(
            ledger.commit_booking(&empty, now(), lead()),
            Err(LedgerError::Validation(_))
        ));

        let no_at = BookingRequest::new(
            event_id,
            Selection::new().with(0, 1),
            Contact::new("Ada", "ada.example.com"),
        );
        assert!(matches!(
            ledger.commit_booking(&no_at, now(), lead()),
            Err(LedgerError::Validation(_))
        ));

        let blank_name = BookingRequest::new(
            event_id,
            Selection::new().with(0, 1),
            Contact::new(" ", "ada@example.com"),
        );
        assert!(matches!(
            ledger.commit_booking(&blank_name, now(), lead()),
            Err(LedgerError::Validation(_))
        ));

        let missing = BookingRequest::new(EventId::new(99), Selection::new().with(0, 1), contact());
        assert_eq!(
            ledger.commit_booking(&missing, now(), lead()),
            Err(LedgerError::EventNotFound(EventId::new(99)))
        );

        assert_eq!(ledger, before);
    }

    #[test]
    fn test_cancel_restores_inventory_and_drops_reminders() {
        let (mut ledger, event_id) = ledger_with_event();
        let request =
            BookingRequest::new(event_id, Selection::new().with(0, 3).with(1, 2), contact())
                .with_reminder();
        let booking = ledger.commit_booking(&request, now(), lead()).unwrap();

        let cancelled = ledger.cancel_booking(booking.id).unwrap();

        assert_eq!(cancelled.id, booking.id);
        let event = ledger.event(event_id).unwrap();
        assert_eq!(event.tiers[0].sold, 0);
        assert_eq!(event.tiers[1].sold, 0);
        assert!(ledger.bookings().is_empty());
        assert!(ledger.reminders().is_empty());

        assert_eq!(
            ledger.cancel_booking(booking.id),
            Err(LedgerError::BookingNotFound(booking.id))
        );
    }

    #[test]
    fn test_cancel_after_event_deleted_only_removes_booking() {
        let (mut ledger, event_id) = ledger_with_event();
        let request = BookingRequest::new(event_id, Selection::new().with(0, 1), contact());
        let booking = ledger.commit_booking(&request, now(), lead()).unwrap();

        ledger.delete_event(event_id).unwrap();
        assert_eq!(ledger.bookings().len(), 1);

        ledger.cancel_booking(booking.id).unwrap();
        assert!(ledger.bookings().is_empty());
    }

    #[test]
    fn test_delete_unknown_event_is_not_found() {
        let (mut ledger, _) = ledger_with_event();
        let before = ledger.clone();
        assert_eq!(
            ledger.delete_event(EventId::new(42)),
            Err(LedgerError::EventNotFound(EventId::new(42)))
        );
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_ids_are_not_reused() {
        let (mut ledger, event_id) = ledger_with_event();
        ledger.delete_event(event_id).unwrap();
        let next = ledger.create_event(draft("Again")).unwrap();
        assert_eq!(next, EventId::new(2));
    }

    #[test]
    fn test_fire_due_reminders_is_idempotent() {
        let (mut ledger, event_id) = ledger_with_event();
        let due = now() + Duration::hours(1);
        ledger.add_reminder(event_id, due, "Doors open at 6pm").unwrap();
        ledger
            .add_reminder(event_id, due + Duration::days(1), "Parking tips")
            .unwrap();

        assert!(ledger.fire_due_reminders(now()).is_empty());

        let fired = ledger.fire_due_reminders(due);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].title, "Event Reminder");
        assert_eq!(fired[0].message, "Doors open at 6pm");
        assert_eq!(ledger.notifications()[0].message, "Doors open at 6pm");

        assert!(ledger.fire_due_reminders(due).is_empty());
        assert!(ledger.fire_due_reminders(due + Duration::hours(2)).is_empty());
        assert_eq!(ledger.fire_due_reminders(due + Duration::days(2)).len(), 1);
    }

    #[test]
    fn test_reminder_validation_and_delete() {
        let (mut ledger, event_id) = ledger_with_event();
        assert_eq!(
            ledger.add_reminder(EventId::new(9), now(), "hi"),
            Err(LedgerError::EventNotFound(EventId::new(9)))
        );
        assert!(matches!(
            ledger.add_reminder(event_id, now(), "   "),
            Err(LedgerError::Validation(_))
        ));

        let id = ledger.add_reminder(event_id, now(), "hi").unwrap();
        assert_eq!(ledger.delete_reminder(id).unwrap().id, id);
        assert_eq!(ledger.delete_reminder(id), Err(LedgerError::ReminderNotFound(id)));
    }

    #[test]
    fn test_stats_and_organizer_view() {
        let (mut ledger, event_id) = ledger_with_event();
        let mut other = draft("Someone else's");
        other.organizer = OrganizerId::new(2);
        ledger.create_event(other).unwrap();

        let request = BookingRequest::new(event_id, Selection::new().with(0, 3).with(1, 1), contact());
        ledger.commit_booking(&request, now(), lead()).unwrap();

        let stats = ledger.stats(event_id).unwrap();
        assert_eq!(stats.tickets_sold, 4);
        assert_eq!(stats.revenue, Money::from_dollars(100));

        let mine = ledger.events_by_organizer(OrganizerId::new(1));
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, event_id);
    }

    #[test]
    fn test_stats_with_full_size_tiers() {
        let mut ledger = Ledger::new();
        let mut big = draft("Stadium Tour");
        big.tiers = vec![
            NewTicketTier::new("Floor", Money::from_cents(1), u32::MAX),
            NewTicketTier::new("Seats", Money::from_cents(1), u32::MAX),
        ];
        let event_id = ledger.create_event(big).unwrap();
        let both = 2 * u64::from(u32::MAX);

        assert_eq!(ledger.event(event_id).unwrap().tickets_remaining(), both);

        for tier in 0..2 {
            let request =
                BookingRequest::new(event_id, Selection::new().with(tier, u32::MAX), contact());
            let booking = ledger.commit_booking(&request, now(), lead()).unwrap();
            assert_eq!(booking.ticket_count(), u64::from(u32::MAX));
        }

        let stats = ledger.stats(event_id).unwrap();
        assert_eq!(stats.tickets_sold, both);
        assert_eq!(stats.revenue, Money::from_cents(both));
        assert_eq!(ledger.event(event_id).unwrap().tickets_remaining(), 0);
    }

    #[test]
    fn test_notifications_newest_first_and_clear() {
        let mut ledger = Ledger::new();
        ledger.add_notification(NotificationKind::Info, "One", "first", now());
        ledger.add_notification(NotificationKind::Info, "Two", "second", now());

        assert_eq!(ledger.notification_count(), 2);
        assert_eq!(ledger.notifications()[0].title, "Two");

        ledger.clear_notifications();
        assert_eq!(ledger.notification_count(), 0);
        let next = ledger.add_notification(NotificationKind::Error, "Three", "third", now());
        assert_eq!(next, NotificationId::new(3));
    }

    #[test]
    fn test_snapshot_round_trip_and_sequence_repair() {
        let (mut ledger, event_id) = ledger_with_event();
        let request =
            BookingRequest::new(event_id, Selection::new().with(0, 2), contact()).with_reminder();
        ledger.commit_booking(&request, now(), lead()).unwrap();

        let restored = Ledger::from_snapshot(ledger.to_snapshot()).unwrap();
        assert_eq!(restored, ledger);

        let mut snapshot = ledger.to_snapshot();
        snapshot.sequences = Sequences::default();
        let repaired = Ledger::from_snapshot(snapshot).unwrap();
        assert_eq!(repaired.sequences(), ledger.sequences());
    }

    #[test]
    fn test_snapshot_rejects_oversold_tier() {
        let (ledger, _) = ledger_with_event();
        let mut snapshot = ledger.to_snapshot();
        snapshot.events[0].tiers[1].sold = 3;
        assert!(matches!(Ledger::from_snapshot(snapshot), Err(SnapshotError::Corrupt(_))));
    }

    #[test]
    fn test_booked_prices_survive_tier_repricing() {
        let (mut ledger, event_id) = ledger_with_event();
        let request = BookingRequest::new(event_id, Selection::new().with(0, 2), contact());
        let booking = ledger.commit_booking(&request, now(), lead()).unwrap();

        let mut snapshot = ledger.to_snapshot();
        snapshot.events[0].tiers[0].price = Money::from_dollars(25);
        let mut restored = Ledger::from_snapshot(snapshot).unwrap();

        let kept = restored.booking(booking.id).unwrap();
        assert_eq!(kept.line_items[0].unit_price, Money::from_dollars(20));
        assert_eq!(kept.total, Money::from_dollars(40));

        // New quotes use the new price
        let quote = restored
            .price_selection(event_id, &Selection::new().with(0, 2))
            .unwrap();
        assert_eq!(quote.total, Money::from_dollars(50));

        restored.cancel_booking(booking.id).unwrap();
        assert_eq!(restored.event(event_id).unwrap().tiers[0].sold, 0);
    }
}
