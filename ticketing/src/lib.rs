//! Event ticketing ledger.
//!
//! An in-process booking engine for one organizer session: a catalogue of
//! events with tiered ticket inventory, group-discount pricing, bookings,
//! reminders, and notifications (including a simulated feed of "new event"
//! notices). All state lives in a [`Ledger`] driven by
//! [`LedgerReducer`] through the runtime `Store`, and every change is
//! written to a [`SnapshotStore`].
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use ticketdesk::{
//!     BookingRequest, Config, Contact, InMemorySnapshotStore, Selection, TicketDesk,
//! };
//! use ticketdesk_core::environment::SystemClock;
//!
//! # async fn example() -> Result<(), ticketdesk::DeskError> {
//! let desk = TicketDesk::open(
//!     &Config::default(),
//!     Arc::new(SystemClock),
//!     Arc::new(InMemorySnapshotStore::new()),
//! )
//! .await;
//!
//! let event = desk.events().await[0].clone();
//! let booking = desk
//!     .book(BookingRequest::new(
//!         event.id,
//!         Selection::new().with(0, 2),
//!         Contact::new("Ada Lovelace", "ada@example.com"),
//!     ))
//!     .await?;
//! println!("Booked {} for {}", booking.id, booking.total);
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod feed;
pub mod filter;
pub mod ledger;
pub mod pricing;
pub mod reducer;
pub mod sample;
pub mod snapshot;
pub mod types;

pub use app::{SessionOrigin, TicketDesk};
pub use config::Config;
pub use error::{DeskError, LedgerError, Result};
pub use feed::NotificationFeed;
pub use filter::{search, EventFilter};
pub use ledger::{BookingPlan, BookingRequest, FiredReminder, Ledger, Sequences};
pub use pricing::{quote, Quote, Selection};
pub use reducer::{LedgerAction, LedgerEnvironment, LedgerReducer, LedgerState};
pub use snapshot::{
    InMemorySnapshotStore, JsonFileSnapshotStore, Snapshot, SnapshotError, SnapshotStore,
    SCHEMA_VERSION,
};
pub use types::{
    Booking, BookingId, BookingStatus, Category, Contact, Event, EventId, EventStats,
    GroupBookingPolicy, LineItem, Money, NewEvent, NewTicketTier, Notification, NotificationId,
    NotificationKind, OrganizerId, Reminder, ReminderId, TicketTier, Vendor, VendorType, Venue,
};
