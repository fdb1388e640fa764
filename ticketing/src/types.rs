//! Domain types for the TicketDesk ledger.
//!
//! Value objects and entities for events, ticket tiers, bookings, reminders
//! and notifications. All amounts are [`Money`] in cents; all timestamps are
//! UTC.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! sequential_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Wraps a raw sequence number
            #[must_use]
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the raw sequence number
            #[must_use]
            pub const fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

sequential_id!(
    /// Identifier of an event in the catalogue
    EventId,
    "event-"
);

sequential_id!(
    /// Identifier of a reminder
    ReminderId,
    "reminder-"
);

sequential_id!(
    /// Identifier of a notification
    NotificationId,
    "notification-"
);

sequential_id!(
    /// Identifier of the organizer who created an event
    OrganizerId,
    "organizer-"
);

/// Identifier of a booking
///
/// Displayed the way booking references are printed on a ticket: `#000042`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(u64);

impl BookingId {
    /// Wraps a raw sequence number
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw sequence number
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06}", self.0)
    }
}

// ============================================================================
// Money Value Object (cents-based to avoid floating point errors)
// ============================================================================

/// Represents money in cents
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Creates a `Money` value from dollars
    ///
    /// # Panics
    ///
    /// Panics if the conversion would overflow (dollars * 100 > `u64::MAX`).
    /// Use `checked_from_dollars` for non-panicking conversion.
    #[must_use]
    #[allow(clippy::panic)]
    pub const fn from_dollars(dollars: u64) -> Self {
        match dollars.checked_mul(100) {
            Some(cents) => Self(cents),
            None => panic!("Money::from_dollars overflow"),
        }
    }

    /// Creates a `Money` value from dollars with overflow checking
    #[must_use]
    pub const fn checked_from_dollars(dollars: u64) -> Option<Self> {
        match dollars.checked_mul(100) {
            Some(cents) => Some(Self(cents)),
            None => None,
        }
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Returns the amount in dollars (rounded down)
    #[must_use]
    pub const fn dollars(&self) -> u64 {
        self.0 / 100
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two money amounts with overflow checking
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Subtracts two money amounts (returns None if result would be negative)
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        if self.0 >= other.0 {
            Some(Self(self.0 - other.0))
        } else {
            None
        }
    }

    /// Multiplies money by a quantity with overflow checking
    #[must_use]
    pub const fn checked_multiply(self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as u64) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Returns `percent` of this amount, truncated toward zero
    ///
    /// Returns `None` when `percent > 100` or the intermediate product
    /// overflows.
    #[must_use]
    pub const fn checked_percentage(self, percent: u32) -> Option<Self> {
        if percent > 100 {
            return None;
        }
        match self.0.checked_mul(percent as u64) {
            Some(product) => Some(Self(product / 100)),
            None => None,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.dollars(), self.0 % 100)
    }
}

// ============================================================================
// Lookup enums
// ============================================================================

/// Error returned when parsing an unknown category or vendor key
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} key: {key}")]
pub struct UnknownKey {
    kind: &'static str,
    key: String,
}

/// Event category
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Concerts and live music
    Music,
    /// Conferences, networking
    Business,
    /// Technology meetups and summits
    Tech,
    /// Sporting events
    Sports,
    /// Food and drink festivals
    Food,
    /// Exhibitions and performances
    Art,
    /// Workshops and classes
    Education,
    /// Fundraisers
    Charity,
}

impl Category {
    /// Every category, in display order
    pub const ALL: [Self; 8] = [
        Self::Music,
        Self::Business,
        Self::Tech,
        Self::Sports,
        Self::Food,
        Self::Art,
        Self::Education,
        Self::Charity,
    ];

    /// Lowercase key used in snapshots and search
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Music => "music",
            Self::Business => "business",
            Self::Tech => "tech",
            Self::Sports => "sports",
            Self::Food => "food",
            Self::Art => "art",
            Self::Education => "education",
            Self::Charity => "charity",
        }
    }

    /// Human readable label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Music => "Music & Concerts",
            Self::Business => "Business",
            Self::Tech => "Technology",
            Self::Sports => "Sports",
            Self::Food => "Food & Drink",
            Self::Art => "Arts & Culture",
            Self::Education => "Education",
            Self::Charity => "Charity",
        }
    }

    /// Icon name for presentation layers
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Music => "fa-music",
            Self::Business => "fa-briefcase",
            Self::Tech => "fa-laptop-code",
            Self::Sports => "fa-futbol",
            Self::Food => "fa-utensils",
            Self::Art => "fa-palette",
            Self::Education => "fa-graduation-cap",
            Self::Charity => "fa-hand-holding-heart",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| category.key() == key)
            .ok_or(UnknownKey {
                kind: "category",
                key,
            })
    }
}

/// Kind of service a vendor provides to an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VendorType {
    /// Food service
    Catering,
    /// Photographers
    Photography,
    /// Sound and projection
    Audio,
    /// Venue decoration
    Decoration,
    /// Security staff
    Security,
    /// Performers
    Entertainment,
}

impl VendorType {
    /// Every vendor type, in display order
    pub const ALL: [Self; 6] = [
        Self::Catering,
        Self::Photography,
        Self::Audio,
        Self::Decoration,
        Self::Security,
        Self::Entertainment,
    ];

    /// Lowercase key used in snapshots
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Catering => "catering",
            Self::Photography => "photography",
            Self::Audio => "audio",
            Self::Decoration => "decoration",
            Self::Security => "security",
            Self::Entertainment => "entertainment",
        }
    }

    /// Human readable label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Catering => "Catering Services",
            Self::Photography => "Photography",
            Self::Audio => "Audio/Visual",
            Self::Decoration => "Decoration",
            Self::Security => "Security",
            Self::Entertainment => "Entertainment",
        }
    }

    /// Icon name for presentation layers
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Catering => "fa-utensils",
            Self::Photography => "fa-camera",
            Self::Audio => "fa-volume-up",
            Self::Decoration => "fa-paint-brush",
            Self::Security => "fa-shield-alt",
            Self::Entertainment => "fa-theater-masks",
        }
    }
}

impl fmt::Display for VendorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for VendorType {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|vendor_type| vendor_type.key() == key)
            .ok_or(UnknownKey { kind: "vendor", key })
    }
}

// ============================================================================
// Events
// ============================================================================

/// Where an event takes place
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Venue {
    /// Venue name
    pub name: String,
    /// Street address
    pub address: String,
    /// City, used by location filters
    pub city: String,
    /// State or region
    pub state: String,
}

/// A priced class of ticket with a fixed capacity
///
/// `sold` never exceeds `quantity`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketTier {
    /// Label, e.g. "General Admission"
    pub ticket_type: String,
    /// Unit price
    pub price: Money,
    /// Capacity
    pub quantity: u32,
    /// Tickets already sold
    pub sold: u32,
}

impl TicketTier {
    /// Creates a tier with nothing sold
    #[must_use]
    pub fn new(ticket_type: impl Into<String>, price: Money, quantity: u32) -> Self {
        Self {
            ticket_type: ticket_type.into(),
            price,
            quantity,
            sold: 0,
        }
    }

    /// Tickets still available
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.quantity.saturating_sub(self.sold)
    }

    /// True when nothing is left
    #[must_use]
    pub const fn is_sold_out(&self) -> bool {
        self.remaining() == 0
    }

    /// Revenue from sold tickets
    #[must_use]
    pub const fn revenue(&self) -> Option<Money> {
        self.price.checked_multiply(self.sold)
    }
}

/// A service provider attached to an event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vendor {
    /// Kind of service
    pub vendor_type: VendorType,
    /// Business name
    pub name: String,
    /// Contact phone or email
    pub contact: String,
}

/// Group discount rule of an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBookingPolicy {
    /// Whether group pricing is offered at all
    pub enabled: bool,
    /// Minimum number of tickets in one booking
    pub min_size: u32,
    /// Discount in percent, `0..=100`
    pub discount_percent: u32,
}

impl GroupBookingPolicy {
    /// Enabled policy with the given threshold and discount
    #[must_use]
    pub const fn enabled(min_size: u32, discount_percent: u32) -> Self {
        Self {
            enabled: true,
            min_size,
            discount_percent,
        }
    }

    /// Whether a booking of `total_tickets` receives the discount
    #[must_use]
    pub const fn applies_to(&self, total_tickets: u32) -> bool {
        self.enabled && total_tickets >= self.min_size
    }
}

impl Default for GroupBookingPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            min_size: 5,
            discount_percent: 10,
        }
    }
}

/// An event in the catalogue
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier
    pub id: EventId,
    /// Title
    pub title: String,
    /// Category
    pub category: Category,
    /// Free-form description
    pub description: String,
    /// Start time
    pub starts_at: DateTime<Utc>,
    /// End time
    pub ends_at: DateTime<Utc>,
    /// Venue
    pub venue: Venue,
    /// Headline price used by filters; the first tier's price at creation
    pub price: Money,
    /// Ticket tiers, addressed by index
    pub tiers: Vec<TicketTier>,
    /// Vendors
    pub vendors: Vec<Vendor>,
    /// Group discount rule
    pub group_booking: GroupBookingPolicy,
    /// Organizer who created the event
    pub organizer: OrganizerId,
    /// Expected attendance, display only
    pub attendees: u32,
}

impl Event {
    /// Total tickets sold across all tiers
    ///
    /// Summed as `u64`: each tier may hold up to `u32::MAX` tickets.
    #[must_use]
    pub fn tickets_sold(&self) -> u64 {
        self.tiers.iter().map(|tier| u64::from(tier.sold)).sum()
    }

    /// Tickets left across all tiers
    #[must_use]
    pub fn tickets_remaining(&self) -> u64 {
        self.tiers.iter().map(|tier| u64::from(tier.remaining())).sum()
    }

    /// Revenue across all tiers (`None` on overflow)
    #[must_use]
    pub fn revenue(&self) -> Option<Money> {
        self.tiers
            .iter()
            .try_fold(Money::ZERO, |acc, tier| acc.checked_add(tier.revenue()?))
    }
}

/// Dashboard figures for one event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStats {
    /// Σ sold
    pub tickets_sold: u64,
    /// Σ price × sold
    pub revenue: Money,
    /// Display attendee count
    pub attendees: u32,
}

/// Draft tier of a [`NewEvent`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTicketTier {
    /// Label
    pub ticket_type: String,
    /// Unit price
    pub price: Money,
    /// Capacity
    pub quantity: u32,
}

impl NewTicketTier {
    /// Creates a draft tier
    #[must_use]
    pub fn new(ticket_type: impl Into<String>, price: Money, quantity: u32) -> Self {
        Self {
            ticket_type: ticket_type.into(),
            price,
            quantity,
        }
    }
}

/// Everything an organizer supplies to publish an event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    /// Title
    pub title: String,
    /// Category
    pub category: Category,
    /// Description
    pub description: String,
    /// Start time
    pub starts_at: DateTime<Utc>,
    /// End time
    pub ends_at: DateTime<Utc>,
    /// Venue
    pub venue: Venue,
    /// At least one tier; the first sets the headline price
    pub tiers: Vec<NewTicketTier>,
    /// Vendors
    pub vendors: Vec<Vendor>,
    /// Group discount rule
    pub group_booking: GroupBookingPolicy,
    /// Creating organizer
    pub organizer: OrganizerId,
}

// ============================================================================
// Bookings
// ============================================================================

/// Purchaser contact details
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Full name
    pub name: String,
    /// Email address
    pub email: String,
    /// Phone number, optional
    pub phone: Option<String>,
}

impl Contact {
    /// Contact without a phone number
    #[must_use]
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            phone: None,
        }
    }

    /// Adds a phone number
    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }
}

/// One tier's share of a booking, priced at booking time
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Index of the tier in the event
    pub tier_index: usize,
    /// Tier label at booking time
    pub ticket_type: String,
    /// Tickets booked
    pub quantity: u32,
    /// Unit price at booking time
    pub unit_price: Money,
}

/// Lifecycle state of a booking
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Tickets are held
    Confirmed,
}

/// A committed purchase of tickets for one event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Unique identifier
    pub id: BookingId,
    /// Booked event
    pub event_id: EventId,
    /// Event title at booking time
    pub event_title: String,
    /// Purchaser
    pub contact: Contact,
    /// Non-empty tiers of the selection
    pub line_items: Vec<LineItem>,
    /// Before discount
    pub subtotal: Money,
    /// Group discount
    pub discount: Money,
    /// Amount charged
    pub total: Money,
    /// When the booking was committed
    pub booked_at: DateTime<Utc>,
    /// Status
    pub status: BookingStatus,
}

impl Booking {
    /// Tickets across all line items
    #[must_use]
    pub fn ticket_count(&self) -> u64 {
        self.line_items.iter().map(|item| u64::from(item.quantity)).sum()
    }
}

// ============================================================================
// Reminders and notifications
// ============================================================================

/// A scheduled nudge about an upcoming event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    /// Unique identifier
    pub id: ReminderId,
    /// Event the reminder is about
    pub event_id: EventId,
    /// Event title at scheduling time
    pub event_title: String,
    /// Booking that scheduled the reminder, if any
    pub booking_id: Option<BookingId>,
    /// When the reminder becomes due
    pub fire_at: DateTime<Utc>,
    /// Text of the notification it produces
    pub message: String,
    /// Set once the reminder has produced its notification
    pub fired: bool,
}

impl Reminder {
    /// Unfired and due at `now`
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.fired && self.fire_at <= now
    }
}

/// Severity of a notification
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Informational
    Info,
    /// Something completed
    Success,
    /// Something failed
    Error,
}

/// An entry in the session's notification list
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Unique identifier
    pub id: NotificationId,
    /// Severity
    pub kind: NotificationKind,
    /// Short title
    pub title: String,
    /// Body
    pub message: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_cents(12_050).to_string(), "$120.50");
        assert_eq!(Money::from_dollars(20).to_string(), "$20.00");
        assert_eq!(Money::ZERO.to_string(), "$0.00");
    }

    #[test]
    fn test_money_percentage_truncates() {
        assert_eq!(
            Money::from_cents(1_999).checked_percentage(10),
            Some(Money::from_cents(199))
        );
        assert_eq!(Money::from_dollars(120).checked_percentage(10), Some(Money::from_dollars(12)));
        assert_eq!(Money::from_cents(1).checked_percentage(101), None);
        assert_eq!(Money::from_cents(u64::MAX).checked_percentage(50), None);
    }

    #[test]
    fn test_money_checked_arithmetic() {
        assert_eq!(Money::from_cents(u64::MAX).checked_add(Money::from_cents(1)), None);
        assert_eq!(Money::from_cents(5).checked_sub(Money::from_cents(6)), None);
        assert_eq!(Money::from_dollars(20).checked_multiply(3), Some(Money::from_dollars(60)));
        assert_eq!(Money::checked_from_dollars(u64::MAX), None);
    }

    #[test]
    fn test_booking_id_display() {
        assert_eq!(BookingId::new(42).to_string(), "#000042");
        assert_eq!(EventId::new(7).to_string(), "event-7");
    }

    #[test]
    fn test_category_lookup_is_total() {
        for category in Category::ALL {
            assert!(!category.label().is_empty());
            assert!(category.icon().starts_with("fa-"));
            assert_eq!(category.key().parse::<Category>(), Ok(category));
        }
        assert_eq!(Category::Music.label(), "Music & Concerts");
        assert!("karaoke".parse::<Category>().is_err());
    }

    #[test]
    fn test_vendor_lookup_is_total() {
        for vendor_type in VendorType::ALL {
            assert_eq!(vendor_type.key().parse::<VendorType>(), Ok(vendor_type));
        }
        assert_eq!(VendorType::Audio.label(), "Audio/Visual");
        assert_eq!(" Catering ".parse::<VendorType>(), Ok(VendorType::Catering));
    }

    #[test]
    fn test_category_serializes_as_key() {
        let json = serde_json::to_string(&Category::Food).unwrap();
        assert_eq!(json, "\"food\"");
    }

    #[test]
    fn test_group_policy_threshold() {
        let policy = GroupBookingPolicy::enabled(5, 10);
        assert!(!policy.applies_to(4));
        assert!(policy.applies_to(5));
        assert!(!GroupBookingPolicy::default().applies_to(100));
    }

    #[test]
    fn test_tier_remaining() {
        let mut tier = TicketTier::new("VIP", Money::from_dollars(40), 2);
        tier.sold = 2;
        assert_eq!(tier.remaining(), 0);
        assert!(tier.is_sold_out());
        assert_eq!(tier.revenue(), Some(Money::from_dollars(80)));
    }
}
