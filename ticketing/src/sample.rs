//! Sample catalogue for first runs and failed restores.

use crate::ledger::{Ledger, Sequences};
use crate::snapshot::{Snapshot, SCHEMA_VERSION};
use crate::types::{
    Category, Event, EventId, GroupBookingPolicy, Money, Notification, NotificationId,
    NotificationKind, OrganizerId, TicketTier, Vendor, VendorType, Venue,
};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const CATEGORIES: [Category; 6] = [
    Category::Music,
    Category::Business,
    Category::Tech,
    Category::Sports,
    Category::Food,
    Category::Art,
];

const CITIES: [&str; 6] = [
    "New York",
    "Los Angeles",
    "Chicago",
    "Houston",
    "Phoenix",
    "San Francisco",
];

fn titles(category: Category) -> &'static [&'static str] {
    match category {
        Category::Music => &["Summer Music Festival", "Jazz Night", "Rock Concert", "Classical Evening"],
        Category::Business => &["Tech Summit", "Business Networking", "Leadership Conference", "Startup Pitch"],
        Category::Tech => &["AI Conference", "Web Development Workshop", "Cybersecurity Summit", "Cloud Computing Expo"],
        Category::Sports => &["Marathon Event", "Yoga Retreat", "Basketball Tournament", "Fitness Bootcamp"],
        Category::Food => &["Wine Tasting", "Food Festival", "Cooking Workshop", "Chef's Table"],
        Category::Art | Category::Education | Category::Charity => {
            &["Art Exhibition", "Photography Workshop", "Theater Performance", "Dance Show"]
        },
    }
}

/// Random generator for sample data; seeded runs are reproducible
#[must_use]
pub fn rng(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64)
}

/// Ledger holding `count` generated events and three welcome notifications
///
/// Every event has a "General Admission" tier (100 seats, base price) and a
/// "VIP" tier (50 seats, twice the base price), each partly sold.
pub fn sample_ledger<R: Rng + ?Sized>(
    rng: &mut R,
    count: usize,
    organizer: OrganizerId,
    now: DateTime<Utc>,
) -> Ledger {
    let events: Vec<Event> = (1..=count as u64)
        .map(|id| sample_event(rng, EventId::new(id), organizer, now))
        .collect();
    let notifications = welcome_notifications(now);

    Ledger::restore(Snapshot {
        schema_version: SCHEMA_VERSION,
        revision: 0,
        sequences: Sequences {
            event: count as u64,
            notification: notifications.len() as u64,
            ..Sequences::default()
        },
        events,
        bookings: Vec::new(),
        reminders: Vec::new(),
        notifications,
    })
}

fn sample_event<R: Rng + ?Sized>(
    rng: &mut R,
    id: EventId,
    organizer: OrganizerId,
    now: DateTime<Utc>,
) -> Event {
    let category = CATEGORIES.choose(rng).copied().unwrap_or(Category::Music);
    let city = CITIES.choose(rng).copied().unwrap_or("New York");
    let title = titles(category).choose(rng).copied().unwrap_or("Community Event");
    let price = Money::from_dollars(rng.gen_range(10..160));
    let vip_price = price.checked_multiply(2).unwrap_or(price);
    let starts_at = now + Duration::days(rng.gen_range(0..60));

    let mut general = TicketTier::new("General Admission", price, 100);
    general.sold = rng.gen_range(0..50);
    let mut vip = TicketTier::new("VIP", vip_price, 50);
    vip.sold = rng.gen_range(0..25);

    Event {
        id,
        title: title.to_string(),
        category,
        description: format!(
            "Join us for an amazing {} event in {city}. This will be an unforgettable experience!",
            category.key()
        ),
        starts_at,
        ends_at: starts_at + Duration::hours(4),
        venue: Venue {
            name: format!("{city} Convention Center"),
            address: format!("123 Main St, {city}"),
            city: city.to_string(),
            state: "State".to_string(),
        },
        price,
        tiers: vec![general, vip],
        vendors: vec![
            Vendor {
                vendor_type: VendorType::Catering,
                name: "Delicious Catering Co.".to_string(),
                contact: "555-0101".to_string(),
            },
            Vendor {
                vendor_type: VendorType::Photography,
                name: "Snap Photos".to_string(),
                contact: "555-0102".to_string(),
            },
        ],
        group_booking: GroupBookingPolicy {
            enabled: rng.gen_bool(0.5),
            ..GroupBookingPolicy::default()
        },
        organizer,
        attendees: rng.gen_range(50..250),
    }
}

fn welcome_notifications(now: DateTime<Utc>) -> Vec<Notification> {
    let seeded = [
        (
            NotificationKind::Info,
            "New Event Alert",
            "A new tech conference has been added in your area!",
        ),
        (
            NotificationKind::Success,
            "Booking Reminder",
            "Your event \"Summer Music Festival\" starts tomorrow!",
        ),
        (
            NotificationKind::Info,
            "Price Drop",
            "Early bird tickets now available for Business Summit",
        ),
    ];
    seeded
        .into_iter()
        .zip(1..)
        .map(|((kind, title, message), id)| Notification {
            id: NotificationId::new(id),
            kind,
            title: title.to_string(),
            message: message.to_string(),
            created_at: now - Duration::hours(i64::try_from(id).unwrap_or(0)),
        })
        .collect()
}
