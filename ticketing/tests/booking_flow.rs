//! End-to-end booking session through the `TicketDesk` facade.

#![allow(clippy::unwrap_used)] // Test code can use unwrap

use chrono::Duration;
use std::sync::Arc;
use ticketdesk::{
    BookingId, BookingRequest, Category, Config, Contact, DeskError, EventFilter,
    GroupBookingPolicy, InMemorySnapshotStore, LedgerError, Money, NewEvent, NewTicketTier,
    OrganizerId, Selection, TicketDesk, Venue,
};
use ticketdesk_testing::{test_clock, test_time};

// ============================================================================
// Fixtures
// ============================================================================

fn config() -> Config {
    let mut config = Config::default();
    config.sample.event_count = 0;
    config.session.organizer_id = 7;
    config
}

fn summer_concert() -> NewEvent {
    let starts_at = test_time() + Duration::days(3);
    NewEvent {
        title: "  Summer Concert ".to_string(),
        category: Category::Music,
        description: "Open air, bring a blanket".to_string(),
        starts_at,
        ends_at: starts_at + Duration::hours(4),
        venue: Venue {
            name: "Millennium Park".to_string(),
            address: "201 E Randolph St".to_string(),
            city: "Chicago".to_string(),
            state: "IL".to_string(),
        },
        tiers: vec![
            NewTicketTier::new("General", Money::from_dollars(20), 100),
            NewTicketTier::new("VIP", Money::from_dollars(40), 50),
        ],
        vendors: vec![],
        group_booking: GroupBookingPolicy::enabled(5, 10),
        organizer: OrganizerId::new(1),
    }
}

fn contact() -> Contact {
    Contact::new("Ada Lovelace", "ada@example.com").with_phone("555-0199")
}

async fn open() -> (TicketDesk, Arc<InMemorySnapshotStore>) {
    let snapshots = Arc::new(InMemorySnapshotStore::new());
    let desk = TicketDesk::open(&config(), Arc::new(test_clock()), snapshots.clone()).await;
    (desk, snapshots)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_group_booking_session() {
    let (desk, snapshots) = open().await;

    let event = desk.create_event(summer_concert()).await.unwrap();
    assert_eq!(event.title, "Summer Concert");
    assert_eq!(event.price, Money::from_dollars(20));
    assert_eq!(event.organizer, OrganizerId::new(7));
    assert_eq!(desk.my_events().await.len(), 1);

    // 4 General + 1 VIP reaches the group minimum of 5
    let selection = Selection::new().with(0, 4).with(1, 1);
    let quote = desk.quote(event.id, &selection).await.unwrap();
    assert_eq!(quote.subtotal, Money::from_dollars(120));
    assert_eq!(quote.discount, Money::from_dollars(12));
    assert_eq!(quote.total, Money::from_dollars(108));

    let booking = desk
        .book(BookingRequest::new(event.id, selection, contact()).with_reminder())
        .await
        .unwrap();
    assert_eq!(booking.id, BookingId::new(1));
    assert_eq!(booking.id.to_string(), "#000001");
    assert_eq!(booking.total, Money::from_dollars(108));
    assert_eq!(booking.ticket_count(), 5);

    let stats = desk.stats(event.id).await.unwrap();
    assert_eq!(stats.tickets_sold, 5);
    assert_eq!(stats.revenue, Money::from_dollars(120));

    let reminders = desk.reminders().await;
    assert_eq!(reminders.len(), 1);
    assert_eq!(reminders[0].booking_id, Some(booking.id));
    assert_eq!(reminders[0].fire_at, event.starts_at - Duration::hours(24));

    let notifications = desk.notifications().await;
    assert_eq!(notifications[0].title, "Booking Confirmed");
    assert_eq!(
        notifications[0].message,
        "Your tickets for Summer Concert have been booked successfully!"
    );

    // Below the group minimum: no discount
    let small = desk
        .book(BookingRequest::new(
            event.id,
            Selection::new().with(0, 3),
            contact(),
        ))
        .await
        .unwrap();
    assert_eq!(small.total, Money::from_dollars(60));
    assert!(small.discount.is_zero());

    let stored = desk.event(event.id).await.unwrap();
    assert_eq!(stored.tiers[0].sold, 7);
    assert_eq!(stored.tiers[1].sold, 1);

    // The snapshot store holds the latest revision
    let snapshot = snapshots.current().await.unwrap();
    assert_eq!(snapshot.revision, desk.ledger().await.revision());
    assert_eq!(snapshot.bookings.len(), 2);
}

#[tokio::test]
async fn test_oversell_is_rejected_without_changes() {
    let (desk, _) = open().await;
    let event = desk.create_event(summer_concert()).await.unwrap();
    desk.book(BookingRequest::new(
        event.id,
        Selection::new().with(1, 45),
        contact(),
    ))
    .await
    .unwrap();
    let before = desk.ledger().await;

    let error = desk
        .book(BookingRequest::new(
            event.id,
            Selection::new().with(0, 2).with(1, 6),
            contact(),
        ))
        .await
        .unwrap_err();

    assert_eq!(
        error,
        DeskError::Ledger(LedgerError::InsufficientInventory {
            tier: "VIP".to_string(),
            requested: 6,
            available: 5,
        })
    );
    assert_eq!(desk.ledger().await, before);

    // The next accepted command clears the error
    desk.book(BookingRequest::new(
        event.id,
        Selection::new().with(1, 5),
        contact(),
    ))
    .await
    .unwrap();
    assert!(desk.event(event.id).await.unwrap().tiers[1].is_sold_out());
}

#[tokio::test]
async fn test_cancel_restores_inventory_and_drops_reminder() {
    let (desk, _) = open().await;
    let event = desk.create_event(summer_concert()).await.unwrap();
    let booking = desk
        .book(
            BookingRequest::new(event.id, Selection::new().with(0, 4), contact())
                .with_reminder(),
        )
        .await
        .unwrap();

    desk.cancel_booking(booking.id).await.unwrap();

    assert_eq!(desk.event(event.id).await.unwrap().tickets_sold(), 0);
    assert!(desk.bookings().await.is_empty());
    assert!(desk.reminders().await.is_empty());

    // Ids are never reused
    let next = desk
        .book(BookingRequest::new(
            event.id,
            Selection::new().with(0, 1),
            contact(),
        ))
        .await
        .unwrap();
    assert_eq!(next.id, BookingId::new(2));
}

#[tokio::test]
async fn test_invalid_requests() {
    let (desk, _) = open().await;
    let event = desk.create_event(summer_concert()).await.unwrap();

    let empty = desk
        .book(BookingRequest::new(event.id, Selection::new(), contact()))
        .await
        .unwrap_err();
    assert!(matches!(empty, DeskError::Ledger(LedgerError::Validation(_))));

    let bad_contact = desk
        .book(BookingRequest::new(
            event.id,
            Selection::new().with(0, 1),
            Contact::new("Ada", "not-an-email"),
        ))
        .await
        .unwrap_err();
    assert!(matches!(bad_contact, DeskError::Ledger(LedgerError::Validation(_))));

    let mut untitled = summer_concert();
    untitled.title = "   ".to_string();
    assert!(desk.create_event(untitled).await.is_err());
    assert_eq!(desk.events().await.len(), 1);
}

#[tokio::test]
async fn test_delete_event_keeps_bookings() {
    let (desk, _) = open().await;
    let event = desk.create_event(summer_concert()).await.unwrap();
    desk.book(BookingRequest::new(
        event.id,
        Selection::new().with(0, 2),
        contact(),
    ))
    .await
    .unwrap();

    desk.delete_event(event.id).await.unwrap();

    assert!(desk.event(event.id).await.is_none());
    assert_eq!(desk.bookings_for_event(event.id).await.len(), 1);
    assert!(desk
        .delete_event(event.id)
        .await
        .unwrap_err()
        .as_ledger()
        .is_some_and(LedgerError::is_not_found));
}

#[tokio::test]
async fn test_browse_catalogue() {
    let (desk, _) = open().await;
    desk.create_event(summer_concert()).await.unwrap();
    let mut talk = summer_concert();
    talk.title = "Rust Meetup".to_string();
    talk.category = Category::Tech;
    talk.venue.city = "Berlin".to_string();
    talk.tiers = vec![NewTicketTier::new("Entry", Money::from_dollars(5), 40)];
    desk.create_event(talk).await.unwrap();

    let events = desk.events().await;
    assert_eq!(events[0].title, "Rust Meetup");

    let cheap = desk
        .filter_events(&EventFilter::new().price_between(None, Some(Money::from_dollars(10))))
        .await;
    assert_eq!(cheap.len(), 1);
    assert_eq!(cheap[0].title, "Rust Meetup");

    assert_eq!(desk.search_events("chicago").await.len(), 1);
    assert_eq!(desk.search_events("TECH").await.len(), 1);
    assert_eq!(desk.search_events("").await.len(), 2);
}
