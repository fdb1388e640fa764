//! TicketDesk command-line session.
//!
//! Opens (or seeds) the session snapshot, prints the catalogue, and books
//! a couple of tickets on the soonest event.
//!
//! Configuration comes from the environment, optionally via a `.env` file;
//! see [`Config::from_env`].

use std::sync::Arc;
use ticketdesk::{
    BookingRequest, Config, Contact, JsonFileSnapshotStore, Selection, SessionOrigin, TicketDesk,
};
use ticketdesk_core::environment::SystemClock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env();
    init_tracing(&config);

    let snapshots = Arc::new(JsonFileSnapshotStore::new(&config.snapshot.path));
    let desk = TicketDesk::open(&config, Arc::new(SystemClock), snapshots).await;

    match desk.origin() {
        SessionOrigin::Restored => println!("Restored session from {}", config.snapshot.path),
        SessionOrigin::Seeded => println!("Started a new session with sample events"),
    }

    let mut events = desk.events().await;
    events.sort_by_key(|event| event.starts_at);
    println!("\n{} events:", events.len());
    for event in &events {
        println!(
            "  {} {:<28} {:<14} {} from {}  ({} left)",
            event.category.icon(),
            event.title,
            event.venue.city,
            event.starts_at.format("%Y-%m-%d"),
            event.price,
            event.tickets_remaining()
        );
    }

    if let Some(event) = events.first() {
        let selection = Selection::new().with(0, 2);
        let quote = desk.quote(event.id, &selection).await?;
        println!("\nQuote for 2 tickets to {}: {}", event.title, quote.total);

        let booking = desk
            .book(
                BookingRequest::new(
                    event.id,
                    selection,
                    Contact::new("Demo Attendee", "demo@example.com"),
                )
                .with_reminder(),
            )
            .await?;
        println!("Booked {} ({} tickets, {})", booking.id, booking.ticket_count(), booking.total);
    }

    let fired = desk.poll_reminders().await?;
    if fired > 0 {
        println!("{fired} reminder(s) fired");
    }

    println!("\nNotifications:");
    for notification in desk.notifications().await.iter().take(5) {
        println!("  [{}] {}", notification.title, notification.message);
    }

    if let Some(error) = desk.last_snapshot_error().await {
        tracing::warn!(%error, "Session was not fully saved");
    }
    desk.shutdown();
    Ok(())
}

fn init_tracing(config: &Config) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(&config.logging.level)
                .unwrap_or_else(|_| "info,ticketdesk=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
