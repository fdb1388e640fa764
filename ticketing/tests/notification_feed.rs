//! Simulated notification feed on paused Tokio time.
//!
//! The feed's odds are pinned (0 or 100 percent) or its random source is
//! seeded, so every tick's outcome is known in advance.

#![allow(clippy::unwrap_used)] // Test code can use unwrap

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use ticketdesk::feed::{FEED_MESSAGE, FEED_TITLE};
use ticketdesk::{
    Config, InMemorySnapshotStore, Notification, NotificationFeed, NotificationKind, TicketDesk,
};
use ticketdesk_testing::{test_time, ManualClock};

const FEED: Duration = Duration::from_secs(30);

async fn open(chance_percent: u32, seed: u64) -> (TicketDesk, Arc<InMemorySnapshotStore>) {
    let mut config = Config::default();
    config.sample.event_count = 0;
    config.feed.interval_secs = FEED.as_secs();
    config.feed.chance_percent = chance_percent;
    config.feed.seed = Some(seed);
    let snapshots = Arc::new(InMemorySnapshotStore::new());
    let desk = TicketDesk::open(
        &config,
        Arc::new(ManualClock::new(test_time())),
        snapshots.clone(),
    )
    .await;
    (desk, snapshots)
}

fn feed_notifications(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| n.title == FEED_TITLE).count()
}

#[tokio::test(start_paused = true)]
async fn test_certain_feed_publishes_every_tick() {
    let (desk, snapshots) = open(100, 1).await;
    desk.start_notification_feed().await.unwrap();
    assert!(desk.is_feed_running().await);

    // Nothing before the first interval elapses
    tokio::time::sleep(FEED - Duration::from_secs(1)).await;
    assert_eq!(feed_notifications(&desk.notifications().await), 0);

    tokio::time::sleep(FEED * 2 + Duration::from_secs(2)).await;
    let notifications = desk.notifications().await;
    assert_eq!(feed_notifications(&notifications), 3);
    assert_eq!(notifications[0].kind, NotificationKind::Info);
    assert_eq!(notifications[0].message, FEED_MESSAGE);

    let stored = snapshots.current().await.unwrap();
    assert_eq!(feed_notifications(&stored.notifications), 3);

    desk.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_impossible_feed_stays_quiet() {
    let (desk, _) = open(0, 1).await;
    let before = desk.notification_count().await;
    desk.start_notification_feed().await.unwrap();

    tokio::time::sleep(FEED * 10 + Duration::from_secs(1)).await;
    assert_eq!(desk.notification_count().await, before);
    assert!(desk.is_feed_running().await);

    desk.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_seeded_feed_is_reproducible() {
    const TICKS: u32 = 20;
    let reference = NotificationFeed::new(FEED, 30, StdRng::seed_from_u64(2025));
    let expected = (0..TICKS).filter(|_| reference.roll()).count();

    let (desk, _) = open(30, 2025).await;
    desk.start_notification_feed().await.unwrap();
    tokio::time::sleep(FEED * TICKS + Duration::from_secs(1)).await;

    assert_eq!(feed_notifications(&desk.notifications().await), expected);
    desk.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_stopped_feed_publishes_nothing() {
    let (desk, _) = open(100, 1).await;
    desk.start_notification_feed().await.unwrap();
    tokio::time::sleep(FEED + Duration::from_secs(1)).await;
    assert_eq!(feed_notifications(&desk.notifications().await), 1);

    desk.stop_notification_feed().await.unwrap();
    assert!(!desk.is_feed_running().await);
    tokio::time::sleep(FEED * 3).await;
    assert_eq!(feed_notifications(&desk.notifications().await), 1);

    desk.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_restart_runs_a_single_feed() {
    let (desk, _) = open(100, 1).await;
    desk.start_notification_feed().await.unwrap();
    desk.stop_notification_feed().await.unwrap();
    desk.start_notification_feed().await.unwrap();
    // Already running: no new loop
    desk.start_notification_feed().await.unwrap();

    let (active, generation) = desk
        .store()
        .state(|state| (state.notification_feed, state.feed_generation))
        .await;
    assert_eq!(active, Some(2));
    assert_eq!(generation, 2);

    // The stale first loop's tick is dropped, so one notification per interval
    tokio::time::sleep(FEED * 2 + Duration::from_secs(1)).await;
    assert_eq!(feed_notifications(&desk.notifications().await), 2);

    desk.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_notify_returns_its_own_id_while_feed_runs() {
    let (desk, _) = open(100, 1).await;
    desk.start_notification_feed().await.unwrap();

    for round in 0..5 {
        tokio::time::sleep(FEED).await;
        let title = format!("Saved draft {round}");
        let id = desk
            .notify(NotificationKind::Success, title.clone(), "Draft stored")
            .await
            .unwrap();

        let notifications = desk.notifications().await;
        let created = notifications.iter().find(|n| n.id == id).unwrap();
        assert_eq!(created.title, title);
        assert_eq!(created.kind, NotificationKind::Success);
    }
    assert!(feed_notifications(&desk.notifications().await) >= 4);

    desk.shutdown();
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_ends_feed() {
    let (desk, _) = open(100, 1).await;
    let before = desk.notification_count().await;
    desk.start_notification_feed().await.unwrap();
    desk.shutdown();

    tokio::time::sleep(FEED * 2).await;
    assert_eq!(desk.notification_count().await, before);
    assert!(desk.start_notification_feed().await.is_err());
}
