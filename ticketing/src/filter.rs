//! Catalogue filtering and search.
//!
//! Both are pure scans that keep the catalogue's order.

use crate::types::{Category, Event, Money};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Criteria for narrowing the catalogue
///
/// Every criterion is optional; an absent one matches every event.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    /// Exact category
    pub category: Option<Category>,
    /// Case-insensitive substring of the venue city
    pub location: Option<String>,
    /// Inclusive lower bound on the headline price
    pub min_price: Option<Money>,
    /// Inclusive upper bound on the headline price
    pub max_price: Option<Money>,
    /// Inclusive lower bound on the start time
    pub starts_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the start time
    pub starts_until: Option<DateTime<Utc>>,
}

impl EventFilter {
    /// Filter that matches everything
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one category
    #[must_use]
    pub const fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    /// Restrict to cities containing `location`
    #[must_use]
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Restrict to a price range, inclusive on both ends
    #[must_use]
    pub const fn price_between(mut self, min: Option<Money>, max: Option<Money>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    /// Restrict to a start-time window, inclusive on both ends
    #[must_use]
    pub const fn starting_between(
        mut self,
        from: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Self {
        self.starts_from = from;
        self.starts_until = until;
        self
    }

    /// Whether `event` satisfies every present criterion
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        if self.category.is_some_and(|category| event.category != category) {
            return false;
        }
        if let Some(location) = self.location.as_deref() {
            let needle = location.trim().to_lowercase();
            if !needle.is_empty() && !event.venue.city.to_lowercase().contains(&needle) {
                return false;
            }
        }
        if self.min_price.is_some_and(|min| event.price < min)
            || self.max_price.is_some_and(|max| event.price > max)
        {
            return false;
        }
        if self.starts_from.is_some_and(|from| event.starts_at < from)
            || self.starts_until.is_some_and(|until| event.starts_at > until)
        {
            return false;
        }
        true
    }

    /// Events satisfying the filter, in input order
    #[must_use]
    pub fn apply<'a>(&self, events: &'a [Event]) -> Vec<&'a Event> {
        events.iter().filter(|event| self.matches(event)).collect()
    }
}

/// Events whose title, category key or city contains `term`, case-insensitively
///
/// A blank term matches every event. Input order is kept.
#[must_use]
pub fn search<'a>(events: &'a [Event], term: &str) -> Vec<&'a Event> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return events.iter().collect();
    }
    events
        .iter()
        .filter(|event| {
            event.title.to_lowercase().contains(&needle)
                || event.category.key().contains(&needle)
                || event.venue.city.to_lowercase().contains(&needle)
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{EventId, GroupBookingPolicy, OrganizerId, TicketTier, Venue};
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).single().unwrap()
    }

    fn event(id: u64, title: &str, category: Category, city: &str, dollars: u64, day: i64) -> Event {
        let starts_at = start() + Duration::days(day);
        Event {
            id: EventId::new(id),
            title: title.to_string(),
            category,
            description: String::new(),
            starts_at,
            ends_at: starts_at + Duration::hours(3),
            venue: Venue {
                name: format!("{city} Convention Center"),
                address: format!("123 Main St, {city}"),
                city: city.to_string(),
                state: "State".to_string(),
            },
            price: Money::from_dollars(dollars),
            tiers: vec![TicketTier::new("General Admission", Money::from_dollars(dollars), 100)],
            vendors: vec![],
            group_booking: GroupBookingPolicy::default(),
            organizer: OrganizerId::new(1),
            attendees: 0,
        }
    }

    fn catalogue() -> Vec<Event> {
        vec![
            event(1, "Jazz Night", Category::Music, "Chicago", 30, 0),
            event(2, "Startup Pitch", Category::Business, "San Francisco", 80, 5),
            event(3, "Rock Festival", Category::Music, "Los Angeles", 120, 10),
            event(4, "Chicago Food Fair", Category::Food, "Chicago", 15, 20),
        ]
    }

    fn ids(events: &[&Event]) -> Vec<u64> {
        events.iter().map(|event| event.id.value()).collect()
    }

    #[test]
    fn test_empty_filter_matches_everything_in_order() {
        let events = catalogue();
        assert_eq!(ids(&EventFilter::new().apply(&events)), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_category_and_location() {
        let events = catalogue();
        let filter = EventFilter::new().category(Category::Music).location("chi");
        assert_eq!(ids(&filter.apply(&events)), vec![1]);

        let filter = EventFilter::new().location("  ");
        assert_eq!(filter.apply(&events).len(), 4);
    }

    #[test]
    fn test_price_bounds_are_inclusive() {
        let events = catalogue();
        let filter = EventFilter::new()
            .price_between(Some(Money::from_dollars(30)), Some(Money::from_dollars(120)));
        assert_eq!(ids(&filter.apply(&events)), vec![1, 2, 3]);

        let filter = EventFilter::new().price_between(None, Some(Money::from_dollars(29)));
        assert_eq!(ids(&filter.apply(&events)), vec![4]);
    }

    #[test]
    fn test_date_window_is_inclusive() {
        let events = catalogue();
        let filter = EventFilter::new().starting_between(
            Some(start() + Duration::days(5)),
            Some(start() + Duration::days(10)),
        );
        assert_eq!(ids(&filter.apply(&events)), vec![2, 3]);
    }

    #[test]
    fn test_search_title_category_city() {
        let events = catalogue();
        assert_eq!(ids(&search(&events, "chicago")), vec![1, 4]);
        assert_eq!(ids(&search(&events, "MUSIC")), vec![1, 3]);
        assert_eq!(ids(&search(&events, "pitch")), vec![2]);
        assert_eq!(ids(&search(&events, "")), vec![1, 2, 3, 4]);
        assert!(search(&events, "opera").is_empty());
    }
}
