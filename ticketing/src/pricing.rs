//! Pricing of ticket selections.
//!
//! ```text
//! subtotal      = Σ tier.price × qty
//! total_tickets = Σ qty
//! discount      = subtotal × percent / 100   (group policy met)
//! total         = subtotal − discount
//! ```
//!
//! Pricing is pure: it reads an [`Event`] and never changes it.

use crate::error::{LedgerError, Result};
use crate::types::{Event, Money};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Requested quantity per tier index
///
/// Zero quantities are kept out of the map, so an empty selection and a
/// selection of all zeros are the same value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    quantities: BTreeMap<usize, u32>,
}

impl Selection {
    /// Empty selection
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Selection::set`]
    #[must_use]
    pub fn with(mut self, tier_index: usize, quantity: u32) -> Self {
        self.set(tier_index, quantity);
        self
    }

    /// Sets the quantity for a tier; zero removes it
    pub fn set(&mut self, tier_index: usize, quantity: u32) {
        if quantity == 0 {
            self.quantities.remove(&tier_index);
        } else {
            self.quantities.insert(tier_index, quantity);
        }
    }

    /// Quantity requested for a tier
    #[must_use]
    pub fn quantity(&self, tier_index: usize) -> u32 {
        self.quantities.get(&tier_index).copied().unwrap_or(0)
    }

    /// True when no tickets are requested
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quantities.is_empty()
    }

    /// Non-zero `(tier_index, quantity)` pairs in tier order
    pub fn iter(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.quantities.iter().map(|(&tier, &qty)| (tier, qty))
    }

    /// Total tickets requested, `None` on overflow
    #[must_use]
    pub fn total_tickets(&self) -> Option<u32> {
        self.quantities
            .values()
            .try_fold(0u32, |acc, &qty| acc.checked_add(qty))
    }
}

impl FromIterator<(usize, u32)> for Selection {
    fn from_iter<I: IntoIterator<Item = (usize, u32)>>(iter: I) -> Self {
        let mut selection = Self::new();
        for (tier, qty) in iter {
            selection.set(tier, qty);
        }
        selection
    }
}

/// Priced selection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Before discount
    pub subtotal: Money,
    /// Group discount
    pub discount: Money,
    /// Amount payable
    pub total: Money,
    /// Tickets in the selection
    pub total_tickets: u32,
}

impl Quote {
    /// Whether the group discount was applied
    #[must_use]
    pub const fn has_discount(&self) -> bool {
        !self.discount.is_zero()
    }
}

/// Prices `selection` against `event`.
///
/// An empty selection prices to zero.
///
/// # Errors
///
/// - [`LedgerError::Validation`] when the selection names a tier the event
///   does not have
/// - [`LedgerError::Overflow`] when an amount does not fit
pub fn quote(event: &Event, selection: &Selection) -> Result<Quote> {
    let mut subtotal = Money::ZERO;
    let mut total_tickets = 0u32;

    for (tier_index, qty) in selection.iter() {
        let tier = event.tiers.get(tier_index).ok_or_else(|| {
            LedgerError::validation(format!(
                "event {} has no ticket tier {tier_index}",
                event.id
            ))
        })?;
        let line = tier.price.checked_multiply(qty).ok_or(LedgerError::Overflow)?;
        subtotal = subtotal.checked_add(line).ok_or(LedgerError::Overflow)?;
        total_tickets = total_tickets.checked_add(qty).ok_or(LedgerError::Overflow)?;
    }

    let policy = event.group_booking;
    let discount = if policy.applies_to(total_tickets) {
        subtotal
            .checked_percentage(policy.discount_percent)
            .ok_or(LedgerError::Overflow)?
    } else {
        Money::ZERO
    };
    let total = subtotal.checked_sub(discount).ok_or(LedgerError::Overflow)?;

    Ok(Quote {
        subtotal,
        discount,
        total,
        total_tickets,
    })
}
