//! Error types for ledger operations.

use crate::types::{BookingId, EventId, ReminderId};
use thiserror::Error;
use ticketdesk_runtime::StoreError;

/// Result type alias for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Every way a ledger operation can be rejected.
///
/// A rejected operation never changes the ledger.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    // ═══════════════════════════════════════════════════════════
    // Input errors
    // ═══════════════════════════════════════════════════════════

    /// Input failed validation.
    #[error("Validation failed: {0}")]
    Validation(String),

    // ═══════════════════════════════════════════════════════════
    // Lookup errors
    // ═══════════════════════════════════════════════════════════

    /// No event with this id.
    #[error("Event not found: {0}")]
    EventNotFound(EventId),

    /// No booking with this id.
    #[error("Booking not found: {0}")]
    BookingNotFound(BookingId),

    /// No reminder with this id.
    #[error("Reminder not found: {0}")]
    ReminderNotFound(ReminderId),

    // ═══════════════════════════════════════════════════════════
    // Inventory and arithmetic
    // ═══════════════════════════════════════════════════════════

    /// A tier cannot cover the requested quantity.
    #[error("Insufficient inventory for {tier}: requested {requested}, available {available}")]
    InsufficientInventory {
        /// Tier label
        tier: String,
        /// Tickets requested
        requested: u32,
        /// Tickets still available
        available: u32,
    },

    /// Money or quantity arithmetic overflowed.
    #[error("Amount overflow")]
    Overflow,
}

impl LedgerError {
    /// Shorthand for [`LedgerError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// True for the not-found family.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::EventNotFound(_) | Self::BookingNotFound(_) | Self::ReminderNotFound(_)
        )
    }
}

/// Errors surfaced by the [`TicketDesk`](crate::app::TicketDesk) facade.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DeskError {
    /// The ledger rejected the operation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The store is shutting down.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DeskError {
    /// The ledger error, if this is one.
    #[must_use]
    pub const fn as_ledger(&self) -> Option<&LedgerError> {
        match self {
            Self::Ledger(error) => Some(error),
            Self::Store(_) => None,
        }
    }
}
