//! Transfer engine
//!
//! The coordinator orchestrates a single fund transfer as one all-or-nothing
//! unit of work against the account and transaction stores.

mod coordinator;

pub use coordinator::TransferCoordinator;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::EntryStatus;

/// A transfer to be executed. The sender account id comes from the
/// authenticated session; it is trusted as-is.
#[derive(Debug, Clone)]
pub struct TransferCommand {
    pub sender_account_id: Uuid,
    /// Transfer address; normalized before any lookup
    pub recipient_email: String,
    /// Amount as text, parsed and validated before storage is touched
    pub amount: String,
    pub description: Option<String>,
}

impl TransferCommand {
    pub fn new(sender_account_id: Uuid, recipient_email: String, amount: String) -> Self {
        Self {
            sender_account_id,
            recipient_email,
            amount,
            description: None,
        }
    }

    pub fn with_description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }
}

/// Result of a committed transfer.
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    pub status: EntryStatus,
    pub sender_transaction_id: Uuid,
    pub recipient_transaction_id: Uuid,
    /// Shared timestamp carried by both ledger entries
    pub occurred_at: DateTime<Utc>,
}
