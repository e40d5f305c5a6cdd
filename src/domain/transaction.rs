//! Ledger entries
//!
//! A transaction is the immutable record of one side of a money movement.
//! Entries are append-only; a reversal is a compensating new entry, never an
//! edit of an existing row.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Descriptions longer than this are truncated, not rejected.
pub const MAX_DESCRIPTION_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryType {
    Credit,
    Debit,
    Transfer,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Credit => "CREDIT",
            EntryType::Debit => "DEBIT",
            EntryType::Transfer => "TRANSFER",
        }
    }
}

impl FromStr for EntryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREDIT" => Ok(EntryType::Credit),
            "DEBIT" => Ok(EntryType::Debit),
            "TRANSFER" => Ok(EntryType::Transfer),
            other => Err(format!("unknown entry type: {other}")),
        }
    }
}

/// Which side of the movement this entry records for its owning account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::In => Direction::Out,
            Direction::Out => Direction::In,
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" => Ok(Direction::In),
            "out" => Ok(Direction::Out),
            other => Err(format!("unknown direction: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryStatus {
    Pending,
    Completed,
    Failed,
    Reversed,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Pending => "PENDING",
            EntryStatus::Completed => "COMPLETED",
            EntryStatus::Failed => "FAILED",
            EntryStatus::Reversed => "REVERSED",
        }
    }
}

impl FromStr for EntryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(EntryStatus::Pending),
            "COMPLETED" => Ok(EntryStatus::Completed),
            "FAILED" => Ok(EntryStatus::Failed),
            "REVERSED" => Ok(EntryStatus::Reversed),
            other => Err(format!("unknown entry status: {other}")),
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A committed ledger entry as read from storage.
#[derive(Debug, Clone, Serialize)]
pub struct Entry {
    pub id: Uuid,
    pub account_id: Uuid,
    pub entry_type: EntryType,
    pub direction: Direction,
    pub counterparty_email: Option<String>,
    pub amount: Decimal,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
    /// Balance of the owning account immediately after this entry
    pub balance_after: Decimal,
    pub status: EntryStatus,
    pub reference: Option<String>,
    pub fee: Option<Decimal>,
    pub metadata: Option<serde_json::Value>,
}

/// An entry to be appended. The fee, reference, and metadata slots exist in
/// the schema but the transfer path leaves them unset.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub account_id: Uuid,
    pub entry_type: EntryType,
    pub direction: Direction,
    pub counterparty_email: Option<String>,
    pub amount: Decimal,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub balance_after: Decimal,
    pub status: EntryStatus,
}

/// Truncate a caller-supplied description to the bounded length.
pub fn truncate_description(description: &str) -> String {
    description.chars().take(MAX_DESCRIPTION_CHARS).collect()
}
