//! Account entity
//!
//! An account is the unit of atomic balance mutation. It is owned by a user
//! and addressed by the owner's email for transfers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Account lifecycle status.
///
/// FROZEN and CLOSED are declared in the schema but the transfer path does
/// not consult them; see DESIGN.md.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountStatus {
    Active,
    Frozen,
    Closed,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "ACTIVE",
            AccountStatus::Frozen => "FROZEN",
            AccountStatus::Closed => "CLOSED",
        }
    }
}

impl FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(AccountStatus::Active),
            "FROZEN" => Ok(AccountStatus::Frozen),
            "CLOSED" => Ok(AccountStatus::Closed),
            other => Err(format!("unknown account status: {other}")),
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported account currencies (passthrough only, no conversion).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Ils,
    Usd,
    Eur,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Ils => "ILS",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ILS" => Ok(Currency::Ils),
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            other => Err(format!("unknown currency: {other}")),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An account as read from storage, joined with its owner's email.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Owner's email, used as the transfer address
    pub email: String,
    pub balance: Decimal,
    pub currency: Currency,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            AccountStatus::Active,
            AccountStatus::Frozen,
            AccountStatus::Closed,
        ] {
            assert_eq!(status.as_str().parse::<AccountStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_status_unknown_rejected() {
        assert!("DORMANT".parse::<AccountStatus>().is_err());
    }

    #[test]
    fn test_currency_round_trip() {
        for currency in [Currency::Ils, Currency::Usd, Currency::Eur] {
            assert_eq!(currency.as_str().parse::<Currency>().unwrap(), currency);
        }
    }

    #[test]
    fn test_currency_serde_uppercase() {
        let json = serde_json::to_string(&Currency::Usd).unwrap();
        assert_eq!(json, "\"USD\"");
    }
}
