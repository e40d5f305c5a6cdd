//! User entity
//!
//! Identity and authentication state. The balance lives on the user's
//! account, not here.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::account::Currency;

/// Email verification lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerificationStatus {
    Pending,
    Active,
    Blocked,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "PENDING",
            VerificationStatus::Active => "ACTIVE",
            VerificationStatus::Blocked => "BLOCKED",
        }
    }
}

impl FromStr for VerificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(VerificationStatus::Pending),
            "ACTIVE" => Ok(VerificationStatus::Active),
            "BLOCKED" => Ok(VerificationStatus::Blocked),
            other => Err(format!("unknown verification status: {other}")),
        }
    }
}

/// A user's profile joined with their account, as returned by the read path.
/// Password hash and verification token fields are never part of this view.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub balance: Decimal,
    pub currency: Currency,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_status_round_trip() {
        for status in [
            VerificationStatus::Pending,
            VerificationStatus::Active,
            VerificationStatus::Blocked,
        ] {
            assert_eq!(
                status.as_str().parse::<VerificationStatus>().unwrap(),
                status
            );
        }
    }
}
