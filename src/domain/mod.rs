//! Domain module
//!
//! Core domain types shared by the stores, the transfer coordinator, and
//! the API layer.

pub mod account;
pub mod money;
pub mod transaction;
pub mod user;

pub use account::{Account, AccountStatus, Currency};
pub use money::{Amount, AmountError, Balance};
pub use transaction::{
    truncate_description, Direction, Entry, EntryStatus, EntryType, NewEntry,
    MAX_DESCRIPTION_CHARS,
};
pub use user::{Profile, VerificationStatus};

/// Normalize an email for lookup and storage: trimmed and lower-cased.
/// Both the write path and the read path go through this before touching
/// storage, so lookups never diverge on case or whitespace.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn test_normalize_email_empty() {
        assert_eq!(normalize_email("   "), "");
    }
}
