//! Storage layer
//!
//! Thin data-access modules over Postgres. Mutating primitives take an open
//! transaction so the caller controls the unit of work; read-path queries
//! run against the pool and observe committed state only.

pub mod accounts;
pub mod transactions;
pub mod users;

pub use accounts::{BalanceAfter, BalanceGuard};
