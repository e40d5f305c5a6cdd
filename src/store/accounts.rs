//! Account ledger store
//!
//! Balances are mutated exclusively through [`adjust_balance`], a single
//! guarded UPDATE evaluated atomically by Postgres. Any other code path that
//! reads a balance and writes it back is a concurrency bug by definition.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgExecutor, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{Account, AccountStatus, Currency};

/// Guard predicate applied atomically with a balance adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceGuard {
    /// Apply only if the resulting balance stays non-negative (debits)
    NonNegative,
    /// Apply unconditionally (credits)
    Always,
}

/// Snapshot returned by a successful adjustment, captured by the same
/// statement that performed the mutation.
#[derive(Debug, Clone)]
pub struct BalanceAfter {
    pub balance: Decimal,
    /// Owner's email, for the counterparty field of the paired ledger entry
    pub email: String,
}

/// Atomically adjust an account balance by `delta` if the guard holds.
///
/// Returns `None` when no row matched: the account is absent, or the guard
/// rejected the adjustment. The two causes are indistinguishable here on
/// purpose; callers that need to tell them apart follow up with [`exists`].
pub async fn adjust_balance(
    tx: &mut Transaction<'_, Postgres>,
    account_id: Uuid,
    delta: Decimal,
    guard: BalanceGuard,
    now: DateTime<Utc>,
) -> Result<Option<BalanceAfter>, sqlx::Error> {
    let sql = match guard {
        BalanceGuard::NonNegative => {
            r#"
            UPDATE accounts
            SET balance = accounts.balance + $2, updated_at = $3
            FROM users
            WHERE accounts.id = $1
              AND users.id = accounts.user_id
              AND accounts.balance + $2 >= 0
            RETURNING accounts.balance, users.email
            "#
        }
        BalanceGuard::Always => {
            r#"
            UPDATE accounts
            SET balance = accounts.balance + $2, updated_at = $3
            FROM users
            WHERE accounts.id = $1
              AND users.id = accounts.user_id
            RETURNING accounts.balance, users.email
            "#
        }
    };

    let row: Option<(Decimal, String)> = sqlx::query_as(sql)
        .bind(account_id)
        .bind(delta)
        .bind(now)
        .fetch_optional(&mut **tx)
        .await?;

    Ok(row.map(|(balance, email)| BalanceAfter { balance, email }))
}

/// Diagnostic existence check, used only to classify a failed guarded
/// adjustment. Never a precondition for retrying the mutation.
pub async fn exists(
    tx: &mut Transaction<'_, Postgres>,
    account_id: Uuid,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM accounts WHERE id = $1)")
        .bind(account_id)
        .fetch_one(&mut **tx)
        .await
}

const ACCOUNT_COLUMNS: &str = r#"
    SELECT a.id, a.user_id, u.email, a.balance, a.currency, a.status,
           a.created_at, a.updated_at
    FROM accounts a
    JOIN users u ON u.id = a.user_id
"#;

type AccountRow = (
    Uuid,
    Uuid,
    String,
    Decimal,
    String,
    String,
    DateTime<Utc>,
    DateTime<Utc>,
);

fn account_from_row(row: AccountRow) -> Result<Account, sqlx::Error> {
    let (id, user_id, email, balance, currency, status, created_at, updated_at) = row;
    Ok(Account {
        id,
        user_id,
        email,
        balance,
        currency: currency
            .parse::<Currency>()
            .map_err(|e| sqlx::Error::Decode(e.into()))?,
        status: status
            .parse::<AccountStatus>()
            .map_err(|e| sqlx::Error::Decode(e.into()))?,
        created_at,
        updated_at,
    })
}

/// Look up an account by its owner's normalized email, inside the caller's
/// transaction so the transfer's recipient resolution observes the same
/// snapshot as its mutations.
pub async fn find_by_email(
    tx: &mut Transaction<'_, Postgres>,
    email: &str,
) -> Result<Option<Account>, sqlx::Error> {
    let row: Option<AccountRow> =
        sqlx::query_as(&format!("{ACCOUNT_COLUMNS} WHERE u.email = $1"))
            .bind(email)
            .fetch_optional(&mut **tx)
            .await?;

    row.map(account_from_row).transpose()
}

pub async fn find_by_id(
    exec: impl PgExecutor<'_>,
    account_id: Uuid,
) -> Result<Option<Account>, sqlx::Error> {
    let row: Option<AccountRow> = sqlx::query_as(&format!("{ACCOUNT_COLUMNS} WHERE a.id = $1"))
        .bind(account_id)
        .fetch_optional(exec)
        .await?;

    row.map(account_from_row).transpose()
}

/// Resolve the account owned by a user. The API layer uses this to turn an
/// authenticated user id into the sender account id.
pub async fn find_by_user_id(
    exec: impl PgExecutor<'_>,
    user_id: Uuid,
) -> Result<Option<Account>, sqlx::Error> {
    let row: Option<AccountRow> =
        sqlx::query_as(&format!("{ACCOUNT_COLUMNS} WHERE a.user_id = $1"))
            .bind(user_id)
            .fetch_optional(exec)
            .await?;

    row.map(account_from_row).transpose()
}

/// Open a new account with its opening balance, inside the signup
/// transaction.
pub async fn open_account(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    opening_balance: Decimal,
    currency: Currency,
    now: DateTime<Utc>,
) -> Result<Uuid, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO accounts (id, user_id, balance, currency, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $6)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(opening_balance)
    .bind(currency.as_str())
    .bind(AccountStatus::Active.as_str())
    .bind(now)
    .fetch_one(&mut **tx)
    .await
}
