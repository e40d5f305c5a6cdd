//! Transaction log store
//!
//! Append-only ledger rows. Appends happen inside the caller's transaction,
//! so a batch becomes visible as a whole or not at all; no row is ever
//! updated after commit.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{Direction, Entry, EntryStatus, EntryType, NewEntry};

/// Append a batch of ledger entries in the caller's transaction, returning
/// the generated ids in input order. All rows commit together or none do.
pub async fn append_batch(
    tx: &mut Transaction<'_, Postgres>,
    entries: &[NewEntry],
) -> Result<Vec<Uuid>, sqlx::Error> {
    let mut ids = Vec::with_capacity(entries.len());

    for entry in entries {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO transactions (
                id, account_id, entry_type, direction, counterparty_email,
                amount, description, occurred_at, balance_after, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.account_id)
        .bind(entry.entry_type.as_str())
        .bind(entry.direction.as_str())
        .bind(&entry.counterparty_email)
        .bind(entry.amount)
        .bind(&entry.description)
        .bind(entry.occurred_at)
        .bind(entry.balance_after)
        .bind(entry.status.as_str())
        .fetch_one(&mut **tx)
        .await?;

        ids.push(id);
    }

    Ok(ids)
}

const ENTRY_COLUMNS: &str = r#"
    SELECT id, account_id, entry_type, direction, counterparty_email,
           amount, description, occurred_at, balance_after, status,
           reference, fee, metadata
    FROM transactions
"#;

type EntryRow = (
    Uuid,
    Uuid,
    String,
    String,
    Option<String>,
    Decimal,
    Option<String>,
    DateTime<Utc>,
    Decimal,
    String,
    Option<String>,
    Option<Decimal>,
    Option<serde_json::Value>,
);

fn entry_from_row(row: EntryRow) -> Result<Entry, sqlx::Error> {
    let (
        id,
        account_id,
        entry_type,
        direction,
        counterparty_email,
        amount,
        description,
        occurred_at,
        balance_after,
        status,
        reference,
        fee,
        metadata,
    ) = row;

    Ok(Entry {
        id,
        account_id,
        entry_type: entry_type
            .parse::<EntryType>()
            .map_err(|e| sqlx::Error::Decode(e.into()))?,
        direction: direction
            .parse::<Direction>()
            .map_err(|e| sqlx::Error::Decode(e.into()))?,
        counterparty_email,
        amount,
        description,
        occurred_at,
        balance_after,
        status: status
            .parse::<EntryStatus>()
            .map_err(|e| sqlx::Error::Decode(e.into()))?,
        reference,
        fee,
        metadata,
    })
}

/// List an account's entries newest-first with the total count for
/// pagination.
pub async fn list_by_account(
    pool: &PgPool,
    account_id: Uuid,
    offset: i64,
    limit: i64,
) -> Result<(Vec<Entry>, i64), sqlx::Error> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE account_id = $1")
        .bind(account_id)
        .fetch_one(pool)
        .await?;

    let rows: Vec<EntryRow> = sqlx::query_as(&format!(
        "{ENTRY_COLUMNS} WHERE account_id = $1 ORDER BY occurred_at DESC, id DESC LIMIT $2 OFFSET $3"
    ))
    .bind(account_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let entries = rows
        .into_iter()
        .map(entry_from_row)
        .collect::<Result<Vec<_>, _>>()?;

    Ok((entries, total))
}

/// Fetch a single entry scoped to its owning account. An entry id alone
/// never resolves another account's record.
pub async fn find_for_account(
    pool: &PgPool,
    entry_id: Uuid,
    account_id: Uuid,
) -> Result<Option<Entry>, sqlx::Error> {
    let row: Option<EntryRow> =
        sqlx::query_as(&format!("{ENTRY_COLUMNS} WHERE id = $1 AND account_id = $2"))
            .bind(entry_id)
            .bind(account_id)
            .fetch_optional(pool)
            .await?;

    row.map(entry_from_row).transpose()
}
