//! Transfer Coordinator
//!
//! Executes one transfer inside a single Postgres transaction: conditional
//! debit, recipient resolution, credit, and the paired ledger appends either
//! all commit or none do. Concurrency safety is delegated entirely to the
//! store's guarded-update primitive and row locking; no in-process lock is
//! held across I/O.

use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{
    normalize_email, truncate_description, Amount, Direction, EntryStatus, EntryType, NewEntry,
};
use crate::error::AppError;
use crate::store::{accounts, transactions, BalanceGuard};

use super::{TransferCommand, TransferOutcome};

const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5_000);
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Coordinator for atomic fund transfers
pub struct TransferCoordinator {
    pool: PgPool,
    timeout: Duration,
    max_retries: u32,
}

impl TransferCoordinator {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_limits(pool: PgPool, timeout: Duration, max_retries: u32) -> Self {
        Self {
            pool,
            timeout,
            max_retries: max_retries.max(1),
        }
    }

    /// Execute the transfer command.
    ///
    /// Transient store failures retry the whole unit of work from the debit;
    /// individual steps are never retried in isolation. On timeout the
    /// in-flight transaction is dropped, which rolls it back.
    pub async fn execute(&self, command: TransferCommand) -> Result<TransferOutcome, AppError> {
        // Defense-in-depth: the HTTP layer validates too, but the coordinator
        // re-checks before any storage is touched.
        let amount: Amount = command.amount.parse()?;

        let recipient_email = normalize_email(&command.recipient_email);
        if recipient_email.is_empty() || !recipient_email.contains('@') {
            return Err(AppError::Validation("Invalid recipient email".to_string()));
        }

        let description = command
            .description
            .as_deref()
            .map(truncate_description)
            .filter(|d| !d.is_empty());

        for attempt in 0..self.max_retries {
            let result = tokio::time::timeout(
                self.timeout,
                self.try_transfer(
                    command.sender_account_id,
                    &recipient_email,
                    &amount,
                    description.as_deref(),
                ),
            )
            .await;

            match result {
                Err(_elapsed) => {
                    return Err(AppError::StoreUnavailable(format!(
                        "transfer timed out after {}ms",
                        self.timeout.as_millis()
                    )));
                }
                Ok(Ok(outcome)) => return Ok(outcome),
                Ok(Err(AppError::StoreUnavailable(reason))) if attempt + 1 < self.max_retries => {
                    let delay = Duration::from_millis(50 * (attempt as u64 + 1));
                    tracing::warn!(
                        reason = %reason,
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        "Transient store error, retrying transfer"
                    );
                    tokio::time::sleep(delay).await;
                }
                Ok(Err(e)) => return Err(e),
            }
        }

        Err(AppError::StoreUnavailable(
            "transfer retries exhausted".to_string(),
        ))
    }

    /// One attempt at the unit of work. Returning early with an error drops
    /// the transaction, which rolls back every effect so far.
    async fn try_transfer(
        &self,
        sender_account_id: Uuid,
        recipient_email: &str,
        amount: &Amount,
        description: Option<&str>,
    ) -> Result<TransferOutcome, AppError> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        // One timestamp for the whole transfer; both ledger entries share it.
        let now = Utc::now();

        // 1) Conditional debit: exists + sufficient balance, checked and
        //    applied by one guarded UPDATE.
        let sender = accounts::adjust_balance(
            &mut tx,
            sender_account_id,
            -amount.value(),
            BalanceGuard::NonNegative,
            now,
        )
        .await
        .map_err(store_error)?;

        let sender = match sender {
            Some(after) => after,
            None => {
                // Diagnostic lookup only: classifies the no-match, never
                // re-drives the debit.
                return if accounts::exists(&mut tx, sender_account_id)
                    .await
                    .map_err(store_error)?
                {
                    Err(AppError::InsufficientFunds)
                } else {
                    Err(AppError::SenderNotFound)
                };
            }
        };

        // 2) Recipient resolution by normalized email
        let recipient = accounts::find_by_email(&mut tx, recipient_email)
            .await
            .map_err(store_error)?
            .ok_or(AppError::RecipientNotFound)?;

        // 3) Credit: no balance precondition. A no-match here means the row
        //    vanished mid-transaction, which is a storage anomaly.
        let recipient_after = accounts::adjust_balance(
            &mut tx,
            recipient.id,
            amount.value(),
            BalanceGuard::Always,
            now,
        )
        .await
        .map_err(store_error)?
        .ok_or_else(|| {
            tracing::error!(
                recipient_account_id = %recipient.id,
                "Credit matched no row after recipient was resolved"
            );
            AppError::CreditFailed
        })?;

        // 4) Ledger append: one entry per party, carrying the balance
        //    snapshots captured by the mutations above.
        let entries = [
            NewEntry {
                account_id: sender_account_id,
                entry_type: EntryType::Transfer,
                direction: Direction::Out,
                counterparty_email: Some(recipient.email.clone()),
                amount: amount.value(),
                description: description.map(str::to_string),
                occurred_at: now,
                balance_after: sender.balance,
                status: EntryStatus::Completed,
            },
            NewEntry {
                account_id: recipient.id,
                entry_type: EntryType::Transfer,
                direction: Direction::In,
                counterparty_email: Some(sender.email.clone()),
                amount: amount.value(),
                description: description.map(str::to_string),
                occurred_at: now,
                balance_after: recipient_after.balance,
                status: EntryStatus::Completed,
            },
        ];

        let ids = transactions::append_batch(&mut tx, &entries)
            .await
            .map_err(store_error)?;

        // 5) Commit; before this point nothing is visible to readers.
        tx.commit().await.map_err(store_error)?;

        tracing::debug!(
            sender_account_id = %sender_account_id,
            recipient_account_id = %recipient.id,
            amount = %amount,
            "Transfer committed"
        );

        Ok(TransferOutcome {
            status: EntryStatus::Completed,
            sender_transaction_id: ids[0],
            recipient_transaction_id: ids[1],
            occurred_at: now,
        })
    }
}

/// Map a storage failure into the error taxonomy: retryable transient
/// conditions become `StoreUnavailable`, everything else is fatal.
fn store_error(err: sqlx::Error) -> AppError {
    if is_transient(&err) {
        AppError::StoreUnavailable(err.to_string())
    } else {
        AppError::Database(err)
    }
}

/// Serialization failures, deadlocks, and connection-level faults are safe
/// to retry as a whole unit of work since nothing commits until the end.
fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db) => {
            matches!(db.code().as_deref(), Some("40001") | Some("40P01"))
        }
        _ => false,
    }
}
