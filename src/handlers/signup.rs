//! Signup Handler
//!
//! Opens a user and their account with the configured opening balance in
//! one transaction, and owns the email-verification lifecycle.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{hash_password, hash_verification_token, new_verification_token};
use crate::domain::{normalize_email, Currency, VerificationStatus};
use crate::error::AppError;
use crate::store::{accounts, users};

const MIN_PASSWORD_CHARS: usize = 8;

/// Command to open a new user and account
#[derive(Debug, Clone)]
pub struct SignupCommand {
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

/// Result of a successful signup. The raw verification token is returned to
/// the caller for link construction; only its hash was persisted.
#[derive(Debug, Clone)]
pub struct SignupResult {
    pub user_id: Uuid,
    pub account_id: Uuid,
    pub email: String,
    pub verification_token: String,
}

/// Handler for account opening
pub struct SignupHandler {
    pool: PgPool,
    opening_balance: Decimal,
    currency: Currency,
}

impl SignupHandler {
    pub fn new(pool: PgPool, opening_balance: Decimal, currency: Currency) -> Self {
        Self {
            pool,
            opening_balance,
            currency,
        }
    }

    /// Execute the signup command.
    ///
    /// The user row and the account row commit together; a crash between
    /// the two cannot leave a user without an account.
    pub async fn execute(&self, command: SignupCommand) -> Result<SignupResult, AppError> {
        let email = normalize_email(&command.email);
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::Validation("Invalid email format".to_string()));
        }
        if command.password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AppError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_CHARS} characters"
            )));
        }

        let password_hash = hash_password(&command.password)?;
        let verification = new_verification_token();
        let now = Utc::now();

        let new_user = users::NewUser {
            email: email.clone(),
            password_hash,
            first_name: command.first_name,
            last_name: command.last_name,
            phone: command.phone,
            verification_status: VerificationStatus::Pending,
            verification_token_hash: Some(verification.token_hash.clone()),
            verification_expires_at: Some(verification.expires_at),
        };

        let mut tx = self.pool.begin().await?;

        let user_id = users::insert(&mut tx, &new_user, now)
            .await
            .map_err(unique_email_conflict)?;

        let account_id =
            accounts::open_account(&mut tx, user_id, self.opening_balance, self.currency, now)
                .await?;

        tx.commit().await?;

        tracing::info!(%user_id, %account_id, "Account opened");

        Ok(SignupResult {
            user_id,
            account_id,
            email,
            verification_token: verification.token,
        })
    }

    /// Verify an email by its raw token: look up the stored hash, check the
    /// deadline, and flip the user to ACTIVE.
    pub async fn verify_email(&self, raw_token: &str) -> Result<Uuid, AppError> {
        let token_hash = hash_verification_token(raw_token);

        let (user_id, expires_at) =
            users::find_by_verification_token_hash(&self.pool, &token_hash)
                .await?
                .ok_or_else(|| {
                    AppError::InvalidVerificationToken("Invalid verification token".to_string())
                })?;

        match expires_at {
            Some(deadline) if deadline > Utc::now() => {}
            _ => {
                return Err(AppError::InvalidVerificationToken(
                    "Verification token expired".to_string(),
                ));
            }
        }

        users::mark_verified(&self.pool, user_id, Utc::now()).await?;

        tracing::info!(%user_id, "Email verified");

        Ok(user_id)
    }
}

/// The unique index on users.email turns a duplicate signup into a typed
/// conflict instead of a 500.
fn unique_email_conflict(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::DuplicateEmail,
        _ => AppError::Database(err),
    }
}
