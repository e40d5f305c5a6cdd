//! Users store
//!
//! Identity rows and the profile read. Emails are stored normalized; the
//! unique index on email is the storage-level uniqueness constraint.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{Currency, Profile, VerificationStatus};

/// A user row to be inserted at signup.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub verification_status: VerificationStatus,
    pub verification_token_hash: Option<String>,
    pub verification_expires_at: Option<DateTime<Utc>>,
}

/// The columns login needs; nothing else leaves the store.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub verification_status: VerificationStatus,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    user: &NewUser,
    now: DateTime<Utc>,
) -> Result<Uuid, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO users (
            id, email, password_hash, first_name, last_name, phone,
            verification_status, verification_token_hash, verification_expires_at,
            created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.phone)
    .bind(user.verification_status.as_str())
    .bind(&user.verification_token_hash)
    .bind(user.verification_expires_at)
    .bind(now)
    .fetch_one(&mut **tx)
    .await
}

pub async fn find_auth_by_email(
    exec: impl PgExecutor<'_>,
    email: &str,
) -> Result<Option<AuthUser>, sqlx::Error> {
    let row: Option<(Uuid, String, String, String, Option<String>, Option<String>)> =
        sqlx::query_as(
            r#"
            SELECT id, email, password_hash, verification_status, first_name, last_name
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(exec)
        .await?;

    row.map(
        |(id, email, password_hash, verification_status, first_name, last_name)| {
            Ok(AuthUser {
                id,
                email,
                password_hash,
                verification_status: verification_status
                    .parse::<VerificationStatus>()
                    .map_err(|e| sqlx::Error::Decode(e.into()))?,
                first_name,
                last_name,
            })
        },
    )
    .transpose()
}

/// Look up the user holding an unexpired-or-not verification token hash.
/// Expiry is the caller's call; this returns the stored deadline.
pub async fn find_by_verification_token_hash(
    exec: impl PgExecutor<'_>,
    token_hash: &str,
) -> Result<Option<(Uuid, Option<DateTime<Utc>>)>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT id, verification_expires_at
        FROM users
        WHERE verification_token_hash = $1
        "#,
    )
    .bind(token_hash)
    .fetch_optional(exec)
    .await
}

/// Flip a user to ACTIVE and clear the verification token.
pub async fn mark_verified(
    exec: impl PgExecutor<'_>,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE users
        SET verification_status = $2,
            verification_token_hash = NULL,
            verification_expires_at = NULL,
            updated_at = $3
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .bind(VerificationStatus::Active.as_str())
    .bind(now)
    .execute(exec)
    .await?;

    Ok(())
}

pub async fn email_exists(exec: impl PgExecutor<'_>, email: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
        .bind(email)
        .fetch_one(exec)
        .await
}

/// Profile read: user joined with their account. Password hash and
/// verification token fields are deliberately not selected.
pub async fn find_profile(pool: &PgPool, user_id: Uuid) -> Result<Option<Profile>, sqlx::Error> {
    let row: Option<(
        Uuid,
        String,
        Option<String>,
        Option<String>,
        Option<String>,
        Decimal,
        String,
        String,
        DateTime<Utc>,
        DateTime<Utc>,
    )> = sqlx::query_as(
        r#"
        SELECT u.id, u.email, u.first_name, u.last_name, u.phone,
               a.balance, a.currency, u.verification_status,
               u.created_at, u.updated_at
        FROM users u
        JOIN accounts a ON a.user_id = u.id
        WHERE u.id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    row.map(
        |(
            id,
            email,
            first_name,
            last_name,
            phone,
            balance,
            currency,
            verification_status,
            created_at,
            updated_at,
        )| {
            let status = verification_status
                .parse::<VerificationStatus>()
                .map_err(|e| sqlx::Error::Decode(e.into()))?;
            Ok(Profile {
                id,
                email,
                first_name,
                last_name,
                phone,
                balance,
                currency: currency
                    .parse::<Currency>()
                    .map_err(|e| sqlx::Error::Decode(e.into()))?,
                is_verified: status == VerificationStatus::Active,
                created_at,
                updated_at,
            })
        },
    )
    .transpose()
}
