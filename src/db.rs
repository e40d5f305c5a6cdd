//! Database module
//!
//! Startup schema verification and optional demo seeding.
//! Schema itself lives in raw SQL files under migrations/.

use chrono::Utc;
use sqlx::PgPool;

use crate::auth::hash_password;
use crate::config::Config;
use crate::domain::{normalize_email, VerificationStatus};
use crate::error::AppError;
use crate::store::{accounts, users};

/// Simple connectivity check
pub async fn verify_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;

    Ok(())
}

/// Check if required tables exist
pub async fn check_schema(pool: &PgPool) -> Result<bool, sqlx::Error> {
    let required_tables = ["users", "accounts", "transactions"];

    for table in required_tables {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )
            "#,
        )
        .bind(table)
        .fetch_one(pool)
        .await?;

        if !exists {
            tracing::error!("Required table '{}' does not exist", table);
            return Ok(false);
        }
    }

    Ok(true)
}

/// Demo users created when SEED_DB is enabled. All share the password
/// "12345678" and start verified.
const DEMO_USERS: &[(&str, &str)] = &[
    ("user1@test.com", "0523881275"),
    ("user2@test.com", "0523901275"),
    ("user3@test.com", "0523572751"),
];

/// Seed demo users with opened accounts. Existing emails are left alone, so
/// the seed is safe to run on every startup.
pub async fn seed_demo_users(pool: &PgPool, config: &Config) -> Result<(), AppError> {
    for (email, phone) in DEMO_USERS {
        let email = normalize_email(email);
        if users::email_exists(pool, &email).await? {
            continue;
        }

        let now = Utc::now();
        let new_user = users::NewUser {
            email: email.clone(),
            password_hash: hash_password("12345678")?,
            first_name: None,
            last_name: None,
            phone: Some((*phone).to_string()),
            verification_status: VerificationStatus::Active,
            verification_token_hash: None,
            verification_expires_at: None,
        };

        let mut tx = pool.begin().await?;
        let user_id = users::insert(&mut tx, &new_user, now).await?;
        accounts::open_account(
            &mut tx,
            user_id,
            config.opening_balance,
            config.opening_currency,
            now,
        )
        .await?;
        tx.commit().await?;

        tracing::info!(%email, "Seeded demo user");
    }

    tracing::info!("DB seed completed");
    Ok(())
}
