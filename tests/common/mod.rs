//! Common test utilities

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use uuid::Uuid;

/// Connect to the test database, apply the schema, and truncate all tables.
/// Returns `None` (and the test skips) when DATABASE_URL is not set.
pub async fn try_setup_test_db() -> Option<PgPool> {
    dotenvy::dotenv().ok();
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("skipping: DATABASE_URL not set");
            return None;
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    pool.execute(include_str!("../../migrations/0001_init.sql"))
        .await
        .expect("Failed to apply schema");

    sqlx::query("TRUNCATE TABLE transactions, accounts, users CASCADE")
        .execute(&pool)
        .await
        .expect("Failed to clean up DB");

    Some(pool)
}

/// Seed a verified user with an opened account and the given balance.
/// The password hash is a placeholder; login flows create their own users
/// through the signup endpoint instead.
pub async fn seed_user(pool: &PgPool, email: &str, balance: Decimal) -> (Uuid, Uuid) {
    let now = Utc::now();
    let user_id = Uuid::new_v4();
    let account_id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO users (id, email, password_hash, verification_status, created_at, updated_at)
        VALUES ($1, $2, 'x', 'ACTIVE', $3, $3)
        "#,
    )
    .bind(user_id)
    .bind(email)
    .bind(now)
    .execute(pool)
    .await
    .expect("Failed to seed user");

    sqlx::query(
        r#"
        INSERT INTO accounts (id, user_id, balance, currency, status, created_at, updated_at)
        VALUES ($1, $2, $3, 'ILS', 'ACTIVE', $4, $4)
        "#,
    )
    .bind(account_id)
    .bind(user_id)
    .bind(balance)
    .bind(now)
    .execute(pool)
    .await
    .expect("Failed to seed account");

    (user_id, account_id)
}

/// Current balance of an account
pub async fn balance_of(pool: &PgPool, account_id: Uuid) -> Decimal {
    sqlx::query_scalar("SELECT balance FROM accounts WHERE id = $1")
        .bind(account_id)
        .fetch_one(pool)
        .await
        .expect("Failed to read balance")
}

/// Number of ledger rows for an account
pub async fn entry_count(pool: &PgPool, account_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE account_id = $1")
        .bind(account_id)
        .fetch_one(pool)
        .await
        .expect("Failed to count entries")
}
