//! API integration tests
//!
//! Drive the router end-to-end: signup, verification, login, transfers,
//! and the read path. Tests share one database, so they serialize on
//! DB_LOCK.

use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower::util::ServiceExt;

use bankline::api::{self, AppState};
use bankline::domain::Currency;
use bankline::handlers::{SignupCommand, SignupHandler};
use bankline::Config;

mod common;

static DB_LOCK: Mutex<()> = Mutex::const_new(());

fn test_config() -> Config {
    Config {
        database_url: String::new(),
        database_max_connections: 5,
        host: "127.0.0.1".to_string(),
        port: 0,
        environment: "test".to_string(),
        jwt_secret: "integration-test-secret".to_string(),
        jwt_ttl_minutes: 60,
        server_url: "http://localhost:3000".to_string(),
        opening_balance: dec!(800.00),
        opening_currency: Currency::Ils,
        transfer_timeout: Duration::from_millis(5_000),
        transfer_max_retries: 3,
        seed_demo_users: false,
    }
}

fn test_app(pool: sqlx::PgPool) -> Router {
    let state = AppState::new(pool, test_config());
    Router::new().nest("/api/v1", api::create_router(state))
}

async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Sign up through the API and activate the user directly in the database,
/// standing in for the email round-trip.
async fn signup_activated(app: &Router, pool: &sqlx::PgPool, email: &str) -> String {
    let (status, _) = send_json(
        app,
        "POST",
        "/api/v1/auth/signup",
        None,
        Some(json!({ "email": email, "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "signup failed for {email}");

    sqlx::query("UPDATE users SET verification_status = 'ACTIVE' WHERE email = $1")
        .bind(email)
        .execute(pool)
        .await
        .unwrap();

    let (status, body) = send_json(
        app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": email, "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed for {email}");
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_signup_login_transfer_and_read_path() {
    let _guard = DB_LOCK.lock().await;
    let Some(pool) = common::try_setup_test_db().await else {
        return;
    };
    let app = test_app(pool.clone());

    let alice_token = signup_activated(&app, &pool, "alice@example.com").await;
    let _bob_token = signup_activated(&app, &pool, "bob@example.com").await;

    // Transfer 100 from Alice to Bob
    let (status, body) = send_json(
        &app,
        "POST",
        "/api/v1/transactions/transfer",
        Some(&alice_token),
        Some(json!({
            "recipient_email": "bob@example.com",
            "amount": "100.00",
            "description": "Split dinner"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "COMPLETED");
    assert!(body["sender_transaction_id"].is_string());
    assert!(body["recipient_transaction_id"].is_string());

    // Alice's profile shows the opening balance minus the transfer
    let (status, body) = send_json(&app, "GET", "/api/v1/users/me", Some(&alice_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"], "700.00");
    assert_eq!(body["email"], "alice@example.com");
    assert!(body.get("password_hash").is_none());

    // History lists the outgoing entry newest-first
    let (status, body) = send_json(
        &app,
        "GET",
        "/api/v1/transactions?offset=0&limit=10",
        Some(&alice_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["transactions"][0]["direction"], "out");
    assert_eq!(body["transactions"][0]["counterparty_email"], "bob@example.com");
    assert_eq!(body["transactions"][0]["balance_after"], "700.00");

    // Single-entry lookup is scoped to the caller
    let entry_id = body["transactions"][0]["id"].as_str().unwrap().to_string();
    let (status, _) = send_json(
        &app,
        "GET",
        &format!("/api/v1/transactions/{entry_id}"),
        Some(&alice_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_json(
        &app,
        "GET",
        &format!("/api/v1/transactions/{entry_id}"),
        Some(&_bob_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_transfer_error_codes_over_http() {
    let _guard = DB_LOCK.lock().await;
    let Some(pool) = common::try_setup_test_db().await else {
        return;
    };
    let app = test_app(pool.clone());

    let alice_token = signup_activated(&app, &pool, "alice@example.com").await;

    // More than the opening balance
    let (status, body) = send_json(
        &app,
        "POST",
        "/api/v1/transactions/transfer",
        Some(&alice_token),
        Some(json!({ "recipient_email": "alice@example.com", "amount": "100000.00" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "INSUFFICIENT_FUNDS");

    // Unknown recipient
    let (status, body) = send_json(
        &app,
        "POST",
        "/api/v1/transactions/transfer",
        Some(&alice_token),
        Some(json!({ "recipient_email": "ghost@example.com", "amount": "10.00" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "RECIPIENT_NOT_FOUND");

    // Non-positive amount
    let (status, body) = send_json(
        &app,
        "POST",
        "/api/v1/transactions/transfer",
        Some(&alice_token),
        Some(json!({ "recipient_email": "alice@example.com", "amount": "0" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error_code"], "VALIDATION_ERROR");

    // Numeric amounts are accepted too
    let (status, body) = send_json(
        &app,
        "POST",
        "/api/v1/transactions/transfer",
        Some(&alice_token),
        Some(json!({ "recipient_email": "alice@example.com", "amount": 25 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["amount"], "25.00");
}

#[tokio::test]
async fn test_signup_conflicts_and_login_gates() {
    let _guard = DB_LOCK.lock().await;
    let Some(pool) = common::try_setup_test_db().await else {
        return;
    };
    let app = test_app(pool.clone());

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/v1/auth/signup",
        None,
        Some(json!({ "email": "carol@example.com", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Same email again, different case: still a conflict
    let (status, body) = send_json(
        &app,
        "POST",
        "/api/v1/auth/signup",
        None,
        Some(json!({ "email": "Carol@Example.com", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "DUPLICATE_EMAIL");

    // Login before verification is rejected
    let (status, body) = send_json(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": "carol@example.com", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error_code"], "EMAIL_NOT_VERIFIED");

    // Wrong password after activation is a credentials error
    sqlx::query("UPDATE users SET verification_status = 'ACTIVE' WHERE email = 'carol@example.com'")
        .execute(&pool)
        .await
        .unwrap();
    let (status, body) = send_json(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": "carol@example.com", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_email_verification_flow() {
    let _guard = DB_LOCK.lock().await;
    let Some(pool) = common::try_setup_test_db().await else {
        return;
    };
    let app = test_app(pool.clone());

    // Go through the handler to get at the raw token the email would carry
    let handler = SignupHandler::new(pool.clone(), dec!(800.00), Currency::Ils);
    let result = handler
        .execute(SignupCommand {
            email: "dave@example.com".to_string(),
            password: "password123".to_string(),
            first_name: None,
            last_name: None,
            phone: None,
        })
        .await
        .unwrap();

    let (status, _) = send_json(
        &app,
        "GET",
        &format!("/api/v1/auth/verify?token={}", result.verification_token),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Verified users can log in
    let (status, _) = send_json(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": "dave@example.com", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // A bogus token is rejected
    let (status, body) = send_json(
        &app,
        "GET",
        "/api/v1/auth/verify?token=deadbeef",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_protected_routes_require_a_token() {
    let _guard = DB_LOCK.lock().await;
    let Some(pool) = common::try_setup_test_db().await else {
        return;
    };
    let app = test_app(pool.clone());

    let (status, body) = send_json(&app, "GET", "/api/v1/transactions", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "UNAUTHORIZED");

    let (status, _) = send_json(
        &app,
        "GET",
        "/api/v1/users/me",
        Some("not-a-real-token"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_pagination_validation() {
    let _guard = DB_LOCK.lock().await;
    let Some(pool) = common::try_setup_test_db().await else {
        return;
    };
    let app = test_app(pool.clone());

    let token = signup_activated(&app, &pool, "erin@example.com").await;

    let (status, body) = send_json(
        &app,
        "GET",
        "/api/v1/transactions?offset=-1&limit=10",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "BAD_REQUEST");

    let (status, body) = send_json(
        &app,
        "GET",
        "/api/v1/transactions?offset=0&limit=0",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "BAD_REQUEST");
}
