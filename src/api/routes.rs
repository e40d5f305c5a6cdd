//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{Extension, Path, Query, State},
    http::{header, StatusCode},
    middleware,
    response::AppendHeaders,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::domain::{normalize_email, Amount, Entry, Profile};
use crate::error::AppError;
use crate::handlers::{LoginCommand, LoginHandler, SignupCommand, SignupHandler};
use crate::store::{accounts, transactions, users};
use crate::transfer::{TransferCommand, TransferCoordinator};

use super::middleware::{auth_middleware, logging_middleware, AuthUser};
use super::AppState;

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginUser {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: LoginUser,
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    #[serde(default)]
    pub token: Option<String>,
}

/// The amount may arrive as a JSON string or number; numbers are fixed to
/// two decimal places before parsing, strings are parsed as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Text(String),
    Number(f64),
}

impl AmountInput {
    fn into_text(self) -> Result<String, AppError> {
        match self {
            AmountInput::Text(s) => Ok(s),
            AmountInput::Number(n) if n.is_finite() => Ok(format!("{n:.2}")),
            AmountInput::Number(_) => Err(AppError::Validation(
                "Amount must be a finite number".to_string(),
            )),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransferRequest {
    pub recipient_email: String,
    pub amount: AmountInput,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TransferResponse {
    pub status: String,
    pub sender_transaction_id: Uuid,
    pub recipient_transaction_id: Uuid,
    pub recipient_email: String,
    pub amount: Decimal,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub offset: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

const MAX_PAGE_SIZE: i64 = 1000;

#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    pub transactions: Vec<Entry>,
    pub total: i64,
    pub offset: i64,
    pub limit: i64,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router. Auth endpoints are public; everything else goes
/// through the access-token middleware.
pub fn create_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/verify", get(verify_email))
        .route("/auth/logout", post(logout));

    let protected = Router::new()
        .route("/transactions/transfer", post(transfer))
        .route("/transactions", get(list_transactions))
        .route("/transactions/:transaction_id", get(get_transaction))
        .route("/users/me", get(get_me))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}

// =========================================================================
// POST /auth/signup
// =========================================================================

/// Open a user and account with the configured opening balance
async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), AppError> {
    let handler = SignupHandler::new(
        state.pool.clone(),
        state.config.opening_balance,
        state.config.opening_currency,
    );

    let result = handler
        .execute(SignupCommand {
            email: request.email,
            password: request.password,
            first_name: request.first_name,
            last_name: request.last_name,
            phone: request.phone,
        })
        .await?;

    // Email delivery is an external collaborator; in this demo the link only
    // reaches the structured log.
    tracing::info!(
        email = %result.email,
        verify_url = %format!(
            "{}/api/v1/auth/verify?token={}",
            state.config.server_url, result.verification_token
        ),
        "Verification link issued"
    );

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            id: result.user_id,
            email: result.email,
        }),
    ))
}

// =========================================================================
// POST /auth/login
// =========================================================================

/// Authenticate and issue an access token, both in the body and as an
/// HttpOnly session cookie
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let handler = LoginHandler::new(
        state.pool.clone(),
        state.config.jwt_secret.clone(),
        state.config.jwt_ttl_minutes,
    );

    let result = handler
        .execute(LoginCommand {
            email: request.email,
            password: request.password,
        })
        .await?;

    let cookie = session_cookie(&result.token, state.config.jwt_ttl_minutes * 60, state.config.is_production());

    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(LoginResponse {
            token: result.token.clone(),
            user: LoginUser {
                id: result.user_id,
                email: result.email,
                first_name: result.first_name,
                last_name: result.last_name,
            },
        }),
    ))
}

// =========================================================================
// GET /auth/verify
// =========================================================================

/// Verify an email address by its token
async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let token = query
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing token".to_string()))?;

    let handler = SignupHandler::new(
        state.pool.clone(),
        state.config.opening_balance,
        state.config.opening_currency,
    );
    handler.verify_email(&token).await?;

    Ok(Json(json!({ "message": "Email verified" })))
}

// =========================================================================
// POST /auth/logout
// =========================================================================

/// Clear the session cookie
async fn logout(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    let cookie = session_cookie("", 0, state.config.is_production());
    (
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(json!({ "success": true })),
    )
}

fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "accessToken={token}; HttpOnly; Path=/; Max-Age={max_age_secs}; SameSite={}",
        if secure { "None" } else { "Lax" }
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

// =========================================================================
// POST /transactions/transfer
// =========================================================================

/// Transfer money from the authenticated user's account
async fn transfer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(request): Json<TransferRequest>,
) -> Result<(StatusCode, Json<TransferResponse>), AppError> {
    let amount_text = request.amount.into_text()?;
    let amount: Amount = amount_text.parse()?;
    let recipient_email = normalize_email(&request.recipient_email);

    let sender = accounts::find_by_user_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::UserNotFound(auth.user_id.to_string()))?;

    let coordinator = TransferCoordinator::with_limits(
        state.pool.clone(),
        state.config.transfer_timeout,
        state.config.transfer_max_retries,
    );

    let mut command = TransferCommand::new(sender.id, recipient_email.clone(), amount_text);
    if let Some(description) = request.description {
        command = command.with_description(description);
    }

    let outcome = coordinator.execute(command).await?;

    Ok((
        StatusCode::CREATED,
        Json(TransferResponse {
            status: outcome.status.to_string(),
            sender_transaction_id: outcome.sender_transaction_id,
            recipient_transaction_id: outcome.recipient_transaction_id,
            recipient_email,
            amount: amount.value(),
            timestamp: outcome.occurred_at,
        }),
    ))
}

// =========================================================================
// GET /transactions
// =========================================================================

/// List the authenticated user's ledger entries, newest first
async fn list_transactions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<ListQuery>,
) -> Result<Json<TransactionsResponse>, AppError> {
    if query.offset < 0 || query.limit < 1 {
        return Err(AppError::BadRequest("Invalid offset/limit".to_string()));
    }
    let limit = query.limit.min(MAX_PAGE_SIZE);

    let account = accounts::find_by_user_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::UserNotFound(auth.user_id.to_string()))?;

    let (entries, total) =
        transactions::list_by_account(&state.pool, account.id, query.offset, limit).await?;

    Ok(Json(TransactionsResponse {
        transactions: entries,
        total,
        offset: query.offset,
        limit,
    }))
}

// =========================================================================
// GET /transactions/:transaction_id
// =========================================================================

/// Fetch one ledger entry, scoped to the caller's own account
async fn get_transaction(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(transaction_id): Path<Uuid>,
) -> Result<Json<Entry>, AppError> {
    let account = accounts::find_by_user_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::UserNotFound(auth.user_id.to_string()))?;

    let entry = transactions::find_for_account(&state.pool, transaction_id, account.id)
        .await?
        .ok_or(AppError::TransactionNotFound)?;

    Ok(Json(entry))
}

// =========================================================================
// GET /users/me
// =========================================================================

/// The authenticated user's profile with their current balance
async fn get_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Profile>, AppError> {
    let profile = users::find_profile(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::UserNotFound(auth.user_id.to_string()))?;

    Ok(Json(profile))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_request_amount_as_string() {
        let json = r#"{
            "recipient_email": "bob@example.com",
            "amount": "100.50",
            "description": "Rent"
        }"#;

        let request: TransferRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.amount.into_text().unwrap(), "100.50");
        assert_eq!(request.description, Some("Rent".to_string()));
    }

    #[test]
    fn test_transfer_request_amount_as_number() {
        let json = r#"{ "recipient_email": "bob@example.com", "amount": 100.5 }"#;

        let request: TransferRequest = serde_json::from_str(json).unwrap();
        // Numbers are fixed to two decimal places, like the minor unit
        assert_eq!(request.amount.into_text().unwrap(), "100.50");
    }

    #[test]
    fn test_list_query_defaults() {
        let query: ListQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.offset, 0);
        assert_eq!(query.limit, 100);
    }

    #[test]
    fn test_signup_request_optional_fields() {
        let json = r#"{ "email": "a@b.c", "password": "longenough" }"#;
        let request: SignupRequest = serde_json::from_str(json).unwrap();
        assert!(request.first_name.is_none());
        assert!(request.phone.is_none());
    }

    #[test]
    fn test_session_cookie_dev_vs_prod() {
        let dev = session_cookie("tok", 3600, false);
        assert!(dev.contains("SameSite=Lax"));
        assert!(!dev.contains("Secure"));

        let prod = session_cookie("tok", 3600, true);
        assert!(prod.contains("SameSite=None"));
        assert!(prod.contains("Secure"));
    }
}
