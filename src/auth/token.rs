//! Access tokens and verification tokens
//!
//! JWT access tokens for the session boundary; random single-use tokens,
//! stored only as SHA-256 hashes, for email verification.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::AppError;

/// Verification links expire after this long.
const VERIFICATION_TTL_MINUTES: i64 = 20;

/// JWT claims carried by an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub email: String,
    /// Expiration (UTC timestamp)
    pub exp: i64,
    /// Issued at (UTC timestamp)
    pub iat: i64,
}

/// Sign an access token for a user.
pub fn sign_access_token(
    user_id: Uuid,
    email: &str,
    secret: &str,
    ttl_minutes: i64,
) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp: (now + Duration::minutes(ttl_minutes)).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
}

/// Verify an access token and return its claims. Any failure (bad
/// signature, expired, malformed) collapses to `Unauthorized`.
pub fn verify_access_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized)
}

/// A freshly minted email-verification token. The raw token goes into the
/// verification link; only the hash is persisted.
#[derive(Debug, Clone)]
pub struct VerificationToken {
    pub token: String,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

/// Mint a random verification token (64 hex chars) with its expiry.
pub fn new_verification_token() -> VerificationToken {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let token = hex::encode(bytes);
    let token_hash = hash_verification_token(&token);

    VerificationToken {
        token,
        token_hash,
        expires_at: Utc::now() + Duration::minutes(VERIFICATION_TTL_MINUTES),
    }
}

/// SHA-256 hex digest of a verification token.
pub fn hash_verification_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
