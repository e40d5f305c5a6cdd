//! Login Handler
//!
//! Email/password authentication and access-token issuance.

use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{sign_access_token, verify_password};
use crate::domain::{normalize_email, VerificationStatus};
use crate::error::AppError;
use crate::store::users;

/// Command to authenticate a user
#[derive(Debug, Clone)]
pub struct LoginCommand {
    pub email: String,
    pub password: String,
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginResult {
    pub token: String,
    pub user_id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Handler for authentication
pub struct LoginHandler {
    pool: PgPool,
    jwt_secret: String,
    jwt_ttl_minutes: i64,
}

impl LoginHandler {
    pub fn new(pool: PgPool, jwt_secret: String, jwt_ttl_minutes: i64) -> Self {
        Self {
            pool,
            jwt_secret,
            jwt_ttl_minutes,
        }
    }

    /// Execute the login command.
    ///
    /// Unknown email and wrong password collapse into the same error so the
    /// endpoint cannot be used to enumerate accounts.
    pub async fn execute(&self, command: LoginCommand) -> Result<LoginResult, AppError> {
        let email = normalize_email(&command.email);
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::Validation("Invalid email".to_string()));
        }

        let user = users::find_auth_by_email(&self.pool, &email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(&command.password, &user.password_hash) {
            return Err(AppError::InvalidCredentials);
        }

        match user.verification_status {
            VerificationStatus::Pending => return Err(AppError::EmailNotVerified),
            VerificationStatus::Blocked => return Err(AppError::AccountBlocked),
            VerificationStatus::Active => {}
        }

        let token = sign_access_token(user.id, &user.email, &self.jwt_secret, self.jwt_ttl_minutes)?;

        Ok(LoginResult {
            token,
            user_id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    #[tokio::test]
    async fn test_rejects_malformed_email_before_lookup() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .expect("lazy pool");
        let handler = LoginHandler::new(pool, "secret".to_string(), 60);

        let err = handler
            .execute(LoginCommand {
                email: "nope".to_string(),
                password: "password123".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
