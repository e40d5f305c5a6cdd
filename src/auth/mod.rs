//! Authentication primitives
//!
//! Password hashing, JWT access tokens, and email-verification tokens.
//! Business flows that use these live in `handlers`.

pub mod password;
pub mod token;

pub use password::{hash_password, verify_password};
pub use token::{
    hash_verification_token, new_verification_token, sign_access_token, verify_access_token,
    Claims, VerificationToken,
};
