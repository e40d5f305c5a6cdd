//! Account lifecycle handlers
//!
//! Signup (account opening), email verification, and login. Each handler
//! coordinates the stores and the auth primitives; transfers live in the
//! `transfer` module.

mod login;
mod signup;

pub use login::{LoginCommand, LoginHandler, LoginResult};
pub use signup::{SignupCommand, SignupHandler, SignupResult};
