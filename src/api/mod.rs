//! API module
//!
//! HTTP surface: routes, middleware, and shared state.

pub mod middleware;
pub mod routes;

pub use routes::create_router;

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        Self {
            pool,
            config: Arc::new(config),
        }
    }
}
