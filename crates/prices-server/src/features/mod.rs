//! Feature modules implementing the Prices API
//!
//! Each feature is a vertical slice with its own commands (writes), queries
//! (reads), and routes, following a CQRS-style separation.

pub mod prices;

use axum::Router;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// PostgreSQL connection pool for database operations
    pub db: sqlx::PgPool,
    /// Upper bound for uploaded archive bodies, in bytes
    pub max_upload_bytes: usize,
}

/// Creates the main API router with all feature routes mounted
pub fn router(state: FeatureState) -> Router<()> {
    Router::new().nest("/prices", prices::prices_routes().with_state(state))
}
