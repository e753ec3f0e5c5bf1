//! Common test utilities for database-backed integration tests
//!
//! Spins up an isolated PostgreSQL container per test with the prices schema
//! applied, so tests need no pre-provisioned database.
//!
//! # Example
//!
//! ```rust,ignore
//! mod common;
//! use common::TestPostgres;
//!
//! #[tokio::test]
//! #[ignore = "requires Docker"]
//! async fn test_with_postgres() {
//!     let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");
//!     sqlx::query("SELECT 1").execute(pg.pool()).await.expect("Query failed");
//! }
//! ```

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use testcontainers::{core::IntoContainerPort, runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::postgres::Postgres;

/// PostgreSQL test container wrapper
///
/// The container lives as long as this value; dropping it tears the database
/// down.
pub struct TestPostgres {
    _container: ContainerAsync<Postgres>,
    pool: PgPool,
}

impl TestPostgres {
    /// Start a new PostgreSQL container with the prices schema applied.
    pub async fn start() -> Result<Self> {
        let container = Postgres::default()
            .start()
            .await
            .context("Failed to start PostgreSQL container")?;

        let host = container
            .get_host()
            .await
            .context("Failed to get container host")?;
        let port = container
            .get_host_port_ipv4(5432.tcp())
            .await
            .context("Failed to get container port")?;

        let connection_string =
            format!("postgresql://postgres:postgres@{}:{}/postgres", host, port);

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&connection_string)
            .await
            .context("Failed to connect to PostgreSQL")?;

        prices_server::db::migrate(&pool)
            .await
            .context("Failed to apply schema")?;

        Ok(Self {
            _container: container,
            pool,
        })
    }

    /// Get a reference to the database pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get a clone of the database pool
    pub fn pool_clone(&self) -> PgPool {
        self.pool.clone()
    }
}
