//! Database connection management

pub mod schema;

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use thiserror::Error;

/// Store-level failures shared by the ledger and transaction stores.
/// Driver errors never leave this type unwrapped.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Timed out waiting for lock on account {0}")]
    LockTimeout(u64),

    #[error("Row already exists")]
    AlreadyExists,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Transaction already finished")]
    Finished,
}

/// PostgreSQL database connection pool
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(50)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        tracing::info!("PostgreSQL connection pool established");
        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Apply idempotent DDL statements (one per entry)
    pub async fn init_schema(&self, statements: &[&str]) -> Result<(), sqlx::Error> {
        for statement in statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::info!(statements = statements.len(), "Schema initialized");
        Ok(())
    }
}

/// SQLSTATE raised by PostgreSQL when `lock_timeout` expires
pub const LOCK_NOT_AVAILABLE: &str = "55P03";

/// SQLSTATE for unique constraint violations
pub const UNIQUE_VIOLATION: &str = "23505";

/// Extract the SQLSTATE of a database error, if any
pub fn sqlstate(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().map(|c| c.into_owned()),
        _ => None,
    }
}
