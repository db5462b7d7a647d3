//! Async connection pool for the PostgreSQL adapters.
//!
//! Wraps `diesel-async`'s native bb8 pool; checkout failures map to a
//! small error enum the adapters translate into their port errors.

use std::time::Duration;

use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};

/// Shared connection pool handle.
pub type DbPool = Pool<AsyncPgConnection>;

/// A checked-out connection.
pub type DbConnection<'a> = PooledConnection<'a, AsyncPgConnection>;

/// Errors that can occur during pool operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// Failed to build the connection pool.
    #[error("failed to build connection pool: {message}")]
    Build { message: String },
    /// Failed to check out a connection from the pool.
    #[error("failed to get connection from pool: {message}")]
    Checkout { message: String },
}

impl PoolError {
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build {
            message: message.into(),
        }
    }

    pub fn checkout(message: impl Into<String>) -> Self {
        Self::Checkout {
            message: message.into(),
        }
    }
}

/// Pool construction parameters.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    database_url: String,
    max_size: u32,
    connection_timeout: Duration,
}

impl PoolConfig {
    /// Defaults: 10 connections, 30 second checkout timeout.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_size: 10,
            connection_timeout: Duration::from_secs(30),
        }
    }

    #[must_use]
    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }

    #[must_use]
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Build the pool.
    pub async fn build(self) -> Result<DbPool, PoolError> {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(self.database_url);
        Pool::builder()
            .max_size(self.max_size)
            .connection_timeout(self.connection_timeout)
            .build(manager)
            .await
            .map_err(|err| PoolError::build(err.to_string()))
    }
}

/// Check a connection out of the pool.
pub async fn checkout(pool: &DbPool) -> Result<DbConnection<'_>, PoolError> {
    pool.get()
        .await
        .map_err(|err| PoolError::checkout(err.to_string()))
}
