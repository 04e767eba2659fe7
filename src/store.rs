//! BulkStore - Main entry point for PostgreSQL bulk operations
//!
//! Binds the generic [`BulkExecutor`] to a sqlx pool and the COPY protocol.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::BulkConfig;
use crate::error::{BulkError, Result};
use crate::executor::BulkExecutor;
use crate::postgres::{PgConnectionScope, PgCopyProtocol};

/// Bulk executor over a PostgreSQL pool
pub type BulkStore = BulkExecutor<PgConnectionScope, PgCopyProtocol>;

impl BulkStore {
    /// Create a new BulkStore from configuration
    pub async fn connect(config: BulkConfig) -> Result<Self> {
        let pool = PgPool::connect(&config.database_url)
            .await
            .map_err(|e| BulkError::Connection(format!("Database connection failed: {}", e)))?;

        Ok(Self::from_pool(pool, config))
    }

    /// Create a new BulkStore from an existing pool
    ///
    /// Use this when you already have a connection pool and want to
    /// share it with the bulk store.
    pub fn from_pool(pool: PgPool, config: BulkConfig) -> Self {
        BulkExecutor::new(
            Arc::new(PgConnectionScope::new(pool)),
            PgCopyProtocol,
            config,
        )
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        self.scope().pool()
    }
}
