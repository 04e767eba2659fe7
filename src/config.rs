//! Configuration for bulk operations
//!
//! Provides a builder pattern for configuring the bulk executor.

use serde::{Deserialize, Serialize};

/// Default number of rows encoded per COPY chunk
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Which columns form the primary key of a temp table whose entity declares none
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryKeyFallback {
    /// Every column becomes part of the key
    #[default]
    AllColumns,
    /// No PRIMARY KEY clause is emitted
    None,
}

/// Configuration for the bulk executor
#[derive(Debug, Clone)]
pub struct BulkConfig {
    /// PostgreSQL database URL
    pub database_url: String,
    /// Rows per COPY chunk when an insert does not specify one
    pub default_batch_size: usize,
    /// Key policy for temp tables without a declared primary key
    pub primary_key_fallback: PrimaryKeyFallback,
}

impl BulkConfig {
    /// Create a new configuration builder
    pub fn builder(database_url: impl Into<String>) -> BulkConfigBuilder {
        BulkConfigBuilder::new(database_url)
    }
}

/// Builder for BulkConfig
#[derive(Debug)]
pub struct BulkConfigBuilder {
    database_url: String,
    default_batch_size: usize,
    primary_key_fallback: PrimaryKeyFallback,
}

impl BulkConfigBuilder {
    /// Create a new builder with the database URL
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            default_batch_size: DEFAULT_BATCH_SIZE,
            primary_key_fallback: PrimaryKeyFallback::default(),
        }
    }

    /// Set the default COPY chunk size (default: 10 000)
    pub fn default_batch_size(mut self, rows: usize) -> Self {
        self.default_batch_size = rows;
        self
    }

    /// Set the temp table primary key fallback (default: all columns)
    pub fn primary_key_fallback(mut self, fallback: PrimaryKeyFallback) -> Self {
        self.primary_key_fallback = fallback;
        self
    }

    /// Never synthesize a primary key for keyless temp tables
    pub fn without_primary_key_fallback(mut self) -> Self {
        self.primary_key_fallback = PrimaryKeyFallback::None;
        self
    }

    /// Build the configuration
    pub fn build(self) -> BulkConfig {
        BulkConfig {
            database_url: self.database_url,
            default_batch_size: self.default_batch_size,
            primary_key_fallback: self.primary_key_fallback,
        }
    }
}
