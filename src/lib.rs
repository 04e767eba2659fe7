//! # runtara-bulk
//!
//! Bulk loading of in-memory object collections into PostgreSQL, plus
//! reference-counted temporary tables for staging.
//!
//! Entities describe their table through an [`EntityType`]: ordered column
//! descriptors, each carrying a pre-resolved accessor that reads the value from
//! `&T`. A bulk insert picks the columns to write, projects the objects into
//! typed rows and streams them with `COPY ... FROM STDIN`.
//!
//! ## Features
//!
//! - **Column Selection**: Identity, row-version, computed and shadow columns are
//!   excluded by default; explicit member lists override the defaults
//! - **Streaming Rows**: Objects are read lazily, one row at a time
//! - **Temporary Tables**: Unique or stable names, optional primary keys, and
//!   reference-counted teardown that drops the table exactly once
//! - **Cancellation**: Every I/O step honours a `CancellationToken`
//! - **No Leaks**: Connections are closed on every exit path
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use runtara_bulk::{
//!     BulkConfig, BulkInsertOptions, BulkStore, ColumnDescriptor, EntityType, MemberAccessor,
//!     SqlType, TempTableCreationOptions, Value,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! struct Product {
//!     id: uuid::Uuid,
//!     name: String,
//!     stock: i32,
//! }
//!
//! fn product_type() -> EntityType<Product> {
//!     EntityType::new("Products")
//!         .column(
//!             ColumnDescriptor::new(
//!                 "Id",
//!                 SqlType::Uuid,
//!                 MemberAccessor::property("id", |p: &Product| Value::from(p.id)),
//!             )
//!             .primary_key(),
//!         )
//!         .column(ColumnDescriptor::new(
//!             "Name",
//!             SqlType::Text,
//!             MemberAccessor::property("name", |p: &Product| Value::from(p.name.as_str())),
//!         ))
//!         .column(ColumnDescriptor::new(
//!             "Stock",
//!             SqlType::Integer,
//!             MemberAccessor::property("stock", |p: &Product| Value::from(p.stock)),
//!         ))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BulkConfig::builder("postgres://localhost/mydb").build();
//!     let store = BulkStore::connect(config).await?;
//!     let cancel = CancellationToken::new();
//!
//!     let entity = product_type();
//!     let products = vec![Product {
//!         id: uuid::Uuid::new_v4(),
//!         name: "Blue Widget".to_string(),
//!         stock: 42,
//!     }];
//!
//!     // Straight into the entity's table
//!     let written = store
//!         .bulk_insert(&entity, &products, &BulkInsertOptions::default(), &cancel)
//!         .await?;
//!
//!     // Or into a staging table that lives until the last release
//!     let staging = store
//!         .create_temp_table(&entity, &TempTableCreationOptions::default(), &cancel)
//!         .await?;
//!     store
//!         .bulk_insert_into_temp_table(&staging, &entity, &products, &BulkInsertOptions::default(), &cancel)
//!         .await?;
//!     staging.release().await?;
//!
//!     println!("wrote {} rows", written);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use runtara_bulk::{BulkConfig, PrimaryKeyFallback};
//!
//! let config = BulkConfig::builder("postgres://localhost/mydb")
//!     .default_batch_size(5_000)                         // Rows per COPY chunk
//!     .primary_key_fallback(PrimaryKeyFallback::None)    // Keyless temp tables get no key
//!     .build();
//! ```
//!
//! ## Temporary Tables and Sessions
//!
//! PostgreSQL temporary tables are visible only to the session that created
//! them. A [`TempTableHandle`] therefore keeps its session connection for as
//! long as the table exists, and inserts through the handle serialize on it.

pub mod config;
pub mod connection;
pub mod entity;
pub mod error;
pub mod executor;
pub mod mapping;
pub mod options;
pub mod postgres;
pub mod reader;
pub mod sql;
pub mod store;
pub mod temp_table;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for convenience
pub use config::{BulkConfig, BulkConfigBuilder, DEFAULT_BATCH_SIZE, PrimaryKeyFallback};
pub use connection::{BulkCopyProtocol, ConnectionScope, CopyOptions, CopyTarget};
pub use entity::{ColumnDescriptor, Entity, EntityType, Getter, MemberAccessor, MemberId, MemberKind};
pub use error::{BulkError, Result};
pub use executor::BulkExecutor;
pub use mapping::resolve_columns;
pub use options::{
    BulkInsertIntoTempTableOptions, BulkInsertOptions, MappingOptions, TempTableCreationOptions,
};
pub use postgres::{PgConnectionScope, PgCopyProtocol};
pub use reader::{EntityRowReader, RowCursor};
pub use store::BulkStore;
pub use temp_table::{TableDescriptor, TempTableHandle, TempTableManager};
pub use types::{SqlType, Value};

// Re-export SQL utilities for advanced users
pub use sql::ddl::DdlGenerator;
pub use sql::dialect::{PostgresRenderer, SqlRenderer};
pub use sql::sanitize::{quote_identifier, validate_identifier};
