//! Bulk insert orchestration
//!
//! [`BulkExecutor`] ties the pieces together: it resolves columns, projects
//! objects into rows and drives a [`BulkCopyProtocol`] over a connection from
//! its [`ConnectionScope`]. Every connection it opens is closed on every exit
//! path. Temporary tables are created through its [`TempTableManager`] and
//! stay owned by the caller's handle.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::BulkConfig;
use crate::connection::{BulkCopyProtocol, ConnectionScope, CopyOptions, CopyTarget, cancellable};
use crate::entity::{ColumnDescriptor, EntityType};
use crate::error::{BulkError, Result};
use crate::mapping::resolve_columns;
use crate::options::{BulkInsertIntoTempTableOptions, BulkInsertOptions, TempTableCreationOptions};
use crate::reader::EntityRowReader;
use crate::sql::dialect::{PostgresRenderer, SqlRenderer};
use crate::temp_table::{TableDescriptor, TempTableHandle, TempTableManager};

/// Drives bulk inserts and temp table creation
pub struct BulkExecutor<S: ConnectionScope, P> {
    scope: Arc<S>,
    protocol: P,
    temp_tables: TempTableManager<S>,
    config: BulkConfig,
}

impl<S, P> BulkExecutor<S, P>
where
    S: ConnectionScope,
    P: BulkCopyProtocol<S::Connection>,
{
    /// Create an executor rendering DDL for PostgreSQL
    pub fn new(scope: Arc<S>, protocol: P, config: BulkConfig) -> Self {
        Self::with_renderer(scope, protocol, config, Arc::new(PostgresRenderer))
    }

    pub fn with_renderer(
        scope: Arc<S>,
        protocol: P,
        config: BulkConfig,
        renderer: Arc<dyn SqlRenderer>,
    ) -> Self {
        let temp_tables = TempTableManager::new(Arc::clone(&scope), renderer);
        Self {
            scope,
            protocol,
            temp_tables,
            config,
        }
    }

    pub fn scope(&self) -> &Arc<S> {
        &self.scope
    }

    pub fn protocol(&self) -> &P {
        &self.protocol
    }

    pub fn config(&self) -> &BulkConfig {
        &self.config
    }

    pub fn temp_tables(&self) -> &TempTableManager<S> {
        &self.temp_tables
    }

    // ========================================================================
    // Bulk Insert
    // ========================================================================

    /// Insert `objects` into the entity's table (or `options.table_name`)
    ///
    /// Returns the number of rows written. Mapping and naming problems are
    /// reported before a connection is opened.
    pub async fn bulk_insert<'a, T, I>(
        &self,
        entity: &EntityType<T>,
        objects: I,
        options: &BulkInsertOptions,
        cancel: &CancellationToken,
    ) -> Result<u64>
    where
        T: Sync + 'a,
        I: IntoIterator<Item = &'a T>,
        I::IntoIter: Send,
    {
        entity.validate()?;
        let columns = self.resolve(entity, options)?;

        let table = options
            .table_name
            .as_deref()
            .or(entity.table_name())
            .ok_or_else(|| {
                BulkError::configuration(
                    "Bulk insert target has no table name; set one on the entity or in the options",
                )
            })?
            .to_string();
        let schema = options
            .schema
            .clone()
            .or_else(|| entity.schema_name().map(String::from));

        let copy_options = CopyOptions {
            keep_identity: options.keep_identity,
            batch_size: self.batch_size(options)?,
        };
        let target = CopyTarget {
            schema,
            table,
            columns: columns.iter().map(|c| c.name.clone()).collect(),
        };
        let mut reader = EntityRowReader::new(objects, &columns)?;

        if cancel.is_cancelled() {
            return Err(BulkError::Cancelled);
        }

        let mut conn = cancellable(cancel, self.scope.open()).await?;
        debug!(table = %target.table, columns = target.columns.len(), "Starting bulk insert");

        let result = self
            .protocol
            .copy_rows(&mut conn, &target, &mut reader, &copy_options, cancel)
            .await;
        self.scope.close(conn).await;

        match &result {
            Ok(rows) => info!(table = %target.table, rows, "Bulk insert complete"),
            Err(e) => warn!(
                table = %target.table,
                rows_read = reader.rows_read(),
                error = %e,
                "Bulk insert aborted"
            ),
        }
        result
    }

    /// Insert `objects` into an existing temp table over its session connection
    pub async fn bulk_insert_into_temp_table<'a, T, I>(
        &self,
        handle: &TempTableHandle<S>,
        entity: &EntityType<T>,
        objects: I,
        options: &BulkInsertOptions,
        cancel: &CancellationToken,
    ) -> Result<u64>
    where
        T: Sync + 'a,
        I: IntoIterator<Item = &'a T>,
        I::IntoIter: Send,
    {
        entity.validate()?;
        let columns = self.resolve(entity, options)?;
        self.copy_into_temp(handle, &columns, objects, options, cancel)
            .await
    }

    // ========================================================================
    // Temp Tables
    // ========================================================================

    /// Create a temp table shaped like every column of `entity`
    pub async fn create_temp_table<T>(
        &self,
        entity: &EntityType<T>,
        options: &TempTableCreationOptions,
        cancel: &CancellationToken,
    ) -> Result<TempTableHandle<S>> {
        entity.validate()?;
        let columns: Vec<_> = entity.columns().iter().collect();
        let descriptor = self.temp_descriptor(entity, columns, options)?;
        self.temp_tables.create(&descriptor, cancel).await
    }

    /// Create a temp table shaped like the inserted columns and fill it
    ///
    /// If the insert fails the new table is released before the error is
    /// returned.
    pub async fn bulk_insert_into_new_temp_table<'a, T, I>(
        &self,
        entity: &EntityType<T>,
        objects: I,
        options: &BulkInsertIntoTempTableOptions,
        cancel: &CancellationToken,
    ) -> Result<(TempTableHandle<S>, u64)>
    where
        T: Sync + 'a,
        I: IntoIterator<Item = &'a T>,
        I::IntoIter: Send,
    {
        entity.validate()?;
        let columns = self.resolve(entity, &options.insert)?;
        let descriptor = self.temp_descriptor(entity, columns.clone(), &options.temp_table)?;
        let handle = self.temp_tables.create(&descriptor, cancel).await?;

        match self
            .copy_into_temp(&handle, &columns, objects, &options.insert, cancel)
            .await
        {
            Ok(rows) => Ok((handle, rows)),
            Err(e) => {
                if let Err(release_err) = handle.release().await {
                    warn!(table = handle.name(), error = %release_err, "Failed to release temp table after insert error");
                }
                Err(e)
            }
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn resolve<'e, T>(
        &self,
        entity: &'e EntityType<T>,
        options: &BulkInsertOptions,
    ) -> Result<Vec<&'e ColumnDescriptor<T>>> {
        let columns = resolve_columns(entity, &options.mapping())?;
        if columns.is_empty() {
            return Err(BulkError::configuration(
                "No writable columns remain after applying the mapping options",
            ));
        }
        Ok(columns)
    }

    fn batch_size(&self, options: &BulkInsertOptions) -> Result<usize> {
        match options.batch_size.unwrap_or(self.config.default_batch_size) {
            0 => Err(BulkError::configuration("Batch size must be greater than zero")),
            rows => Ok(rows),
        }
    }

    fn temp_descriptor<'e, T>(
        &self,
        entity: &EntityType<T>,
        columns: Vec<&'e ColumnDescriptor<T>>,
        options: &TempTableCreationOptions,
    ) -> Result<TableDescriptor<'e, T>> {
        let base_name = options
            .table_name
            .as_deref()
            .or(entity.table_name())
            .ok_or_else(|| {
                BulkError::configuration(
                    "Temp table has no base name; set one on the entity or in the options",
                )
            })?;

        Ok(
            TableDescriptor::new(base_name, columns, options.make_table_name_unique)?
                .create_primary_key(options.create_primary_key)
                .primary_key_fallback(
                    options
                        .primary_key_fallback
                        .unwrap_or(self.config.primary_key_fallback),
                ),
        )
    }

    async fn copy_into_temp<'a, T, I>(
        &self,
        handle: &TempTableHandle<S>,
        columns: &[&ColumnDescriptor<T>],
        objects: I,
        options: &BulkInsertOptions,
        cancel: &CancellationToken,
    ) -> Result<u64>
    where
        T: Sync + 'a,
        I: IntoIterator<Item = &'a T>,
        I::IntoIter: Send,
    {
        let copy_options = CopyOptions {
            keep_identity: options.keep_identity,
            batch_size: self.batch_size(options)?,
        };
        let target = CopyTarget {
            schema: None,
            table: handle.name().to_string(),
            columns: columns.iter().map(|c| c.name.clone()).collect(),
        };
        let mut reader = EntityRowReader::new(objects, columns)?;

        if cancel.is_cancelled() {
            return Err(BulkError::Cancelled);
        }

        let mut conn = cancellable(cancel, handle.connection()).await?;
        let result = self
            .protocol
            .copy_rows(&mut *conn, &target, &mut reader, &copy_options, cancel)
            .await;
        drop(conn);

        match &result {
            Ok(rows) => info!(table = %target.table, rows, "Temp table insert complete"),
            Err(e) => warn!(table = %target.table, error = %e, "Temp table insert aborted"),
        }
        result
    }
}
