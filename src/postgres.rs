//! PostgreSQL collaborators backed by sqlx
//!
//! [`PgConnectionScope`] hands out pooled connections and [`PgCopyProtocol`]
//! streams rows with `COPY ... FROM STDIN` in text format.

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::postgres::PgCopyIn;
use sqlx::{PgConnection, PgPool, Postgres};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::connection::{
    BulkCopyProtocol, ConnectionScope, CopyOptions, CopyTarget, cancellable,
};
use crate::error::{BulkError, Result};
use crate::reader::RowCursor;
use crate::sql::copy::{copy_in_statement, encode_row};
use crate::sql::dialect::PostgresRenderer;

/// Initial capacity of the COPY send buffer
const COPY_BUFFER_CAPACITY: usize = 1024 * 1024;

// ============================================================================
// Connection Scope
// ============================================================================

/// Connection scope over a sqlx pool
#[derive(Debug, Clone)]
pub struct PgConnectionScope {
    pool: PgPool,
}

impl PgConnectionScope {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ConnectionScope for PgConnectionScope {
    type Connection = PoolConnection<Postgres>;

    async fn open(&self) -> Result<PoolConnection<Postgres>> {
        self.pool
            .acquire()
            .await
            .map_err(|e| BulkError::Connection(format!("Failed to acquire connection: {}", e)))
    }

    async fn close(&self, conn: PoolConnection<Postgres>) {
        // Dropping returns the connection to the pool
        drop(conn);
    }

    fn discard(&self, conn: PoolConnection<Postgres>) {
        // Detached connections leave the pool; dropping one ends its session
        drop(conn.detach());
    }

    async fn execute_raw(&self, conn: &mut PoolConnection<Postgres>, sql: &str) -> Result<()> {
        let conn: &mut PgConnection = &mut **conn;
        sqlx::Executor::execute(conn, sqlx::raw_sql(sql)).await?;
        Ok(())
    }
}

// ============================================================================
// COPY Protocol
// ============================================================================

/// Bulk copy via `COPY ... FROM STDIN`
#[derive(Debug, Clone, Copy, Default)]
pub struct PgCopyProtocol;

#[async_trait]
impl BulkCopyProtocol<PoolConnection<Postgres>> for PgCopyProtocol {
    async fn copy_rows(
        &self,
        conn: &mut PoolConnection<Postgres>,
        target: &CopyTarget,
        rows: &mut (dyn RowCursor + Send),
        options: &CopyOptions,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        if rows.field_count() != target.columns.len() {
            return Err(BulkError::configuration(format!(
                "Row width {} does not match {} target columns",
                rows.field_count(),
                target.columns.len()
            )));
        }

        let statement = copy_in_statement(
            &PostgresRenderer,
            target.schema.as_deref(),
            &target.table,
            &target.columns,
        );
        debug!(
            sql = %statement,
            batch_size = options.batch_size,
            keep_identity = options.keep_identity,
            "Starting COPY"
        );

        let mut copy = cancellable(cancel, conn.copy_in_raw(&statement)).await?;

        match send_rows(&mut copy, rows, options.batch_size, cancel).await {
            Ok(()) => Ok(copy.finish().await?),
            Err(e) => {
                if let Err(abort_err) = copy.abort(e.to_string()).await {
                    warn!(table = %target.table, error = %abort_err, "Failed to abort COPY");
                }
                Err(e)
            }
        }
    }
}

async fn send_rows(
    copy: &mut PgCopyIn<&mut PgConnection>,
    rows: &mut (dyn RowCursor + Send),
    batch_size: usize,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut buf = String::with_capacity(COPY_BUFFER_CAPACITY);
    let mut buffered = 0usize;

    while rows.advance() {
        encode_row(&*rows, &mut buf)?;
        buffered += 1;

        if buffered >= batch_size {
            cancellable(cancel, copy.send(buf.as_bytes())).await?;
            buf.clear();
            buffered = 0;
        }
    }

    if buffered > 0 {
        cancellable(cancel, copy.send(buf.as_bytes())).await?;
    }
    Ok(())
}
