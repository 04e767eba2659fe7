//! Collaborator traits for connection handling and bulk copy

use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{BulkError, Result};
use crate::reader::RowCursor;

/// Opens and closes connections and runs raw SQL on them
///
/// Every connection returned by `open` must be handed back to `close` exactly
/// once, on success and failure paths alike.
#[async_trait]
pub trait ConnectionScope: Send + Sync + 'static {
    type Connection: Send + 'static;

    async fn open(&self) -> Result<Self::Connection>;

    async fn close(&self, conn: Self::Connection);

    /// Give up a connection whose session may still hold state, such as a
    /// temporary table, so that it is never reused
    ///
    /// Runs from `Drop`, so it must not block or await.
    fn discard(&self, conn: Self::Connection) {
        drop(conn);
    }

    /// Execute a statement that returns no rows
    async fn execute_raw(&self, conn: &mut Self::Connection, sql: &str) -> Result<()>;
}

/// Destination of a bulk copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyTarget {
    pub schema: Option<String>,
    pub table: String,
    /// Column names, aligned with the row cursor's fields
    pub columns: Vec<String>,
}

/// Options passed through to the bulk-copy protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyOptions {
    /// Caller-supplied identity values are part of the rows
    pub keep_identity: bool,
    /// Rows per chunk sent to the store
    pub batch_size: usize,
}

/// Store-specific high-throughput insert path
#[async_trait]
pub trait BulkCopyProtocol<C: Send>: Send + Sync {
    /// Stream every row of `rows` into `target`; returns rows written
    ///
    /// Either all rows are written or the copy is aborted.
    async fn copy_rows(
        &self,
        conn: &mut C,
        target: &CopyTarget,
        rows: &mut (dyn RowCursor + Send),
        options: &CopyOptions,
        cancel: &CancellationToken,
    ) -> Result<u64>;
}

/// Run `fut` unless `cancel` fires first
pub(crate) async fn cancellable<F, T, E>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, E>>,
    BulkError: From<E>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(BulkError::Cancelled),
        result = fut => result.map_err(BulkError::from),
    }
}
