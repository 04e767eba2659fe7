//! Temporary table lifecycle
//!
//! PostgreSQL temporary tables live in the session that created them, so a
//! [`TempTableHandle`] owns that session's connection alongside the table
//! name. Handles are reference counted: creation counts as the first
//! acquisition, and the release that brings the count to zero drops the table
//! and closes the connection. Disposal is always an explicit async
//! [`TempTableHandle::release`]; dropping a handle never issues SQL.
//!
//! A session connection goes back to its scope through `close` only after a
//! successful DROP. On every other path (failed or interrupted DROP, failed
//! creation, a handle dropped while still held) the connection is discarded,
//! which ends the session and the table with it.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::PrimaryKeyFallback;
use crate::connection::{ConnectionScope, cancellable};
use crate::entity::ColumnDescriptor;
use crate::error::{BulkError, Result};
use crate::sql::ddl::DdlGenerator;
use crate::sql::dialect::SqlRenderer;
use crate::sql::sanitize::{POSTGRES_MAX_IDENTIFIER_LENGTH, truncate_identifier, validate_identifier};

// ============================================================================
// Table Descriptor
// ============================================================================

/// Structure and naming of a temporary table
pub struct TableDescriptor<'a, T> {
    base_name: String,
    effective_name: String,
    is_unique: bool,
    columns: Vec<&'a ColumnDescriptor<T>>,
    create_primary_key: bool,
    primary_key_fallback: PrimaryKeyFallback,
}

impl<'a, T> TableDescriptor<'a, T> {
    /// Describe a table over `columns`
    ///
    /// With `is_unique` the effective name is `base_name` plus `_` and a fresh
    /// random token. A base too long to keep the token within PostgreSQL's
    /// identifier limit is truncated; a stable name that is too long is an
    /// error.
    pub fn new(
        base_name: impl Into<String>,
        columns: Vec<&'a ColumnDescriptor<T>>,
        is_unique: bool,
    ) -> Result<Self> {
        let base_name = base_name.into();
        if base_name.is_empty() {
            return Err(BulkError::configuration("Temp table name cannot be empty"));
        }
        if columns.is_empty() {
            return Err(BulkError::configuration(format!(
                "Temp table '{}' has no columns",
                base_name
            )));
        }
        for (i, col) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == col.name) {
                return Err(BulkError::configuration(format!(
                    "Column '{}' appears more than once in temp table '{}'",
                    col.name, base_name
                )));
            }
            if col.is_auto_increment && !col.sql_type.supports_identity() {
                return Err(BulkError::configuration(format!(
                    "Column '{}' in temp table '{}' is an identity column but {} cannot be one",
                    col.name,
                    base_name,
                    col.sql_type.to_sql_type()
                )));
            }
        }

        let effective_name = if is_unique {
            unique_name(&base_name)
        } else {
            base_name.clone()
        };
        validate_identifier(&effective_name).map_err(BulkError::Configuration)?;

        Ok(Self {
            base_name,
            effective_name,
            is_unique,
            columns,
            create_primary_key: true,
            primary_key_fallback: PrimaryKeyFallback::default(),
        })
    }

    /// Emit a PRIMARY KEY clause (default: true)
    pub fn create_primary_key(mut self, create: bool) -> Self {
        self.create_primary_key = create;
        self
    }

    /// Key policy when no column is a declared primary key
    pub fn primary_key_fallback(mut self, fallback: PrimaryKeyFallback) -> Self {
        self.primary_key_fallback = fallback;
        self
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn effective_name(&self) -> &str {
        &self.effective_name
    }

    pub fn is_unique(&self) -> bool {
        self.is_unique
    }

    pub fn columns(&self) -> &[&'a ColumnDescriptor<T>] {
        &self.columns
    }

    /// Columns forming the primary key, empty when none is created
    pub fn key_columns(&self) -> Vec<&'a ColumnDescriptor<T>> {
        if !self.create_primary_key {
            return Vec::new();
        }
        let declared: Vec<_> = self
            .columns
            .iter()
            .copied()
            .filter(|c| c.is_primary_key)
            .collect();
        if !declared.is_empty() {
            return declared;
        }
        match self.primary_key_fallback {
            PrimaryKeyFallback::AllColumns => self.columns.clone(),
            PrimaryKeyFallback::None => Vec::new(),
        }
    }
}

fn unique_name(base: &str) -> String {
    let token = Uuid::new_v4().simple().to_string();
    let max_base = POSTGRES_MAX_IDENTIFIER_LENGTH - token.len() - 1;
    format!("{}_{}", truncate_identifier(base, max_base), token)
}

// ============================================================================
// Session Guard
// ============================================================================

/// Session connection that may still hold a temporary table
///
/// Discarded on drop unless handed over with [`Session::into_inner`].
struct Session<'s, S: ConnectionScope> {
    scope: &'s S,
    conn: Option<S::Connection>,
}

impl<'s, S: ConnectionScope> Session<'s, S> {
    fn new(scope: &'s S, conn: S::Connection) -> Self {
        Self {
            scope,
            conn: Some(conn),
        }
    }

    fn conn_mut(&mut self) -> Result<&mut S::Connection> {
        self.conn
            .as_mut()
            .ok_or_else(|| BulkError::connection("Session connection already handed over"))
    }

    fn into_inner(mut self) -> Option<S::Connection> {
        self.conn.take()
    }
}

impl<S: ConnectionScope> Drop for Session<'_, S> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.scope.discard(conn);
        }
    }
}

// ============================================================================
// Handle
// ============================================================================

struct Shared<S: ConnectionScope> {
    name: String,
    drop_sql: String,
    refs: AtomicUsize,
    connection: Mutex<Option<S::Connection>>,
    scope: Arc<S>,
}

impl<S: ConnectionScope> Drop for Shared<S> {
    fn drop(&mut self) {
        let refs = *self.refs.get_mut();
        if let Some(conn) = self.connection.get_mut().take() {
            warn!(
                table = %self.name,
                refs,
                "Temp table handle dropped without a completed release; discarding its session"
            );
            self.scope.discard(conn);
        }
    }
}

/// Shared ownership of a temporary table and its session connection
pub struct TempTableHandle<S: ConnectionScope> {
    shared: Arc<Shared<S>>,
}

impl<S: ConnectionScope> Clone for TempTableHandle<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: ConnectionScope> fmt::Debug for TempTableHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TempTableHandle")
            .field("name", &self.shared.name)
            .field("refs", &self.ref_count())
            .finish()
    }
}

impl<S: ConnectionScope> TempTableHandle<S> {
    fn new(name: String, drop_sql: String, conn: S::Connection, scope: Arc<S>) -> Self {
        Self {
            shared: Arc::new(Shared {
                name,
                drop_sql,
                refs: AtomicUsize::new(1),
                connection: Mutex::new(Some(conn)),
                scope,
            }),
        }
    }

    /// Effective table name
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn ref_count(&self) -> usize {
        self.shared.refs.load(Ordering::Acquire)
    }

    pub fn is_released(&self) -> bool {
        self.ref_count() == 0
    }

    /// Register one more holder
    pub fn acquire(&self) -> Result<()> {
        self.shared
            .refs
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                if n == 0 { None } else { Some(n + 1) }
            })
            .map(|_| ())
            .map_err(|_| {
                BulkError::configuration(format!(
                    "Temp table '{}' has already been released",
                    self.shared.name
                ))
            })
    }

    /// Give up one hold; returns true when this call dropped the table
    ///
    /// The connection is given up even when the DROP fails or this future is
    /// dropped part way through.
    pub async fn release(&self) -> Result<bool> {
        let previous = self
            .shared
            .refs
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));

        match previous {
            Err(_) => {
                warn!(table = %self.shared.name, "Temp table released more times than it was acquired");
                Ok(false)
            }
            Ok(1) => self.dispose().await.map(|_| true),
            Ok(n) => {
                debug!(table = %self.shared.name, remaining = n - 1, "Released temp table hold");
                Ok(false)
            }
        }
    }

    async fn dispose(&self) -> Result<()> {
        let Some(conn) = self.shared.connection.lock().await.take() else {
            return Ok(());
        };
        let scope = self.shared.scope.as_ref();
        let mut session = Session::new(scope, conn);
        let result = scope
            .execute_raw(session.conn_mut()?, &self.shared.drop_sql)
            .await;

        match &result {
            Ok(()) => {
                if let Some(conn) = session.into_inner() {
                    scope.close(conn).await;
                }
                info!(table = %self.shared.name, "Dropped temp table");
            }
            Err(e) => {
                drop(session);
                warn!(table = %self.shared.name, error = %e, "Failed to drop temp table; session discarded");
            }
        }
        result
    }

    /// Lock the session connection the table lives on
    pub async fn connection(&self) -> Result<MappedMutexGuard<'_, S::Connection>> {
        let guard = self.shared.connection.lock().await;
        if self.is_released() {
            return Err(self.released_error());
        }
        MutexGuard::try_map(guard, |slot| slot.as_mut()).map_err(|_| self.released_error())
    }

    fn released_error(&self) -> BulkError {
        BulkError::configuration(format!(
            "Temp table '{}' has been released",
            self.shared.name
        ))
    }
}

// ============================================================================
// Manager
// ============================================================================

/// Creates temporary tables and hands out their handles
pub struct TempTableManager<S: ConnectionScope> {
    scope: Arc<S>,
    renderer: Arc<dyn SqlRenderer>,
}

impl<S: ConnectionScope> Clone for TempTableManager<S> {
    fn clone(&self) -> Self {
        Self {
            scope: Arc::clone(&self.scope),
            renderer: Arc::clone(&self.renderer),
        }
    }
}

impl<S: ConnectionScope> TempTableManager<S> {
    pub fn new(scope: Arc<S>, renderer: Arc<dyn SqlRenderer>) -> Self {
        Self { scope, renderer }
    }

    /// Open a session and create the table described by `descriptor`
    ///
    /// On failure the session is discarded and no handle is returned.
    pub async fn create<T>(
        &self,
        descriptor: &TableDescriptor<'_, T>,
        cancel: &CancellationToken,
    ) -> Result<TempTableHandle<S>> {
        let ddl = DdlGenerator::new(self.renderer.as_ref());
        let statements = ddl.generate_temp_table(descriptor);
        let drop_sql = ddl.generate_drop_temp_table(descriptor.effective_name());

        let conn = cancellable(cancel, self.scope.open()).await?;
        let mut session = Session::new(self.scope.as_ref(), conn);

        for sql in &statements {
            debug!(table = descriptor.effective_name(), sql = %sql, "Executing temp table DDL");
            let result = cancellable(cancel, self.scope.execute_raw(session.conn_mut()?, sql)).await;
            if let Err(e) = result {
                drop(session);
                warn!(table = descriptor.effective_name(), error = %e, "Temp table creation failed");
                return Err(e);
            }
        }

        let conn = session
            .into_inner()
            .ok_or_else(|| BulkError::connection("Session connection already handed over"))?;

        info!(
            table = descriptor.effective_name(),
            columns = descriptor.columns().len(),
            unique = descriptor.is_unique(),
            "Created temp table"
        );

        Ok(TempTableHandle::new(
            descriptor.effective_name().to_string(),
            drop_sql,
            conn,
            Arc::clone(&self.scope),
        ))
    }

    pub fn acquire(&self, handle: &TempTableHandle<S>) -> Result<()> {
        handle.acquire()
    }

    pub async fn release(&self, handle: &TempTableHandle<S>) -> Result<bool> {
        handle.release().await
    }
}
