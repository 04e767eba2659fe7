//! In-memory collaborators for unit tests

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::connection::{BulkCopyProtocol, ConnectionScope, CopyOptions, CopyTarget, cancellable};
use crate::entity::{ColumnDescriptor, EntityType, MemberAccessor};
use crate::error::{BulkError, Result};
use crate::reader::RowCursor;
use crate::types::{SqlType, Value};

#[derive(Debug)]
pub(crate) struct MockConnection {
    pub id: usize,
}

/// Records every open, execute, close and discard
#[derive(Default)]
pub(crate) struct MockScope {
    events: Mutex<Vec<String>>,
    next_id: AtomicUsize,
    open_now: AtomicUsize,
    closed: AtomicUsize,
    discarded: AtomicUsize,
    fail_open: AtomicBool,
    fail_on: Mutex<Option<String>>,
    stall_on: Mutex<Option<String>>,
}

impl MockScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statements containing `fragment` fail with a protocol error
    pub fn failing_on(fragment: &str) -> Self {
        let scope = Self::default();
        *scope.fail_on.lock().unwrap() = Some(fragment.to_string());
        scope
    }

    /// Statements containing `fragment` never complete
    pub fn stalling_on(fragment: &str) -> Self {
        let scope = Self::default();
        *scope.stall_on.lock().unwrap() = Some(fragment.to_string());
        scope
    }

    pub fn failing_open() -> Self {
        let scope = Self::default();
        scope.fail_open.store(true, Ordering::SeqCst);
        scope
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// SQL executed so far, in order
    pub fn executed(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| e.split_once(": ").map(|(_, sql)| sql.to_string()))
            .collect()
    }

    pub fn opened(&self) -> usize {
        self.next_id.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn discarded(&self) -> usize {
        self.discarded.load(Ordering::SeqCst)
    }

    pub fn open_now(&self) -> usize {
        self.open_now.load(Ordering::SeqCst)
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl ConnectionScope for MockScope {
    type Connection = MockConnection;

    async fn open(&self) -> Result<MockConnection> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(BulkError::connection("connection refused"));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.open_now.fetch_add(1, Ordering::SeqCst);
        self.record(format!("open {}", id));
        Ok(MockConnection { id })
    }

    async fn close(&self, conn: MockConnection) {
        self.open_now.fetch_sub(1, Ordering::SeqCst);
        self.closed.fetch_add(1, Ordering::SeqCst);
        self.record(format!("close {}", conn.id));
    }

    fn discard(&self, conn: MockConnection) {
        self.open_now.fetch_sub(1, Ordering::SeqCst);
        self.discarded.fetch_add(1, Ordering::SeqCst);
        self.record(format!("discard {}", conn.id));
    }

    async fn execute_raw(&self, conn: &mut MockConnection, sql: &str) -> Result<()> {
        self.record(format!("exec {}: {}", conn.id, sql));
        let stall = self
            .stall_on
            .lock()
            .unwrap()
            .as_deref()
            .is_some_and(|fragment| sql.contains(fragment));
        if stall {
            std::future::pending::<()>().await;
        }
        let fail = self
            .fail_on
            .lock()
            .unwrap()
            .as_deref()
            .is_some_and(|fragment| sql.contains(fragment));
        if fail {
            return Err(BulkError::protocol(format!("statement rejected: {}", sql)));
        }
        Ok(())
    }
}

/// One completed copy
#[derive(Debug, Clone)]
pub(crate) struct CopyCall {
    pub connection: usize,
    pub target: CopyTarget,
    pub options: CopyOptions,
    pub rows: Vec<Vec<Value>>,
}

/// Bulk copy that keeps rows in memory
#[derive(Default)]
pub(crate) struct MockCopy {
    pub(crate) calls: Mutex<Vec<CopyCall>>,
    /// Fail with a protocol error after this many rows
    pub fail_after: Option<usize>,
    /// Never finish; only cancellation ends the copy
    pub pending: bool,
}

impl MockCopy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<CopyCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn written_rows(&self) -> Vec<Vec<Value>> {
        self.calls().into_iter().flat_map(|c| c.rows).collect()
    }
}

#[async_trait]
impl BulkCopyProtocol<MockConnection> for MockCopy {
    async fn copy_rows(
        &self,
        conn: &mut MockConnection,
        target: &CopyTarget,
        rows: &mut (dyn RowCursor + Send),
        options: &CopyOptions,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        if self.pending {
            return cancellable(cancel, std::future::pending::<Result<u64>>()).await;
        }

        let mut staged = Vec::new();
        while rows.advance() {
            if self.fail_after == Some(staged.len()) {
                return Err(BulkError::protocol("COPY rejected by store"));
            }
            let row = (0..rows.field_count())
                .map(|i| rows.value_at(i))
                .collect::<Result<Vec<_>>>()?;
            staged.push(row);
        }

        let count = staged.len() as u64;
        self.calls.lock().unwrap().push(CopyCall {
            connection: conn.id,
            target: target.clone(),
            options: *options,
            rows: staged,
        });
        Ok(count)
    }
}

pub(crate) struct TestEntity {
    pub id: Uuid,
    pub name: Option<String>,
    pub count: i32,
    pub sequence: i64,
}

/// `TestEntities (Id UUID PK, Name TEXT, Count INTEGER NOT NULL, Seq BIGINT identity)`
pub(crate) fn test_entity_type() -> EntityType<TestEntity> {
    EntityType::new("TestEntities")
        .column(
            ColumnDescriptor::new(
                "Id",
                SqlType::Uuid,
                MemberAccessor::property("Id", |e: &TestEntity| Value::from(e.id)),
            )
            .primary_key(),
        )
        .column(ColumnDescriptor::new(
            "Name",
            SqlType::Text,
            MemberAccessor::property("Name", |e: &TestEntity| Value::from(e.name.clone())),
        ))
        .column(
            ColumnDescriptor::new(
                "Count",
                SqlType::Integer,
                MemberAccessor::property("Count", |e: &TestEntity| Value::from(e.count)),
            )
            .not_null(),
        )
        .column(
            ColumnDescriptor::new(
                "Seq",
                SqlType::BigInt,
                MemberAccessor::property("Sequence", |e: &TestEntity| Value::from(e.sequence)),
            )
            .auto_increment(),
        )
}

pub(crate) fn test_entities(count: i32) -> Vec<TestEntity> {
    (0..count)
        .map(|i| TestEntity {
            id: Uuid::new_v4(),
            name: Some(format!("Name {}", i)),
            count: i,
            sequence: 1000 + i64::from(i),
        })
        .collect()
}
