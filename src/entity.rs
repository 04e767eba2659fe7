//! Entity metadata consumed by the bulk pipeline
//!
//! An [`EntityType`] describes how objects of type `T` map onto a table: the
//! ordered column descriptors, and for each column a pre-resolved accessor that
//! reads the value straight from `&T`. Accessors are plain closures, so private
//! fields and computed values are read without the member being public on any
//! trait surface.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{BulkError, Result};
use crate::types::{SqlType, Value};

/// Reads a column value from a source object
pub type Getter<T> = Arc<dyn Fn(&T) -> Value + Send + Sync>;

/// Identity of an object member, used by explicit member selection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MemberId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for MemberId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// How a column's value is backed on the source object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// Regular field or property, readable and writable
    Property,
    /// Private field behind a public property, readable and writable
    BackingField,
    /// Derived from other state; readable only
    Computed,
    /// Column with no field on the object
    Shadow,
}

/// Pre-resolved accessor for one member of `T`
pub struct MemberAccessor<T> {
    member: MemberId,
    kind: MemberKind,
    getter: Option<Getter<T>>,
}

impl<T> MemberAccessor<T> {
    pub fn property<F>(member: impl Into<MemberId>, getter: F) -> Self
    where
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        Self::with_getter(member, MemberKind::Property, getter)
    }

    pub fn backing_field<F>(member: impl Into<MemberId>, getter: F) -> Self
    where
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        Self::with_getter(member, MemberKind::BackingField, getter)
    }

    pub fn computed<F>(member: impl Into<MemberId>, getter: F) -> Self
    where
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        Self::with_getter(member, MemberKind::Computed, getter)
    }

    /// Shadow state the supplied objects cannot provide
    pub fn shadow(member: impl Into<MemberId>) -> Self {
        Self {
            member: member.into(),
            kind: MemberKind::Shadow,
            getter: None,
        }
    }

    /// Shadow state read from somewhere other than the object itself
    pub fn shadow_with<F>(member: impl Into<MemberId>, getter: F) -> Self
    where
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        Self::with_getter(member, MemberKind::Shadow, getter)
    }

    fn with_getter<F>(member: impl Into<MemberId>, kind: MemberKind, getter: F) -> Self
    where
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        Self {
            member: member.into(),
            kind,
            getter: Some(Arc::new(getter)),
        }
    }

    pub fn member(&self) -> &MemberId {
        &self.member
    }

    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    pub fn is_readable(&self) -> bool {
        self.getter.is_some()
    }

    /// Whether the member is backed by writable state on the object
    pub fn is_writable(&self) -> bool {
        matches!(self.kind, MemberKind::Property | MemberKind::BackingField)
    }

    pub fn getter(&self) -> Option<&Getter<T>> {
        self.getter.as_ref()
    }
}

impl<T> Clone for MemberAccessor<T> {
    fn clone(&self) -> Self {
        Self {
            member: self.member.clone(),
            kind: self.kind,
            getter: self.getter.clone(),
        }
    }
}

impl<T> fmt::Debug for MemberAccessor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberAccessor")
            .field("member", &self.member)
            .field("kind", &self.kind)
            .field("readable", &self.is_readable())
            .finish()
    }
}

/// Destination column descriptor
pub struct ColumnDescriptor<T> {
    /// Destination column name
    pub name: String,

    /// Where the value comes from
    pub accessor: MemberAccessor<T>,

    /// Type family the value is coerced to
    pub sql_type: SqlType,

    /// Explicit DDL type, overriding the one derived from `sql_type`
    pub ddl_type: Option<String>,

    /// Whether the column allows NULL values (default: true)
    pub nullable: bool,

    pub is_primary_key: bool,

    pub is_auto_increment: bool,

    pub is_concurrency_token: bool,

    /// Value produced by the store itself (generated-always); never written
    pub is_store_generated: bool,

    /// Default as a SQL expression, e.g. "now()"
    pub default_value_sql: Option<String>,

    /// Default as a literal, rendered by the dialect
    pub default_value: Option<Value>,
}

impl<T> ColumnDescriptor<T> {
    /// Create a new nullable column
    pub fn new(name: impl Into<String>, sql_type: SqlType, accessor: MemberAccessor<T>) -> Self {
        Self {
            name: name.into(),
            accessor,
            sql_type,
            ddl_type: None,
            nullable: true,
            is_primary_key: false,
            is_auto_increment: false,
            is_concurrency_token: false,
            is_store_generated: false,
            default_value_sql: None,
            default_value: None,
        }
    }

    /// Set the column as non-nullable
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Mark as part of the primary key (implies NOT NULL)
    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self.nullable = false;
        self
    }

    /// Mark as an identity column (implies NOT NULL)
    pub fn auto_increment(mut self) -> Self {
        self.is_auto_increment = true;
        self.nullable = false;
        self
    }

    pub fn concurrency_token(mut self) -> Self {
        self.is_concurrency_token = true;
        self
    }

    pub fn store_generated(mut self) -> Self {
        self.is_store_generated = true;
        self
    }

    pub fn ddl_type(mut self, ddl_type: impl Into<String>) -> Self {
        self.ddl_type = Some(ddl_type.into());
        self
    }

    pub fn default_sql(mut self, expression: impl Into<String>) -> Self {
        self.default_value_sql = Some(expression.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn member(&self) -> &MemberId {
        self.accessor.member()
    }
}

impl<T> Clone for ColumnDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            accessor: self.accessor.clone(),
            sql_type: self.sql_type.clone(),
            ddl_type: self.ddl_type.clone(),
            nullable: self.nullable,
            is_primary_key: self.is_primary_key,
            is_auto_increment: self.is_auto_increment,
            is_concurrency_token: self.is_concurrency_token,
            is_store_generated: self.is_store_generated,
            default_value_sql: self.default_value_sql.clone(),
            default_value: self.default_value.clone(),
        }
    }
}

impl<T> fmt::Debug for ColumnDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDescriptor")
            .field("name", &self.name)
            .field("accessor", &self.accessor)
            .field("sql_type", &self.sql_type)
            .field("nullable", &self.nullable)
            .field("is_primary_key", &self.is_primary_key)
            .field("is_auto_increment", &self.is_auto_increment)
            .field("is_concurrency_token", &self.is_concurrency_token)
            .finish_non_exhaustive()
    }
}

/// Mapping metadata for one entity type
pub struct EntityType<T> {
    table_name: Option<String>,
    schema: Option<String>,
    columns: Vec<ColumnDescriptor<T>>,
    unmapped_members: HashSet<MemberId>,
}

impl<T> EntityType<T> {
    /// Entity mapped to a named table
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: Some(table_name.into()),
            schema: None,
            columns: Vec::new(),
            unmapped_members: HashSet::new(),
        }
    }

    /// Projection without a table of its own, e.g. the shape of a temp table
    pub fn keyless() -> Self {
        Self {
            table_name: None,
            schema: None,
            columns: Vec::new(),
            unmapped_members: HashSet::new(),
        }
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn column(mut self, column: ColumnDescriptor<T>) -> Self {
        self.columns.push(column);
        self
    }

    /// Register a member that exists on `T` but maps to no column
    pub fn unmapped(mut self, member: impl Into<MemberId>) -> Self {
        self.unmapped_members.insert(member.into());
        self
    }

    pub fn table_name(&self) -> Option<&str> {
        self.table_name.as_deref()
    }

    pub fn schema_name(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn columns(&self) -> &[ColumnDescriptor<T>] {
        &self.columns
    }

    pub fn primary_key(&self) -> Vec<&ColumnDescriptor<T>> {
        self.columns.iter().filter(|c| c.is_primary_key).collect()
    }

    /// Whether `member` belongs to `T`, mapped or not
    pub fn knows_member(&self, member: &MemberId) -> bool {
        self.unmapped_members.contains(member) || self.columns.iter().any(|c| c.member() == member)
    }

    /// Check that column names are unique
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for col in &self.columns {
            if !seen.insert(col.name.as_str()) {
                return Err(BulkError::configuration(format!(
                    "Column '{}' is mapped more than once",
                    col.name
                )));
            }
        }
        Ok(())
    }
}

impl<T> Clone for EntityType<T> {
    fn clone(&self) -> Self {
        Self {
            table_name: self.table_name.clone(),
            schema: self.schema.clone(),
            columns: self.columns.clone(),
            unmapped_members: self.unmapped_members.clone(),
        }
    }
}

impl<T> fmt::Debug for EntityType<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityType")
            .field("table_name", &self.table_name)
            .field("schema", &self.schema)
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}

/// Types that describe their own mapping
pub trait Entity: Sized + Send + Sync + 'static {
    fn entity_type() -> EntityType<Self>;
}
