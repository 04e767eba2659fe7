//! Request options for bulk inserts and temp table creation

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::PrimaryKeyFallback;
use crate::entity::MemberId;

/// Controls which columns take part in a bulk write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingOptions {
    /// Restrict the write to exactly these members
    pub explicit_members: Option<HashSet<MemberId>>,
    /// Write caller-supplied values into identity columns
    pub keep_identity: bool,
    /// Write caller-supplied values into concurrency-token columns
    pub include_row_version: bool,
}

/// Options for a single bulk insert
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkInsertOptions {
    #[serde(default)]
    pub keep_identity: bool,

    #[serde(default)]
    pub include_row_version: bool,

    /// Members to write; all eligible members when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit_members: Option<HashSet<MemberId>>,

    /// Rows per COPY chunk; the executor default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,

    /// Destination table, overriding the entity's table name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,

    /// Destination schema, overriding the entity's schema
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

impl BulkInsertOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keep_identity(mut self) -> Self {
        self.keep_identity = true;
        self
    }

    pub fn include_row_version(mut self) -> Self {
        self.include_row_version = true;
        self
    }

    /// Write only the given members
    pub fn members<I, M>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<MemberId>,
    {
        self.explicit_members = Some(members.into_iter().map(Into::into).collect());
        self
    }

    pub fn batch_size(mut self, rows: usize) -> Self {
        self.batch_size = Some(rows);
        self
    }

    pub fn table(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn mapping(&self) -> MappingOptions {
        MappingOptions {
            explicit_members: self.explicit_members.clone(),
            keep_identity: self.keep_identity,
            include_row_version: self.include_row_version,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Options for creating a temp table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TempTableCreationOptions {
    /// Append a random suffix to the table name (default: true)
    #[serde(default = "default_true")]
    pub make_table_name_unique: bool,

    /// Emit a PRIMARY KEY clause (default: true)
    #[serde(default = "default_true")]
    pub create_primary_key: bool,

    /// Base table name, overriding the entity's table name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,

    /// Key policy override for keyless entities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key_fallback: Option<PrimaryKeyFallback>,
}

impl Default for TempTableCreationOptions {
    fn default() -> Self {
        Self {
            make_table_name_unique: true,
            create_primary_key: true,
            table_name: None,
            primary_key_fallback: None,
        }
    }
}

impl TempTableCreationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the base name as-is, replacing any existing table of that name
    pub fn stable_name(mut self) -> Self {
        self.make_table_name_unique = false;
        self
    }

    pub fn without_primary_key(mut self) -> Self {
        self.create_primary_key = false;
        self
    }

    pub fn table(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    pub fn primary_key_fallback(mut self, fallback: PrimaryKeyFallback) -> Self {
        self.primary_key_fallback = Some(fallback);
        self
    }
}

/// Options for creating a temp table and filling it in one call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkInsertIntoTempTableOptions {
    #[serde(default)]
    pub temp_table: TempTableCreationOptions,

    /// Insert options; `table_name` and `schema` are ignored
    #[serde(default)]
    pub insert: BulkInsertOptions,
}
