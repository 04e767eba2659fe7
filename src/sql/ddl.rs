//! DDL Generation for Temporary Tables
//!
//! Generates the statements that materialize and tear down staging tables.

use crate::entity::ColumnDescriptor;
use crate::sql::dialect::SqlRenderer;
use crate::temp_table::TableDescriptor;

/// DDL Generator for temporary tables
pub struct DdlGenerator<'a> {
    renderer: &'a dyn SqlRenderer,
}

impl<'a> DdlGenerator<'a> {
    /// Create a new DDL generator rendering through `renderer`
    pub fn new(renderer: &'a dyn SqlRenderer) -> Self {
        Self { renderer }
    }

    /// Generate the statements that create the table in `descriptor`
    ///
    /// A stable (non-unique) name is dropped first so recreation starts from
    /// an empty table.
    pub fn generate_temp_table<T>(&self, descriptor: &TableDescriptor<'_, T>) -> Vec<String> {
        let mut statements = Vec::with_capacity(2);
        if !descriptor.is_unique() {
            statements.push(self.generate_drop_temp_table(descriptor.effective_name()));
        }
        statements.push(self.generate_create_temp_table(
            descriptor.effective_name(),
            descriptor.columns(),
            &descriptor.key_columns(),
        ));
        statements
    }

    /// Generate CREATE TEMPORARY TABLE with an optional primary key
    pub fn generate_create_temp_table<T>(
        &self,
        table_name: &str,
        columns: &[&ColumnDescriptor<T>],
        key_columns: &[&ColumnDescriptor<T>],
    ) -> String {
        let mut lines: Vec<String> = columns
            .iter()
            .map(|col| {
                let in_key = key_columns.iter().any(|k| k.name == col.name);
                self.format_column_definition(col, in_key)
            })
            .collect();

        if !key_columns.is_empty() {
            let keys: Vec<String> = key_columns
                .iter()
                .map(|k| self.renderer.quote_identifier(&k.name))
                .collect();
            lines.push(format!("PRIMARY KEY ({})", keys.join(", ")));
        }

        format!(
            "CREATE TEMPORARY TABLE {}\n(\n    {}\n)",
            self.renderer.quote_identifier(table_name),
            lines.join(",\n    ")
        )
    }

    /// Generate DROP TABLE for a temporary table
    pub fn generate_drop_temp_table(&self, table_name: &str) -> String {
        format!(
            "DROP TABLE IF EXISTS {}",
            self.renderer
                .qualify(Some(self.renderer.temp_schema()), table_name)
        )
    }

    /// Format a single column definition
    ///
    /// Key and identity columns are always NOT NULL. Identity columns get no
    /// DEFAULT; PostgreSQL rejects both on one column. Blank default
    /// expressions and NULL literals add no DEFAULT clause.
    pub fn format_column_definition<T>(&self, col: &ColumnDescriptor<T>, in_key: bool) -> String {
        let mut parts = vec![
            self.renderer.quote_identifier(&col.name),
            self.renderer.render_type(&col.sql_type, col.ddl_type.as_deref()),
        ];

        if col.nullable && !in_key && !col.is_auto_increment {
            parts.push("NULL".to_string());
        } else {
            parts.push("NOT NULL".to_string());
        }

        let default_sql = col
            .default_value_sql
            .as_deref()
            .map(str::trim)
            .filter(|expr| !expr.is_empty());
        let default_value = col.default_value.as_ref().filter(|v| !v.is_null());

        if col.is_auto_increment {
            parts.push(self.renderer.identity_clause().to_string());
        } else if let Some(expr) = default_sql {
            parts.push(format!("DEFAULT ({})", expr));
        } else if let Some(value) = default_value {
            parts.push(format!("DEFAULT {}", self.renderer.render_literal(value)));
        }

        parts.join(" ")
    }
}
