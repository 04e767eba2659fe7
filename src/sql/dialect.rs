//! SQL text rendering
//!
//! DDL generation never branches on the target store; everything
//! store-specific goes through a [`SqlRenderer`].

use chrono::SecondsFormat;

use crate::sql::sanitize;
use crate::types::{SqlType, Value};

/// Store-specific SQL text rendering
pub trait SqlRenderer: Send + Sync {
    fn quote_identifier(&self, name: &str) -> String;

    /// Quote a name, prefixed by its schema when one is given
    fn qualify(&self, schema: Option<&str>, name: &str) -> String;

    /// Render a value as a SQL literal, e.g. for a column DEFAULT
    fn render_literal(&self, value: &Value) -> String;

    /// Column type name; an explicit DDL type wins over the derived one
    fn render_type(&self, sql_type: &SqlType, ddl_type: Option<&str>) -> String;

    /// Marker appended to identity columns
    fn identity_clause(&self) -> &'static str;

    /// Schema that holds session-scoped temporary tables
    fn temp_schema(&self) -> &'static str;
}

/// PostgreSQL renderer
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresRenderer;

fn quote_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn render_float(v: f64) -> String {
    if v.is_nan() {
        "'NaN'::double precision".to_string()
    } else if v.is_infinite() {
        let text = if v > 0.0 { "'Infinity'" } else { "'-Infinity'" };
        format!("{}::double precision", text)
    } else {
        v.to_string()
    }
}

impl SqlRenderer for PostgresRenderer {
    fn quote_identifier(&self, name: &str) -> String {
        sanitize::quote_identifier(name)
    }

    fn qualify(&self, schema: Option<&str>, name: &str) -> String {
        sanitize::quote_qualified(schema, name)
    }

    fn render_literal(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(true) => "TRUE".to_string(),
            Value::Bool(false) => "FALSE".to_string(),
            Value::I16(v) => v.to_string(),
            Value::I32(v) => v.to_string(),
            Value::I64(v) => v.to_string(),
            Value::F64(v) => render_float(*v),
            Value::Decimal(v) => v.to_string(),
            Value::Text(s) => quote_string(s),
            Value::Uuid(u) => format!("'{}'::uuid", u),
            Value::Date(d) => format!("'{}'::date", d.format("%Y-%m-%d")),
            Value::Timestamp(ts) => format!(
                "'{}'::timestamptz",
                ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
            ),
            Value::Json(j) => format!("{}::jsonb", quote_string(&j.to_string())),
            Value::Bytes(b) => format!("'\\x{}'::bytea", hex::encode(b)),
        }
    }

    fn render_type(&self, sql_type: &SqlType, ddl_type: Option<&str>) -> String {
        match ddl_type {
            Some(explicit) => explicit.to_string(),
            None => sql_type.to_sql_type(),
        }
    }

    fn identity_clause(&self) -> &'static str {
        "GENERATED BY DEFAULT AS IDENTITY"
    }

    fn temp_schema(&self) -> &'static str {
        "pg_temp"
    }
}
