//! COPY FROM STDIN text format encoding
//!
//! Rows are tab-separated and newline-terminated. NULL is `\N`, and
//! backslash, tab, newline and carriage return inside values are escaped.

use std::fmt::Write as _;

use chrono::SecondsFormat;

use crate::error::Result;
use crate::reader::RowCursor;
use crate::sql::dialect::SqlRenderer;
use crate::types::Value;

/// Build `COPY <table> (<columns>) FROM STDIN`
pub fn copy_in_statement(
    renderer: &dyn SqlRenderer,
    schema: Option<&str>,
    table: &str,
    columns: &[String],
) -> String {
    let columns: Vec<String> = columns
        .iter()
        .map(|c| renderer.quote_identifier(c))
        .collect();
    format!(
        "COPY {} ({}) FROM STDIN",
        renderer.qualify(schema, table),
        columns.join(", ")
    )
}

/// Append the cursor's current row to `buf`
pub fn encode_row(rows: &dyn RowCursor, buf: &mut String) -> Result<()> {
    for index in 0..rows.field_count() {
        if index > 0 {
            buf.push('\t');
        }
        encode_copy_value(&rows.value_at(index)?, buf)?;
    }
    buf.push('\n');
    Ok(())
}

/// Append one value in COPY text format
pub fn encode_copy_value(value: &Value, buf: &mut String) -> Result<()> {
    // Writing into a String cannot fail
    match value {
        Value::Null => buf.push_str("\\N"),
        Value::Bool(true) => buf.push('t'),
        Value::Bool(false) => buf.push('f'),
        Value::I16(v) => {
            let _ = write!(buf, "{}", v);
        }
        Value::I32(v) => {
            let _ = write!(buf, "{}", v);
        }
        Value::I64(v) => {
            let _ = write!(buf, "{}", v);
        }
        Value::F64(v) => {
            if v.is_nan() {
                buf.push_str("NaN");
            } else if v.is_infinite() {
                buf.push_str(if *v > 0.0 { "Infinity" } else { "-Infinity" });
            } else {
                let _ = write!(buf, "{}", v);
            }
        }
        Value::Decimal(v) => {
            let _ = write!(buf, "{}", v);
        }
        Value::Text(s) => escape_into(s, buf),
        Value::Uuid(u) => {
            let _ = write!(buf, "{}", u.hyphenated());
        }
        Value::Date(d) => {
            let _ = write!(buf, "{}", d.format("%Y-%m-%d"));
        }
        Value::Timestamp(ts) => buf.push_str(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        Value::Json(j) => escape_into(&serde_json::to_string(j)?, buf),
        Value::Bytes(b) => {
            // bytea hex input, with the backslash itself escaped for COPY
            buf.push_str("\\\\x");
            buf.push_str(&hex::encode(b));
        }
    }
    Ok(())
}

fn escape_into(s: &str, buf: &mut String) {
    for ch in s.chars() {
        match ch {
            '\\' => buf.push_str("\\\\"),
            '\t' => buf.push_str("\\t"),
            '\n' => buf.push_str("\\n"),
            '\r' => buf.push_str("\\r"),
            _ => buf.push(ch),
        }
    }
}
