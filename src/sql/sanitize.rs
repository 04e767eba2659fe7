//! SQL Identifier Sanitization Utilities
//!
//! Provides functions to safely quote and validate SQL identifiers. Entity
//! metadata may use mixed-case names ("Id", "OrderLines"), so every identifier
//! is always emitted quoted.

use std::sync::LazyLock;

use regex::Regex;

/// PostgreSQL truncates identifiers longer than this many bytes
pub const POSTGRES_MAX_IDENTIFIER_LENGTH: usize = 63;

static CONTROL_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x00-\x1f\x7f]").expect("valid control character pattern"));

/// Quote a SQL identifier to make it safe for use in queries
///
/// # Example
/// ```
/// use runtara_bulk::sql::quote_identifier;
///
/// let quoted = quote_identifier("OrderLines");
/// assert_eq!(quoted, "\"OrderLines\"");
/// ```
pub fn quote_identifier(identifier: &str) -> String {
    // Escape any double quotes in the identifier by doubling them
    let escaped = identifier.replace('"', "\"\"");
    format!("\"{}\"", escaped)
}

/// Quote a possibly schema-qualified name
pub fn quote_qualified(schema: Option<&str>, name: &str) -> String {
    match schema {
        Some(schema) => format!("{}.{}", quote_identifier(schema), quote_identifier(name)),
        None => quote_identifier(name),
    }
}

/// Validate a table or column name
///
/// Rules:
/// - Must not be empty
/// - Must fit PostgreSQL's identifier length limit
/// - Must not contain control characters
///
/// # Example
/// ```
/// use runtara_bulk::sql::validate_identifier;
///
/// assert!(validate_identifier("OrderLines").is_ok());
/// assert!(validate_identifier("").is_err());
/// assert!(validate_identifier("bad\nname").is_err());
/// ```
pub fn validate_identifier(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Identifier cannot be empty".to_string());
    }

    if name.len() > POSTGRES_MAX_IDENTIFIER_LENGTH {
        return Err(format!(
            "Identifier '{}' is {} bytes long; PostgreSQL allows at most {}.",
            name,
            name.len(),
            POSTGRES_MAX_IDENTIFIER_LENGTH
        ));
    }

    if CONTROL_CHARS.is_match(name) {
        return Err(format!(
            "Identifier '{}' contains control characters.",
            name.escape_debug()
        ));
    }

    Ok(())
}

/// Longest prefix of `name` that fits in `max_bytes` without splitting a character
pub fn truncate_identifier(name: &str, max_bytes: usize) -> &str {
    if name.len() <= max_bytes {
        return name;
    }
    let mut end = max_bytes;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}
