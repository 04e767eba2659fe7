//! Core type definitions for bulk operations
//!
//! Includes SQL column types and the literal values read from source objects.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Column Types
// ============================================================================

/// Dialect-neutral column type with coercion rules
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SqlType {
    /// 16-bit integer (maps to SMALLINT)
    SmallInt,

    /// 32-bit integer (maps to INTEGER)
    Integer,

    /// 64-bit integer (maps to BIGINT)
    BigInt,

    /// Double precision float (maps to DOUBLE PRECISION)
    Double,

    /// Decimal with precision and scale (maps to NUMERIC)
    Decimal {
        /// Total number of digits (default: 19)
        #[serde(default = "default_precision")]
        precision: u8,
        /// Number of digits after decimal point (default: 4)
        #[serde(default = "default_scale")]
        scale: u8,
    },

    /// Boolean (maps to BOOLEAN)
    Boolean,

    /// Text of unlimited length (maps to TEXT)
    Text,

    /// UUID (maps to UUID)
    Uuid,

    /// Calendar date (maps to DATE)
    Date,

    /// Timestamp, always stored in UTC (maps to TIMESTAMP WITH TIME ZONE)
    Timestamp,

    /// Binary JSON (maps to JSONB)
    Json,

    /// Raw bytes (maps to BYTEA)
    Bytes,
}

fn default_precision() -> u8 {
    19
}

fn default_scale() -> u8 {
    4
}

/// Largest integer a double can hold without losing precision
const MAX_EXACT_F64_INT: u64 = 1 << 53;

impl SqlType {
    /// Create a Decimal type with specified precision and scale
    pub fn decimal(precision: u8, scale: u8) -> Self {
        SqlType::Decimal { precision, scale }
    }

    /// Convert to PostgreSQL type string
    pub fn to_sql_type(&self) -> String {
        match self {
            SqlType::SmallInt => "SMALLINT".to_string(),
            SqlType::Integer => "INTEGER".to_string(),
            SqlType::BigInt => "BIGINT".to_string(),
            SqlType::Double => "DOUBLE PRECISION".to_string(),
            SqlType::Decimal { precision, scale } => {
                format!("NUMERIC({},{})", precision, scale)
            }
            SqlType::Boolean => "BOOLEAN".to_string(),
            SqlType::Text => "TEXT".to_string(),
            SqlType::Uuid => "UUID".to_string(),
            SqlType::Date => "DATE".to_string(),
            SqlType::Timestamp => "TIMESTAMP WITH TIME ZONE".to_string(),
            SqlType::Json => "JSONB".to_string(),
            SqlType::Bytes => "BYTEA".to_string(),
        }
    }

    /// Whether the store can generate values for this type as an identity column
    pub fn supports_identity(&self) -> bool {
        matches!(self, SqlType::SmallInt | SqlType::Integer | SqlType::BigInt)
    }

    /// Coerce a source value into this type's family
    ///
    /// NULL passes through untouched; nullability is checked by the caller.
    /// On mismatch the error carries the actual value type.
    pub fn coerce(&self, value: Value) -> Result<Value, String> {
        let actual = value.type_name();
        let coerced = match (self, value) {
            (_, Value::Null) => Some(Value::Null),

            (SqlType::SmallInt, Value::I16(v)) => Some(Value::I16(v)),
            (SqlType::SmallInt, Value::I32(v)) => i16::try_from(v).ok().map(Value::I16),
            (SqlType::SmallInt, Value::I64(v)) => i16::try_from(v).ok().map(Value::I16),

            (SqlType::Integer, Value::I16(v)) => Some(Value::I32(v.into())),
            (SqlType::Integer, Value::I32(v)) => Some(Value::I32(v)),
            (SqlType::Integer, Value::I64(v)) => i32::try_from(v).ok().map(Value::I32),

            (SqlType::BigInt, Value::I16(v)) => Some(Value::I64(v.into())),
            (SqlType::BigInt, Value::I32(v)) => Some(Value::I64(v.into())),
            (SqlType::BigInt, Value::I64(v)) => Some(Value::I64(v)),

            (SqlType::Double, Value::F64(v)) => Some(Value::F64(v)),
            (SqlType::Double, Value::I16(v)) => Some(Value::F64(v.into())),
            (SqlType::Double, Value::I32(v)) => Some(Value::F64(v.into())),
            (SqlType::Double, Value::I64(v)) if v.unsigned_abs() <= MAX_EXACT_F64_INT => {
                Some(Value::F64(v as f64))
            }

            (SqlType::Decimal { .. }, Value::Decimal(v)) => Some(Value::Decimal(v)),
            (SqlType::Decimal { .. }, Value::I16(v)) => Some(Value::Decimal(v.into())),
            (SqlType::Decimal { .. }, Value::I32(v)) => Some(Value::Decimal(v.into())),
            (SqlType::Decimal { .. }, Value::I64(v)) => Some(Value::Decimal(v.into())),
            (SqlType::Decimal { .. }, Value::F64(v)) => {
                Decimal::try_from(v).ok().map(Value::Decimal)
            }

            (SqlType::Boolean, Value::Bool(v)) => Some(Value::Bool(v)),
            (SqlType::Text, Value::Text(v)) => Some(Value::Text(v)),

            (SqlType::Uuid, Value::Uuid(v)) => Some(Value::Uuid(v)),
            (SqlType::Uuid, Value::Text(s)) => Uuid::parse_str(&s).ok().map(Value::Uuid),

            (SqlType::Date, Value::Date(v)) => Some(Value::Date(v)),
            (SqlType::Timestamp, Value::Timestamp(v)) => Some(Value::Timestamp(v)),
            (SqlType::Json, Value::Json(v)) => Some(Value::Json(v)),
            (SqlType::Bytes, Value::Bytes(v)) => Some(Value::Bytes(v)),

            _ => None,
        };

        coerced.ok_or_else(|| actual.to_string())
    }
}

// ============================================================================
// Values
// ============================================================================

/// A literal read from a source object
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F64(f64),
    Decimal(Decimal),
    Text(String),
    Uuid(Uuid),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Json(serde_json::Value),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the value's type, used in mapping errors
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::I16(_) => "smallint",
            Value::I32(_) => "integer",
            Value::I64(_) => "bigint",
            Value::F64(_) => "double",
            Value::Decimal(_) => "decimal",
            Value::Text(_) => "text",
            Value::Uuid(_) => "uuid",
            Value::Date(_) => "date",
            Value::Timestamp(_) => "timestamp",
            Value::Json(_) => "json",
            Value::Bytes(_) => "bytes",
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::I16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl<V: Into<Value>> From<Option<V>> for Value {
    fn from(v: Option<V>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
