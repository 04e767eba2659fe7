//! SQL utilities for bulk operations
//!
//! Provides DDL generation, COPY encoding, rendering and sanitization.

pub mod copy;
pub mod ddl;
pub mod dialect;
pub mod sanitize;

pub use copy::{copy_in_statement, encode_copy_value, encode_row};
pub use ddl::DdlGenerator;
pub use dialect::{PostgresRenderer, SqlRenderer};
pub use sanitize::{
    POSTGRES_MAX_IDENTIFIER_LENGTH, quote_identifier, quote_qualified, validate_identifier,
};
