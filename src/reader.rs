//! Row projection over in-memory objects
//!
//! [`EntityRowReader`] turns a sequence of `&T` into a forward-only cursor of
//! positional, typed values aligned with a resolved column list. Values are
//! read through each column's accessor only when asked for, so a reader over a
//! large slice holds one row's worth of state at a time.

use crate::entity::{ColumnDescriptor, Getter};
use crate::error::{BulkError, Result};
use crate::types::{SqlType, Value};

/// Forward-only cursor consumed by a bulk-copy protocol
pub trait RowCursor: Send {
    /// Number of values in every row
    fn field_count(&self) -> usize;

    /// Destination column name at `index`
    fn column_name(&self, index: usize) -> Option<&str>;

    /// Move to the next row; false once the source is exhausted
    fn advance(&mut self) -> bool;

    /// Typed value of the current row at `index`
    fn value_at(&self, index: usize) -> Result<Value>;
}

struct ReadColumn<T> {
    name: String,
    sql_type: SqlType,
    nullable: bool,
    getter: Getter<T>,
}

/// Reads resolved columns from a sequence of objects
pub struct EntityRowReader<'a, T, I>
where
    I: Iterator<Item = &'a T>,
{
    columns: Vec<ReadColumn<T>>,
    source: I,
    current: Option<&'a T>,
    rows_read: u64,
}

impl<'a, T, I> EntityRowReader<'a, T, I>
where
    T: 'a,
    I: Iterator<Item = &'a T>,
{
    /// Build a reader, resolving each column's getter once
    pub fn new<S>(objects: S, columns: &[&ColumnDescriptor<T>]) -> Result<Self>
    where
        S: IntoIterator<Item = &'a T, IntoIter = I>,
    {
        let columns = columns
            .iter()
            .map(|col| {
                let getter = col.accessor.getter().cloned().ok_or_else(|| {
                    BulkError::configuration(format!(
                        "Column '{}' has no accessor on the source objects",
                        col.name
                    ))
                })?;
                Ok(ReadColumn {
                    name: col.name.clone(),
                    sql_type: col.sql_type.clone(),
                    nullable: col.nullable,
                    getter,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            columns,
            source: objects.into_iter(),
            current: None,
            rows_read: 0,
        })
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Rows produced so far
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }
}

impl<'a, T, I> RowCursor for EntityRowReader<'a, T, I>
where
    T: Sync + 'a,
    I: Iterator<Item = &'a T> + Send,
{
    fn field_count(&self) -> usize {
        self.columns.len()
    }

    fn column_name(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(|c| c.name.as_str())
    }

    fn advance(&mut self) -> bool {
        self.current = self.source.next();
        if self.current.is_some() {
            self.rows_read += 1;
            true
        } else {
            false
        }
    }

    fn value_at(&self, index: usize) -> Result<Value> {
        let Some(object) = self.current else {
            return Err(BulkError::configuration(
                "No current row; advance the cursor before reading values",
            ));
        };
        let column = self.columns.get(index).ok_or_else(|| {
            BulkError::configuration(format!(
                "Column index {} out of range for {} columns",
                index,
                self.columns.len()
            ))
        })?;

        let value = column
            .sql_type
            .coerce((column.getter)(object))
            .map_err(|actual| {
                BulkError::type_mapping(&column.name, column.sql_type.to_sql_type(), actual)
            })?;

        if value.is_null() && !column.nullable {
            return Err(BulkError::type_mapping(
                &column.name,
                format!("{} NOT NULL", column.sql_type.to_sql_type()),
                "null",
            ));
        }

        Ok(value)
    }
}
