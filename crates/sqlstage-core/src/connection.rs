//! Query execution contracts.
//!
//! The engine never owns a database connection. It hands statements to a
//! [`QueryExecutor`] supplied by the caller and reads results through a [`Cursor`].
//! Any serialization of writes (one connection at a time, transactions) is the
//! executor's business.

use crate::error::{Error, Result};
use crate::row::Row;
use crate::value::Value;

/// Forward-only view over a materialized query result.
pub trait Cursor {
    /// Advance to the next row. Returns `false` once the result is exhausted.
    fn next(&mut self) -> Result<bool>;

    /// Raw value of a column in the current row.
    fn value_of(&self, column: &str) -> Result<Value>;
}

/// The database driver the engine calls into.
pub trait QueryExecutor {
    /// Run a query and hand its fully materialized result to `handler`.
    ///
    /// The handler runs exactly once on success. Errors returned by the handler must
    /// be passed back unchanged.
    fn execute_query(
        &self,
        statement: &str,
        handler: &mut dyn FnMut(&mut dyn Cursor) -> Result<()>,
    ) -> Result<()>;

    /// Run a statement that returns no rows, yielding the affected row count.
    fn execute_update(&self, statement: &str) -> Result<u64>;
}

/// A [`Cursor`] over rows that are already in memory.
#[derive(Debug, Clone)]
pub struct RowCursor<'a> {
    rows: &'a [Row],
    position: Option<usize>,
}

impl<'a> RowCursor<'a> {
    /// Create a cursor positioned before the first row.
    pub fn new(rows: &'a [Row]) -> Self {
        Self {
            rows,
            position: None,
        }
    }

    /// The row the cursor is positioned on.
    pub fn current(&self) -> Option<&'a Row> {
        self.position.and_then(|index| self.rows.get(index))
    }
}

impl Cursor for RowCursor<'_> {
    fn next(&mut self) -> Result<bool> {
        let next = self.position.map_or(0, |index| index + 1);
        self.position = Some(next.min(self.rows.len()));
        Ok(next < self.rows.len())
    }

    fn value_of(&self, column: &str) -> Result<Value> {
        let row = self
            .current()
            .ok_or_else(|| Error::Custom("cursor is not positioned on a row".to_string()))?;
        row.get_named(column)
            .cloned()
            .ok_or_else(|| Error::MissingColumn {
                column: column.to_string(),
            })
    }
}
