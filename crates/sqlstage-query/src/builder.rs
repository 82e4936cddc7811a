//! Statement text builders for CREATE TABLE, INSERT, UPDATE, DELETE and SELECT.
//!
//! Values are rendered inline as SQL literals. Every statement ends with `;`.

use serde::{Deserialize, Serialize};
use sqlstage_core::{ColumnDef, Value, is_plain_identifier, quote_ident};

/// A `FOREIGN KEY (...) REFERENCES parent (...)` table constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignLink {
    /// Columns in the child table.
    pub columns: Vec<String>,
    /// Referenced table.
    pub parent_table: String,
    /// Referenced columns, matching `columns` position by position.
    pub parent_columns: Vec<String>,
    /// Whether to add `ON DELETE CASCADE`.
    pub on_delete_cascade: bool,
}

impl ForeignLink {
    /// Create a link without cascading deletes.
    pub fn new(
        columns: Vec<String>,
        parent_table: impl Into<String>,
        parent_columns: Vec<String>,
    ) -> Self {
        Self {
            columns,
            parent_table: parent_table.into(),
            parent_columns,
            on_delete_cascade: false,
        }
    }

    /// Set `ON DELETE CASCADE`.
    pub fn cascade(mut self, value: bool) -> Self {
        self.on_delete_cascade = value;
        self
    }
}

/// Renders statement text.
///
/// # Example
///
/// ```ignore
/// let sql = StatementBuilder::new().insert("users_tags", &[
///     ("users_id".to_string(), Value::BigInt(1)),
///     ("tags_value".to_string(), Value::from("a")),
/// ]);
/// assert_eq!(sql, "INSERT INTO users_tags (users_id, tags_value) VALUES (1, 'a');");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementBuilder {
    quote_identifiers: bool,
    if_not_exists: bool,
}

impl Default for StatementBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StatementBuilder {
    /// Builder with unquoted plain identifiers and `IF NOT EXISTS`.
    pub const fn new() -> Self {
        Self {
            quote_identifiers: false,
            if_not_exists: true,
        }
    }

    /// Always quote identifiers.
    pub const fn quote_identifiers(mut self, value: bool) -> Self {
        self.quote_identifiers = value;
        self
    }

    /// Emit `CREATE TABLE IF NOT EXISTS`.
    pub const fn if_not_exists(mut self, value: bool) -> Self {
        self.if_not_exists = value;
        self
    }

    /// Render an identifier. Names that are not plain are always quoted.
    pub fn ident(&self, name: &str) -> String {
        if self.quote_identifiers || !is_plain_identifier(name) {
            quote_ident(name)
        } else {
            name.to_string()
        }
    }

    fn ident_list<S: AsRef<str>>(&self, names: &[S]) -> String {
        names
            .iter()
            .map(|name| self.ident(name.as_ref()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn column_sql(&self, column: &ColumnDef) -> String {
        let mut sql = format!("{} {}", self.ident(&column.name), column.sql_type.sql_name());
        if !column.nullable {
            sql.push_str(" NOT NULL");
        }
        sql
    }

    fn assignments(&self, pairs: &[(String, Value)], separator: &str) -> String {
        pairs
            .iter()
            .map(|(column, value)| format!("{} = {}", self.ident(column), value.to_sql_literal()))
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// `CREATE TABLE` with column definitions, a primary key constraint for columns
    /// flagged as keys, and trailing foreign key links.
    pub fn create_table(&self, table: &str, columns: &[ColumnDef], links: &[ForeignLink]) -> String {
        let mut parts: Vec<String> = columns.iter().map(|c| self.column_sql(c)).collect();

        let primary_key: Vec<&str> = columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect();
        if !primary_key.is_empty() {
            parts.push(format!("PRIMARY KEY ({})", self.ident_list(&primary_key)));
        }

        for link in links {
            let mut constraint = format!(
                "FOREIGN KEY ({}) REFERENCES {} ({})",
                self.ident_list(&link.columns),
                self.ident(&link.parent_table),
                self.ident_list(&link.parent_columns)
            );
            if link.on_delete_cascade {
                constraint.push_str(" ON DELETE CASCADE");
            }
            parts.push(constraint);
        }

        let exists = if self.if_not_exists { "IF NOT EXISTS " } else { "" };
        let sql = format!(
            "CREATE TABLE {}{} ({});",
            exists,
            self.ident(table),
            parts.join(", ")
        );
        tracing::trace!(sql = %sql, "Built CREATE TABLE");
        sql
    }

    /// `INSERT INTO table (columns) VALUES (literals)`.
    pub fn insert(&self, table: &str, pairs: &[(String, Value)]) -> String {
        let columns: Vec<&str> = pairs.iter().map(|(c, _)| c.as_str()).collect();
        let values: Vec<String> = pairs.iter().map(|(_, v)| v.to_sql_literal()).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({});",
            self.ident(table),
            self.ident_list(&columns),
            values.join(", ")
        );
        tracing::trace!(sql = %sql, "Built INSERT");
        sql
    }

    /// `UPDATE table SET ... WHERE ...`. Conditions are joined with `AND`.
    pub fn update(&self, table: &str, set: &[(String, Value)], filter: &[(String, Value)]) -> String {
        let mut sql = format!(
            "UPDATE {} SET {}",
            self.ident(table),
            self.assignments(set, ", ")
        );
        if !filter.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.assignments(filter, " AND "));
        }
        sql.push(';');
        tracing::trace!(sql = %sql, "Built UPDATE");
        sql
    }

    /// `DELETE FROM table WHERE ...`. An empty filter deletes every row.
    pub fn delete_where(&self, table: &str, filter: &[(String, Value)]) -> String {
        let mut sql = format!("DELETE FROM {}", self.ident(table));
        if !filter.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.assignments(filter, " AND "));
        }
        sql.push(';');
        tracing::trace!(sql = %sql, "Built DELETE");
        sql
    }

    /// `SELECT * FROM table`.
    pub fn select_all(&self, table: &str) -> String {
        format!("SELECT * FROM {};", self.ident(table))
    }
}
