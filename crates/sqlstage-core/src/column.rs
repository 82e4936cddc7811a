//! Column definitions for generated tables.

use crate::types::SqlType;

/// A column definition contributed to a `CREATE TABLE` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    /// Column name in the database.
    pub name: String,
    /// SQL type.
    pub sql_type: SqlType,
    /// Whether this column is nullable.
    pub nullable: bool,
    /// Whether this column is part of the primary key.
    pub primary_key: bool,
}

impl ColumnDef {
    /// Create a new nullable, non-key column definition.
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
            nullable: true,
            primary_key: false,
        }
    }

    /// Mark as `NOT NULL`.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Mark as primary key (implies `NOT NULL`).
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_def_defaults() {
        let col = ColumnDef::new("tags_value", SqlType::Text);
        assert_eq!(col.name, "tags_value");
        assert!(col.nullable);
        assert!(!col.primary_key);
    }

    #[test]
    fn test_primary_key_implies_not_null() {
        let col = ColumnDef::new("id", SqlType::BigInt).primary_key();
        assert!(col.primary_key);
        assert!(!col.nullable);
    }
}
