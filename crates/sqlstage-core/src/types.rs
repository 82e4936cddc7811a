//! SQL column types.

use serde::{Deserialize, Serialize};

/// The SQL type of a single column.
///
/// Only atomic column shapes are represented here. Nested objects and collections
/// never map to one column; the stage engine expands them into several columns or
/// a child table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    /// `BOOLEAN`
    Boolean,
    /// `TINYINT` (8-bit signed)
    TinyInt,
    /// `SMALLINT` (16-bit signed)
    SmallInt,
    /// `INT` (32-bit signed)
    Integer,
    /// `BIGINT` (64-bit signed)
    BigInt,
    /// `FLOAT` (32-bit IEEE)
    Real,
    /// `DOUBLE` (64-bit IEEE)
    Double,
    /// `TEXT`
    Text,
}

impl SqlType {
    /// Get the SQL name used in DDL.
    #[must_use]
    pub const fn sql_name(&self) -> &'static str {
        match self {
            SqlType::Boolean => "BOOLEAN",
            SqlType::TinyInt => "TINYINT",
            SqlType::SmallInt => "SMALLINT",
            SqlType::Integer => "INT",
            SqlType::BigInt => "BIGINT",
            SqlType::Real => "FLOAT",
            SqlType::Double => "DOUBLE",
            SqlType::Text => "TEXT",
        }
    }

    /// Whether this is one of the integer types.
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(
            self,
            SqlType::TinyInt | SqlType::SmallInt | SqlType::Integer | SqlType::BigInt
        )
    }

    /// Whether this is a floating point type.
    #[must_use]
    pub const fn is_float(&self) -> bool {
        matches!(self, SqlType::Real | SqlType::Double)
    }

    /// Parse a SQL type name (case-insensitive).
    ///
    /// Accepts the names produced by [`SqlType::sql_name`] plus a few common aliases.
    #[must_use]
    pub fn from_sql_name(name: &str) -> Option<Self> {
        match name.trim().to_uppercase().as_str() {
            "BOOLEAN" | "BOOL" => Some(SqlType::Boolean),
            "TINYINT" => Some(SqlType::TinyInt),
            "SMALLINT" => Some(SqlType::SmallInt),
            "INT" | "INTEGER" => Some(SqlType::Integer),
            "BIGINT" => Some(SqlType::BigInt),
            "FLOAT" | "REAL" => Some(SqlType::Real),
            "DOUBLE" | "DOUBLE PRECISION" => Some(SqlType::Double),
            "TEXT" | "VARCHAR" => Some(SqlType::Text),
            _ => None,
        }
    }
}

impl std::fmt::Display for SqlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.sql_name())
    }
}
