//! Foreign key correlation for sqlstage.
//!
//! `sqlstage-schema` converts a parent table's identity into the columns, constraints
//! and values a child table needs. Collection stages call it when they derive a
//! child schema and when they generate child inserts.

pub mod foreign_key;

pub use foreign_key::{
    ForeignKey, ForeignKeyObject, to_column_defs, to_column_values, to_foreign_links,
};
