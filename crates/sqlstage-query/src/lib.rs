//! SQL statement text for sqlstage.
//!
//! `sqlstage-query` is the **text builder layer**: it turns column definitions and
//! column/value pairs into the `CREATE TABLE`, `INSERT`, `UPDATE`, `DELETE` and
//! `SELECT` statements the stage engine emits. It knows nothing about Rust types or
//! stages.

pub mod builder;

pub use builder::{ForeignLink, StatementBuilder};
