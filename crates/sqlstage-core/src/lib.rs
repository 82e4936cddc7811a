//! Core types and traits for sqlstage.
//!
//! `sqlstage-core` is the **foundation layer** of the workspace. It defines the data
//! types and contracts that the stage engine builds on.
//!
//! # Role In The Architecture
//!
//! - **Type introspector**: `TypeRef`, `Persist`, `Entity`, `Mapped` and the
//!   [`introspect`] functions give the engine field enumeration, field read/write and
//!   zero-value allocation without runtime reflection. `#[derive(Mapped)]` generates
//!   the accessor tables.
//! - **Data model**: `Value`, `SqlType`, `Row` and `ColumnDef` represent column values,
//!   column shapes and result rows, shared by the query, schema and facade crates.
//! - **Collaborator contracts**: `QueryExecutor` and `Cursor` describe the database
//!   driver the engine calls into. The engine never talks to a database directly.
//!
//! Most applications should use the `sqlstage` facade; reach for `sqlstage-core`
//! directly when writing executors or hand-written `Persist` impls.

pub mod column;
pub mod connection;
pub mod error;
pub mod field;
pub mod identifiers;
pub mod introspect;
pub mod reflect;
pub mod row;
pub mod types;
pub mod value;

pub use column::ColumnDef;
pub use connection::{Cursor, QueryExecutor, RowCursor};
pub use error::{ConversionError, Error, FieldAccessError, FieldAccessKind, QueryError, Result};
pub use field::FieldDescriptor;
pub use identifiers::{is_plain_identifier, quote_ident, sanitize_identifier};
pub use reflect::{
    Datum, Entity, Mapped, Persist, RecordInfo, SequenceInfo, Shape, TypeRef, allocate_default,
};
pub use row::Row;
pub use types::SqlType;
pub use value::Value;
