//! Stage-driven object-relational mapping.
//!
//! `sqlstage` derives a relational schema from Rust types, generates the SQL that
//! persists instances, and rebuilds instances from query results. Each field is
//! classified into one of three stages:
//!
//! - [`ScalarStage`]: one column.
//! - [`EmbeddedStage`]: a nested record flattened into `<parent>_<nested>` columns.
//! - [`CollectionStage`]: a child table `<table>_<field>` keyed by the parent's
//!   primary key, one row per element, values in `<field>_value`.
//!
//! # Quick Start
//!
//! ```ignore
//! use sqlstage::prelude::*;
//!
//! #[derive(Debug, Clone, Default, Mapped)]
//! #[stage(table = "users")]
//! struct User {
//!     #[stage(primary_key)]
//!     id: i64,
//!     name: String,
//!     tags: Vec<String>,
//! }
//!
//! let mapper = Mapper::new();
//! mapper.create_schema::<User>(&executor)?;
//! mapper.persist(&executor, &user)?;
//! let users: Vec<User> = mapper.find_all(&executor)?;
//! ```
//!
//! The database itself is reached only through the [`QueryExecutor`] the caller
//! supplies.

extern crate self as sqlstage;

pub mod config;
pub mod execute;
pub mod mapper;
pub mod reflector;
pub mod registry;
pub mod stage;
pub mod view;

pub use sqlstage_core::{
    ColumnDef, ConversionError, Cursor, Datum, Entity, Error, FieldAccessError, FieldAccessKind,
    FieldDescriptor, Mapped, Persist, QueryError, QueryExecutor, RecordInfo, Result, Row,
    RowCursor, SequenceInfo, Shape, SqlType, TypeRef, Value, allocate_default, introspect,
};
pub use sqlstage_macros::Mapped;
pub use sqlstage_query::{ForeignLink, StatementBuilder};
pub use sqlstage_schema::{
    ForeignKey, ForeignKeyObject, to_column_defs, to_column_values, to_foreign_links,
};

pub use config::{CollectionUpdatePolicy, MapperConfig, QueryFailurePolicy};
pub use mapper::Mapper;
pub use reflector::RepositoryClass;
pub use registry::{StageMatcher, StageRegistry};
pub use stage::{CollectionStage, EmbeddedStage, ScalarStage, Stage};
pub use view::ResultView;

/// Everything needed to map types and run passes.
pub mod prelude {
    pub use crate::{
        CollectionUpdatePolicy, Cursor, Datum, Entity, Error, Mapped, Mapper, MapperConfig,
        Persist, QueryExecutor, QueryFailurePolicy, Result, Row, RowCursor, SqlType, Stage,
        StageMatcher, StageRegistry, TypeRef, Value,
    };
}
