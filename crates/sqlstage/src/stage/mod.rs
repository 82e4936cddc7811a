//! The three persistence stages and the passes they share.
//!
//! A mapping pass walks a root record field by field. Each field's declared type is
//! resolved through the [`StageRegistry`] and the resulting [`Stage`] contributes
//! schema columns, write values or hydrated data. Embedded stages recurse into the
//! nested record with a composite row name; collection stages spill into a child
//! table keyed by the root's primary key.
//!
//! Each pass collects its statements in memory and returns them only after the walk
//! finished, so a resolution error never leaves a partial schema or insert behind.

mod collection;
mod embedded;
mod scalar;

pub use collection::CollectionStage;
pub use embedded::EmbeddedStage;
pub use scalar::ScalarStage;

use std::collections::HashSet;

use sqlstage_core::{
    ColumnDef, Cursor, Datum, Error, FieldDescriptor, QueryExecutor, Result, TypeRef, Value,
};
use sqlstage_query::StatementBuilder;
use sqlstage_schema::{ForeignKey, ForeignKeyObject};

use crate::config::MapperConfig;
use crate::reflector::RepositoryClass;
use crate::registry::StageRegistry;
use crate::view::ResultView;

/// Persistence strategy for one category of field shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// One field, one column.
    Scalar(ScalarStage),
    /// Nested record flattened into sibling columns.
    Embedded(EmbeddedStage),
    /// Multi-valued field stored as child table rows.
    Collection(CollectionStage),
}

impl Stage {
    /// Short name used in logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Stage::Scalar(_) => "scalar",
            Stage::Embedded(_) => "embedded",
            Stage::Collection(_) => "collection",
        }
    }

    /// Whether this is the scalar stage.
    pub fn is_scalar(&self) -> bool {
        matches!(self, Stage::Scalar(_))
    }

    pub(crate) fn collect_schema(
        &self,
        ctx: &MappingContext<'_>,
        field: &FieldDescriptor,
        row_name: &str,
        pass: &mut SchemaPass,
    ) -> Result<()> {
        match self {
            Stage::Scalar(stage) => stage.collect_schema(field, row_name, pass),
            Stage::Embedded(stage) => {
                let class = embedded_class(ctx, field)?;
                stage.collect_schema(ctx, &class, Some(row_name), pass)
            }
            Stage::Collection(stage) => stage.collect_schema(ctx, field, row_name, pass),
        }
    }

    pub(crate) fn collect_write(
        &self,
        ctx: &MappingContext<'_>,
        field: &FieldDescriptor,
        row_name: &str,
        datum: Datum,
        pass: &mut WritePass,
    ) -> Result<()> {
        match self {
            Stage::Scalar(stage) => stage.collect_write(field, row_name, datum, pass),
            Stage::Embedded(stage) => {
                let class = embedded_class(ctx, field)?;
                let nested = datum.into_object()?;
                stage.collect_write(ctx, &class, Some(row_name), nested.as_deref(), pass)
            }
            Stage::Collection(stage) => stage.collect_write(ctx, field, row_name, datum, pass),
        }
    }

    pub(crate) fn hydrate(
        &self,
        ctx: &MappingContext<'_>,
        field: &FieldDescriptor,
        row_name: &str,
        pass: &mut HydrationPass<'_>,
    ) -> Result<Datum> {
        match self {
            Stage::Scalar(stage) => stage.hydrate(field, row_name, pass),
            Stage::Embedded(stage) => {
                let class = embedded_class(ctx, field)?;
                stage.hydrate(ctx, &class, Some(row_name), field.ty.is_nullable(), pass)
            }
            Stage::Collection(stage) => stage.hydrate(ctx, field, row_name, pass),
        }
    }
}

/// Class of an embedded field.
///
/// A nullable record may not own a collection at any depth: a `NULL` record and a
/// record with empty collections would read back alike.
fn embedded_class(ctx: &MappingContext<'_>, field: &FieldDescriptor) -> Result<RepositoryClass> {
    let class = RepositoryClass::of(&field.ty)?;
    if field.ty.is_nullable() && owns_collection(ctx, &class)? {
        return Err(Error::stage_not_supported(
            field.ty.name(),
            "nullable record with collections",
        ));
    }
    Ok(class)
}

fn owns_collection(ctx: &MappingContext<'_>, class: &RepositoryClass) -> Result<bool> {
    for row in class.rows() {
        match ctx.resolve(&row.ty)? {
            Stage::Scalar(_) => {}
            Stage::Collection(_) => return Ok(true),
            Stage::Embedded(_) => {
                if owns_collection(ctx, &RepositoryClass::of(&row.ty)?)? {
                    return Ok(true);
                }
            }
        }
    }
    Ok(false)
}

/// Shared, read-only inputs of one mapping pass.
pub(crate) struct MappingContext<'a> {
    registry: &'a StageRegistry,
    config: &'a MapperConfig,
    builder: StatementBuilder,
}

impl<'a> MappingContext<'a> {
    pub(crate) fn new(registry: &'a StageRegistry, config: &'a MapperConfig) -> Self {
        Self {
            registry,
            config,
            builder: config.statement_builder(),
        }
    }

    pub(crate) fn resolve(&self, ty: &TypeRef) -> Result<&'a Stage> {
        self.registry.resolve(ty)
    }

    pub(crate) fn config(&self) -> &'a MapperConfig {
        self.config
    }

    pub(crate) fn builder(&self) -> &StatementBuilder {
        &self.builder
    }
}

/// `<prefix>_<row>` or just `<row>` at the root.
pub(crate) fn composite_name(prefix: Option<&str>, row_name: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}_{}", prefix, row_name),
        None => row_name.to_string(),
    }
}

/// `<table>_<row>`.
pub(crate) fn child_table_name(table: &str, row_name: &str) -> String {
    format!("{}_{}", table, row_name)
}

/// Column and child table names taken within one table.
#[derive(Debug)]
pub(crate) struct RowNames {
    table: String,
    columns: HashSet<String>,
    tables: HashSet<String>,
}

impl RowNames {
    pub(crate) fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: HashSet::new(),
            tables: HashSet::from([table.to_string()]),
        }
    }

    pub(crate) fn claim_column(&mut self, column: &str) -> Result<()> {
        if self.columns.insert(column.to_string()) {
            Ok(())
        } else {
            Err(self.duplicate(column))
        }
    }

    pub(crate) fn claim_table(&mut self, table: &str) -> Result<()> {
        if self.tables.insert(table.to_string()) {
            Ok(())
        } else {
            Err(self.duplicate(table))
        }
    }

    fn duplicate(&self, name: &str) -> Error {
        Error::DuplicateRowName {
            table: self.table.clone(),
            name: name.to_string(),
        }
    }
}

/// Accumulator of a schema walk.
#[derive(Debug)]
pub(crate) struct SchemaPass {
    pub(crate) table: String,
    pub(crate) keys: Vec<ForeignKey>,
    pub(crate) columns: Vec<ColumnDef>,
    pub(crate) statements: Vec<String>,
    pub(crate) names: RowNames,
}

impl SchemaPass {
    pub(crate) fn new(table: impl Into<String>, keys: Vec<ForeignKey>) -> Self {
        let table = table.into();
        Self {
            names: RowNames::new(&table),
            table,
            keys,
            columns: Vec::new(),
            statements: Vec::new(),
        }
    }

    pub(crate) fn is_key_column(&self, column: &str) -> bool {
        self.keys.iter().any(|key| key.column == column)
    }
}

/// Which statement a write walk produces for the root row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteMode {
    Insert,
    Update,
}

/// Accumulator of an insert or update walk.
#[derive(Debug)]
pub(crate) struct WritePass {
    pub(crate) root_type: &'static str,
    pub(crate) mode: WriteMode,
    pub(crate) table: String,
    pub(crate) keys: Vec<ForeignKeyObject>,
    pub(crate) values: Vec<(String, Value)>,
    pub(crate) statements: Vec<String>,
    pub(crate) names: RowNames,
}

impl WritePass {
    pub(crate) fn new(
        root_type: &'static str,
        mode: WriteMode,
        table: impl Into<String>,
        keys: Vec<ForeignKeyObject>,
    ) -> Self {
        let table = table.into();
        Self {
            root_type,
            mode,
            names: RowNames::new(&table),
            table,
            keys,
            values: Vec::new(),
            statements: Vec::new(),
        }
    }
}

/// State of a hydration walk over one root row.
pub(crate) struct HydrationPass<'a> {
    pub(crate) table: String,
    pub(crate) executor: &'a dyn QueryExecutor,
    pub(crate) cursor: &'a dyn Cursor,
    pub(crate) view: ResultView,
}

impl<'a> HydrationPass<'a> {
    pub(crate) fn new(
        table: impl Into<String>,
        executor: &'a dyn QueryExecutor,
        cursor: &'a dyn Cursor,
    ) -> Self {
        Self {
            table: table.into(),
            executor,
            cursor,
            view: ResultView::new(),
        }
    }

    /// Copy a root row column into the view.
    pub(crate) fn load(&mut self, column: &str, property: &str) -> Result<()> {
        self.view.load(self.cursor, column, property)
    }
}

pub(crate) fn element_type(field: &FieldDescriptor) -> Result<TypeRef> {
    field
        .element_types()
        .into_iter()
        .next()
        .ok_or_else(|| Error::stage_not_supported(field.ty.name(), "collection without element type"))
}
