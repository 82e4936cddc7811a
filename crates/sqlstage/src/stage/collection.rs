//! Collection stage: a multi-valued field stored as rows of a child table.
//!
//! Child table `<table>_<row>` holds the parent's key columns first, then one value
//! column per element leaf, then the `FOREIGN KEY` links:
//!
//! - scalar element: `<row>_value`
//! - record element: `<field>_value` per element field, and
//!   `<field>_<leaf>_value` for a record nested one level inside the element
//!
//! Schema, write and hydration all derive their columns from the same
//! [`ElementLayout`], so the names written and the names read always agree. A
//! nullable collection field is rejected: `None` and an empty child table would
//! read back alike.

use sqlstage_core::{
    ColumnDef, Cursor, Datum, Entity, Error, FieldDescriptor, Result, TypeRef, Value, introspect,
};
use sqlstage_schema::{to_column_defs, to_column_values, to_foreign_links};

use super::{
    HydrationPass, MappingContext, RowNames, ScalarStage, SchemaPass, Stage, WriteMode,
    WritePass, child_table_name, element_type,
};
use crate::config::CollectionUpdatePolicy;
use crate::execute::query_or_default;
use crate::reflector::RepositoryClass;
use crate::view::ResultView;

/// Maps a multi-valued field to a child table correlated by foreign key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionStage;

/// One scalar value column of an element.
#[derive(Debug, Clone)]
struct ElementLeaf {
    field: FieldDescriptor,
    column: String,
    property: String,
}

impl ElementLeaf {
    fn new(field: FieldDescriptor, property: String) -> Self {
        Self {
            field,
            column: format!("{}_value", property),
            property,
        }
    }

    fn column_def(&self) -> Result<ColumnDef> {
        ScalarStage.column_def(&self.column, &self.field.ty)
    }

    fn write(&self, owner: Option<&dyn Entity>, pairs: &mut Vec<(String, Value)>) -> Result<()> {
        let datum = read_or_null(owner, &self.field)?;
        pairs.push((self.column.clone(), ScalarStage.serialize(&self.field.ty, datum)?));
        Ok(())
    }

    fn read(&self, cursor: &dyn Cursor, view: &mut ResultView) -> Result<Datum> {
        view.load(cursor, &self.column, &self.property)?;
        ScalarStage.materialize(&self.field.ty, view, &self.property)
    }
}

/// One field of a record element.
#[derive(Debug, Clone)]
enum ElementSlot {
    Scalar(ElementLeaf),
    Embedded {
        field: FieldDescriptor,
        class: RepositoryClass,
        leaves: Vec<ElementLeaf>,
    },
}

impl ElementSlot {
    fn field(&self) -> &FieldDescriptor {
        match self {
            ElementSlot::Scalar(leaf) => &leaf.field,
            ElementSlot::Embedded { field, .. } => field,
        }
    }
}

/// Column layout of one collection element.
#[derive(Debug, Clone)]
enum ElementLayout {
    Scalar {
        ty: TypeRef,
        column: String,
    },
    Embedded {
        class: RepositoryClass,
        slots: Vec<ElementSlot>,
    },
}

fn read_or_null(owner: Option<&dyn Entity>, field: &FieldDescriptor) -> Result<Datum> {
    match owner {
        Some(owner) => introspect::read(owner, field),
        None => Ok(Datum::null()),
    }
}

impl ElementLayout {
    /// Resolve the element stage and every element field stage.
    fn resolve(ctx: &MappingContext<'_>, field: &FieldDescriptor, row_name: &str) -> Result<Self> {
        if field.ty.is_nullable() {
            return Err(Error::stage_not_supported(field.ty.name(), "nullable collection"));
        }
        let element = element_type(field)?;
        match ctx.resolve(&element)? {
            Stage::Scalar(_) => Ok(ElementLayout::Scalar {
                ty: element,
                column: format!("{}_value", row_name),
            }),
            Stage::Embedded(_) => {
                let class = RepositoryClass::of(&element)?;
                let mut slots = Vec::with_capacity(class.rows().len());
                for nested in class.rows() {
                    slots.push(Self::resolve_slot(ctx, nested)?);
                }
                Ok(ElementLayout::Embedded { class, slots })
            }
            Stage::Collection(_) => Err(Error::stage_not_supported(
                element.name(),
                "collection element",
            )),
        }
    }

    fn resolve_slot(ctx: &MappingContext<'_>, nested: &FieldDescriptor) -> Result<ElementSlot> {
        match ctx.resolve(&nested.ty)? {
            Stage::Scalar(_) => Ok(ElementSlot::Scalar(ElementLeaf::new(
                *nested,
                nested.row_name().to_string(),
            ))),
            Stage::Embedded(_) => {
                let class = RepositoryClass::of(&nested.ty)?;
                let mut leaves = Vec::with_capacity(class.rows().len());
                for leaf in class.rows() {
                    if !ctx.resolve(&leaf.ty)?.is_scalar() {
                        return Err(Error::stage_not_supported(
                            leaf.ty.name(),
                            "nested field of a collection element",
                        ));
                    }
                    leaves.push(ElementLeaf::new(
                        *leaf,
                        format!("{}_{}", nested.row_name(), leaf.row_name()),
                    ));
                }
                Ok(ElementSlot::Embedded {
                    field: *nested,
                    class,
                    leaves,
                })
            }
            Stage::Collection(_) => Err(Error::stage_not_supported(
                nested.ty.name(),
                "field of a collection element",
            )),
        }
    }

    fn columns(&self) -> Vec<&str> {
        match self {
            ElementLayout::Scalar { column, .. } => vec![column.as_str()],
            ElementLayout::Embedded { slots, .. } => slots
                .iter()
                .flat_map(|slot| match slot {
                    ElementSlot::Scalar(leaf) => std::slice::from_ref(leaf),
                    ElementSlot::Embedded { leaves, .. } => leaves.as_slice(),
                })
                .map(|leaf| leaf.column.as_str())
                .collect(),
        }
    }

    /// Claim the child table in the parent's names and check its own columns.
    fn claim_child(
        &self,
        parent: &mut RowNames,
        child: &str,
        key_columns: impl IntoIterator<Item = String>,
    ) -> Result<()> {
        parent.claim_table(child)?;
        let mut names = RowNames::new(child);
        for column in key_columns {
            names.claim_column(&column)?;
        }
        for column in self.columns() {
            names.claim_column(column)?;
        }
        Ok(())
    }

    fn column_defs(&self) -> Result<Vec<ColumnDef>> {
        match self {
            ElementLayout::Scalar { ty, column } => Ok(vec![ScalarStage.column_def(column, ty)?]),
            ElementLayout::Embedded { slots, .. } => {
                let mut columns = Vec::new();
                for slot in slots {
                    match slot {
                        ElementSlot::Scalar(leaf) => columns.push(leaf.column_def()?),
                        ElementSlot::Embedded { leaves, .. } => {
                            for leaf in leaves {
                                columns.push(leaf.column_def()?);
                            }
                        }
                    }
                }
                Ok(columns)
            }
        }
    }

    fn write_element(&self, element: Datum, pairs: &mut Vec<(String, Value)>) -> Result<()> {
        match self {
            ElementLayout::Scalar { ty, column } => {
                pairs.push((column.clone(), ScalarStage.serialize(ty, element)?));
            }
            ElementLayout::Embedded { slots, .. } => {
                let element = element.into_object()?;
                for slot in slots {
                    match slot {
                        ElementSlot::Scalar(leaf) => leaf.write(element.as_deref(), pairs)?,
                        ElementSlot::Embedded { field, leaves, .. } => {
                            let nested = read_or_null(element.as_deref(), field)?.into_object()?;
                            for leaf in leaves {
                                leaf.write(nested.as_deref(), pairs)?;
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn read_element(&self, cursor: &dyn Cursor, view: &mut ResultView) -> Result<Datum> {
        match self {
            ElementLayout::Scalar { ty, column } => {
                view.load(cursor, column, column)?;
                ScalarStage.materialize(ty, view, column)
            }
            ElementLayout::Embedded { class, slots } => {
                let mut element = introspect::allocate(class.ty())?;
                for slot in slots {
                    let datum = match slot {
                        ElementSlot::Scalar(leaf) => leaf.read(cursor, view)?,
                        ElementSlot::Embedded { field, class, leaves } => {
                            let mut values = Vec::with_capacity(leaves.len());
                            for leaf in leaves {
                                values.push(leaf.read(cursor, view)?);
                            }
                            if field.ty.is_nullable() && values.iter().all(Datum::is_null) {
                                Datum::null()
                            } else {
                                let mut nested = introspect::allocate(class.ty())?;
                                for (leaf, value) in leaves.iter().zip(values) {
                                    introspect::write(nested.as_mut(), &leaf.field, value)?;
                                }
                                Datum::Object(nested)
                            }
                        }
                    };
                    introspect::write(element.as_mut(), slot.field(), datum)?;
                }
                Ok(Datum::Object(element))
            }
        }
    }
}

impl CollectionStage {
    pub(crate) fn collect_schema(
        &self,
        ctx: &MappingContext<'_>,
        field: &FieldDescriptor,
        row_name: &str,
        pass: &mut SchemaPass,
    ) -> Result<()> {
        let layout = ElementLayout::resolve(ctx, field, row_name)?;
        let child = child_table_name(&pass.table, row_name);
        layout.claim_child(
            &mut pass.names,
            &child,
            pass.keys.iter().map(|key| key.child_column()),
        )?;

        let mut columns = to_column_defs(&pass.keys);
        columns.extend(layout.column_defs()?);
        let links = to_foreign_links(&pass.keys, ctx.config().cascade_deletes);
        pass.statements
            .push(ctx.builder().create_table(&child, &columns, &links));
        Ok(())
    }

    pub(crate) fn collect_write(
        &self,
        ctx: &MappingContext<'_>,
        field: &FieldDescriptor,
        row_name: &str,
        datum: Datum,
        pass: &mut WritePass,
    ) -> Result<()> {
        let layout = ElementLayout::resolve(ctx, field, row_name)?;
        let child = child_table_name(&pass.table, row_name);
        layout.claim_child(
            &mut pass.names,
            &child,
            pass.keys.iter().map(|key| key.child_column()),
        )?;

        if pass.mode == WriteMode::Update {
            match ctx.config().collection_update {
                CollectionUpdatePolicy::Reject => {
                    return Err(Error::CollectionUpdateUnsupported {
                        type_name: pass.root_type,
                        field: row_name.to_string(),
                    });
                }
                CollectionUpdatePolicy::ReplaceAll => {
                    let filter = to_column_values(&pass.keys);
                    pass.statements
                        .push(ctx.builder().delete_where(&child, &filter));
                }
            }
        }

        for element in datum.into_list()? {
            let mut pairs = to_column_values(&pass.keys);
            layout.write_element(element, &mut pairs)?;
            pass.statements.push(ctx.builder().insert(&child, &pairs));
        }
        Ok(())
    }

    /// Query the whole child table and materialize one element per row, in row order.
    pub(crate) fn hydrate(
        &self,
        ctx: &MappingContext<'_>,
        field: &FieldDescriptor,
        row_name: &str,
        pass: &mut HydrationPass<'_>,
    ) -> Result<Datum> {
        let layout = ElementLayout::resolve(ctx, field, row_name)?;
        let child = child_table_name(&pass.table, row_name);
        let sql = ctx.builder().select_all(&child);

        let elements = query_or_default(
            pass.executor,
            &sql,
            Vec::new(),
            ctx.config().query_failure,
            |cursor| {
                let mut elements = Vec::new();
                while cursor.next()? {
                    let mut view = ResultView::new();
                    elements.push(layout.read_element(&*cursor, &mut view)?);
                }
                Ok(elements)
            },
        )?;
        tracing::trace!(table = %child, elements = elements.len(), "Hydrated collection");
        Ok(Datum::List(elements))
    }
}
