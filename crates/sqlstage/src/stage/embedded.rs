use sqlstage_core::{Datum, Entity, Result, introspect};

use super::{HydrationPass, MappingContext, SchemaPass, WritePass, composite_name};
use crate::reflector::RepositoryClass;

/// Flattens a nested record into sibling columns of the enclosing table.
///
/// The root record of every mapping pass is walked by this stage without a prefix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmbeddedStage;

impl EmbeddedStage {
    pub(crate) fn collect_schema(
        &self,
        ctx: &MappingContext<'_>,
        class: &RepositoryClass,
        prefix: Option<&str>,
        pass: &mut SchemaPass,
    ) -> Result<()> {
        for row in class.rows() {
            let stage = ctx.resolve(&row.ty)?;
            stage.collect_schema(ctx, row, &composite_name(prefix, row.row_name()), pass)?;
        }
        Ok(())
    }

    /// `instance` is `None` for a null nested record; every leaf is then written as `NULL`.
    pub(crate) fn collect_write(
        &self,
        ctx: &MappingContext<'_>,
        class: &RepositoryClass,
        prefix: Option<&str>,
        instance: Option<&dyn Entity>,
        pass: &mut WritePass,
    ) -> Result<()> {
        for row in class.rows() {
            let stage = ctx.resolve(&row.ty)?;
            let datum = match instance {
                Some(instance) => introspect::read(instance, row)?,
                None => Datum::null(),
            };
            stage.collect_write(ctx, row, &composite_name(prefix, row.row_name()), datum, pass)?;
        }
        Ok(())
    }

    /// Allocate a zero-valued instance and populate it field by field.
    ///
    /// Every field stage is resolved before the first field hydrates. A nullable record
    /// whose fields all hydrate to `NULL` becomes `NULL` itself.
    pub(crate) fn hydrate(
        &self,
        ctx: &MappingContext<'_>,
        class: &RepositoryClass,
        prefix: Option<&str>,
        nullable: bool,
        pass: &mut HydrationPass<'_>,
    ) -> Result<Datum> {
        let stages = class
            .rows()
            .iter()
            .map(|row| ctx.resolve(&row.ty))
            .collect::<Result<Vec<_>>>()?;

        let mut values = Vec::with_capacity(stages.len());
        for (row, stage) in class.rows().iter().zip(stages) {
            values.push(stage.hydrate(ctx, row, &composite_name(prefix, row.row_name()), pass)?);
        }

        if nullable && !values.is_empty() && values.iter().all(Datum::is_null) {
            return Ok(Datum::null());
        }

        let mut instance = introspect::allocate(class.ty())?;
        for (row, value) in class.rows().iter().zip(values) {
            introspect::write(instance.as_mut(), row, value)?;
        }
        Ok(Datum::Object(instance))
    }
}
