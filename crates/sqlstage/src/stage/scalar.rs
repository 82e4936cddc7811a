use sqlstage_core::{ColumnDef, Datum, Error, FieldDescriptor, Result, SqlType, TypeRef, Value};

use super::{HydrationPass, SchemaPass, WritePass};
use crate::view::ResultView;

/// Maps a field to exactly one column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScalarStage;

impl ScalarStage {
    fn sql_type(ty: &TypeRef) -> Result<SqlType> {
        ty.sql_type()
            .ok_or_else(|| Error::stage_not_supported(ty.name(), "scalar column"))
    }

    /// Column shape for a value of `ty`, without an instance.
    pub fn column_def(&self, name: &str, ty: &TypeRef) -> Result<ColumnDef> {
        Ok(ColumnDef::new(name, Self::sql_type(ty)?))
    }

    /// Convert a field value into its column value.
    pub fn serialize(&self, ty: &TypeRef, datum: Datum) -> Result<Value> {
        let sql_type = Self::sql_type(ty)?;
        Ok(datum.into_value()?.coerce(sql_type)?)
    }

    /// Read `property` from the view as a value of `ty`.
    pub fn materialize(&self, ty: &TypeRef, view: &ResultView, property: &str) -> Result<Datum> {
        let sql_type = Self::sql_type(ty)?;
        let raw = view.require(property)?.clone();
        Ok(Datum::Scalar(raw.coerce(sql_type)?))
    }

    pub(crate) fn collect_schema(
        &self,
        field: &FieldDescriptor,
        row_name: &str,
        pass: &mut SchemaPass,
    ) -> Result<()> {
        pass.names.claim_column(row_name)?;
        let mut column = self.column_def(row_name, &field.ty)?;
        if pass.is_key_column(row_name) {
            column = column.primary_key();
        }
        pass.columns.push(column);
        Ok(())
    }

    pub(crate) fn collect_write(
        &self,
        field: &FieldDescriptor,
        row_name: &str,
        datum: Datum,
        pass: &mut WritePass,
    ) -> Result<()> {
        pass.names.claim_column(row_name)?;
        let value = self.serialize(&field.ty, datum)?;
        pass.values.push((row_name.to_string(), value));
        Ok(())
    }

    pub(crate) fn hydrate(
        &self,
        field: &FieldDescriptor,
        row_name: &str,
        pass: &mut HydrationPass<'_>,
    ) -> Result<Datum> {
        pass.load(row_name, row_name)?;
        self.materialize(&field.ty, &pass.view, row_name)
    }
}
