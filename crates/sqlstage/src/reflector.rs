//! Type schema reflector.

use sqlstage_core::{FieldDescriptor, Result, TypeRef, introspect};

/// Reflective view of a mapped type at one recursion depth.
///
/// Built fresh for every walk; holds no state beyond the type and its rows.
#[derive(Debug, Clone)]
pub struct RepositoryClass {
    ty: TypeRef,
    table_name: &'static str,
    rows: Vec<FieldDescriptor>,
}

impl RepositoryClass {
    /// Reflect a mapped type. Fails for anything that is not a record.
    pub fn of(ty: &TypeRef) -> Result<Self> {
        let rows = introspect::fields(ty)?;
        let table_name = ty.record_info().map_or("", |info| info.table_name());
        Ok(Self {
            ty: *ty,
            table_name,
            rows,
        })
    }

    /// The reflected type.
    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    /// Table name of the type.
    pub fn table_name(&self) -> &'static str {
        self.table_name
    }

    /// Persistable fields in declaration order.
    pub fn rows(&self) -> &[FieldDescriptor] {
        &self.rows
    }

    /// Find a row by Rust field name.
    pub fn row(&self, name: &str) -> Option<&FieldDescriptor> {
        self.rows.iter().find(|row| row.name == name)
    }

    /// Primary key rows in declaration order.
    pub fn primary_keys(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.rows.iter().filter(|row| row.primary_key)
    }
}
