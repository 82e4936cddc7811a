//! The five introspector operations the stage engine calls.
//!
//! Thin wrappers over [`TypeRef`] and [`Entity`] that log access failures before
//! returning them, so a broken accessor table is visible even when a caller
//! discards the error.

use crate::error::{Error, FieldAccessError, Result};
use crate::field::FieldDescriptor;
use crate::reflect::{Datum, Entity, TypeRef};

/// Persistable fields of a mapped type, in declaration order.
pub fn fields(ty: &TypeRef) -> Result<Vec<FieldDescriptor>> {
    match ty.record_info() {
        Some(info) => Ok(info.fields()),
        None => {
            tracing::warn!(type_name = ty.name(), "Field enumeration on non-record type");
            Err(FieldAccessError::not_a_record(ty.name()).into())
        }
    }
}

/// Generic type arguments of a field's declared type.
pub fn generic_element_types(field: &FieldDescriptor) -> Vec<TypeRef> {
    field.element_types()
}

/// Read one field of an instance.
pub fn read(instance: &dyn Entity, field: &FieldDescriptor) -> Result<Datum> {
    instance.read_field(field.name).inspect_err(|err| {
        log_access_failure("read", instance.entity_type().name(), field.name, err);
    })
}

/// Overwrite one field of an instance.
pub fn write(instance: &mut dyn Entity, field: &FieldDescriptor, value: Datum) -> Result<()> {
    let type_name = instance.entity_type().name();
    instance.write_field(field.name, value).inspect_err(|err| {
        log_access_failure("write", type_name, field.name, err);
    })
}

/// A zero-valued instance of a mapped type.
pub fn allocate(ty: &TypeRef) -> Result<Box<dyn Entity>> {
    match ty.record_info() {
        Some(info) => Ok(info.allocate()),
        None => {
            tracing::warn!(type_name = ty.name(), "Allocation of non-record type");
            Err(FieldAccessError::not_a_record(ty.name()).into())
        }
    }
}

fn log_access_failure(op: &'static str, type_name: &str, field: &str, err: &Error) {
    tracing::warn!(
        op = op,
        type_name = type_name,
        field = field,
        error = %err,
        "Field access failed"
    );
}
