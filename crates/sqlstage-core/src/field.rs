//! Field descriptors.

use crate::reflect::TypeRef;

/// Metadata about one persistable field of a mapped type.
///
/// Produced by `Mapped::fields()` in declaration order. The order is part of the
/// contract: it fixes the column order of every generated table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldDescriptor {
    /// Rust field name
    pub name: &'static str,
    /// Row name: the column (or column-group prefix) derived from this field
    pub column_name: &'static str,
    /// Declared type of the field
    pub ty: TypeRef,
    /// Whether this field is part of the record's identity
    pub primary_key: bool,
}

impl FieldDescriptor {
    /// Create a descriptor whose row name equals the field name.
    pub const fn new(name: &'static str, ty: TypeRef) -> Self {
        Self {
            name,
            column_name: name,
            ty,
            primary_key: false,
        }
    }

    /// Override the row name.
    pub const fn column(mut self, name: &'static str) -> Self {
        self.column_name = name;
        self
    }

    /// Set primary key flag.
    pub const fn primary_key(mut self, value: bool) -> Self {
        self.primary_key = value;
        self
    }

    /// The row name used for columns derived from this field.
    pub const fn row_name(&self) -> &'static str {
        self.column_name
    }

    /// Generic element types of a multi-valued field (empty for everything else).
    pub fn element_types(&self) -> Vec<TypeRef> {
        self.ty.element_types()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::Persist;

    #[test]
    fn test_field_descriptor_new() {
        let field = FieldDescriptor::new("name", String::type_ref());
        assert_eq!(field.name, "name");
        assert_eq!(field.row_name(), "name");
        assert!(!field.primary_key);
        assert!(field.element_types().is_empty());
    }

    #[test]
    fn test_field_descriptor_builders() {
        let field = FieldDescriptor::new("id", i64::type_ref())
            .column("user_id")
            .primary_key(true);
        assert_eq!(field.name, "id");
        assert_eq!(field.row_name(), "user_id");
        assert!(field.primary_key);
    }

    #[test]
    fn test_element_types_of_collection() {
        let field = FieldDescriptor::new("tags", Vec::<String>::type_ref());
        let elements = field.element_types();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0], String::type_ref());
    }
}
