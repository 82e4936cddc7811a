//! Compile-time accessor tables standing in for runtime reflection.
//!
//! Every persistable Rust type implements [`Persist`], which describes its shape
//! through a [`TypeRef`] and converts values to and from the dynamic [`Datum`].
//! Mapped structs additionally implement [`Entity`] (read/write a field by name) and
//! [`Mapped`] (ordered field list and table name). `#[derive(Mapped)]` generates all
//! three; hand-written impls follow the same pattern.

use std::any::{Any, TypeId, type_name};
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::fmt;
use std::hash::Hash;

use crate::error::{ConversionError, FieldAccessError, Result};
use crate::field::FieldDescriptor;
use crate::types::SqlType;
use crate::value::Value;

/// Runtime key for a persistable type.
///
/// Two `TypeRef`s are equal when they describe the same Rust type with the same
/// nullability. `Option<T>` shares `T`'s type id and only sets the nullable flag.
#[derive(Clone, Copy)]
pub struct TypeRef {
    name: &'static str,
    id: TypeId,
    shape: Shape,
    nullable: bool,
}

/// How a type is laid out relationally.
#[derive(Clone, Copy)]
pub enum Shape {
    /// Atomic value stored in one column.
    Scalar(SqlType),
    /// Mapped struct with its own ordered fields.
    Record(RecordInfo),
    /// Multi-valued container of one element type.
    Sequence(SequenceInfo),
}

/// Accessors for a mapped struct.
#[derive(Clone, Copy)]
pub struct RecordInfo {
    table_name: &'static str,
    fields: fn() -> Vec<FieldDescriptor>,
    allocate: fn() -> Box<dyn Entity>,
}

/// Element description of a container type.
#[derive(Clone, Copy)]
pub struct SequenceInfo {
    element: fn() -> TypeRef,
    ordered: bool,
}

impl TypeRef {
    /// Key for a scalar type stored as `sql_type`.
    pub fn scalar<T: 'static>(sql_type: SqlType) -> Self {
        Self {
            name: type_name::<T>(),
            id: TypeId::of::<T>(),
            shape: Shape::Scalar(sql_type),
            nullable: false,
        }
    }

    /// Key for a mapped struct.
    pub fn record<T: Mapped>() -> Self {
        Self {
            name: type_name::<T>(),
            id: TypeId::of::<T>(),
            shape: Shape::Record(RecordInfo {
                table_name: T::TABLE_NAME,
                fields: T::fields,
                allocate: allocate_default::<T>,
            }),
            nullable: false,
        }
    }

    /// Key for a container `C` holding elements of type `E`.
    ///
    /// `ordered` is true when iteration order is meaningful (insertion or key order).
    pub fn sequence<C: 'static, E: Persist>(ordered: bool) -> Self {
        Self {
            name: type_name::<C>(),
            id: TypeId::of::<C>(),
            shape: Shape::Sequence(SequenceInfo {
                element: E::type_ref,
                ordered,
            }),
            nullable: false,
        }
    }

    /// The same type, marked as accepting `NULL`.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Full Rust type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Rust type id (shared by `T` and `Option<T>`).
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Relational shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Whether `NULL` is a legal value.
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Whether this is a container type.
    pub fn is_sequence(&self) -> bool {
        matches!(self.shape, Shape::Sequence(_))
    }

    /// Whether this is a mapped struct.
    pub fn is_record(&self) -> bool {
        matches!(self.shape, Shape::Record(_))
    }

    /// Column type of a scalar.
    pub fn sql_type(&self) -> Option<SqlType> {
        match self.shape {
            Shape::Scalar(sql_type) => Some(sql_type),
            _ => None,
        }
    }

    /// Accessors of a mapped struct.
    pub fn record_info(&self) -> Option<&RecordInfo> {
        match &self.shape {
            Shape::Record(info) => Some(info),
            _ => None,
        }
    }

    /// Element description of a container.
    pub fn sequence_info(&self) -> Option<&SequenceInfo> {
        match &self.shape {
            Shape::Sequence(info) => Some(info),
            _ => None,
        }
    }

    /// Generic type arguments, in declaration order. Only containers have any.
    pub fn element_types(&self) -> Vec<TypeRef> {
        match &self.shape {
            Shape::Sequence(info) => vec![info.element()],
            _ => Vec::new(),
        }
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.nullable == other.nullable
    }
}

impl Eq for TypeRef {}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRef")
            .field("name", &self.name)
            .field("shape", &self.shape)
            .field("nullable", &self.nullable)
            .finish()
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Scalar(sql_type) => f.debug_tuple("Scalar").field(sql_type).finish(),
            Shape::Record(info) => f.debug_tuple("Record").field(info).finish(),
            Shape::Sequence(info) => f.debug_tuple("Sequence").field(info).finish(),
        }
    }
}

impl RecordInfo {
    /// Table name of the mapped struct.
    pub fn table_name(&self) -> &'static str {
        self.table_name
    }

    /// Persistable fields in declaration order.
    pub fn fields(&self) -> Vec<FieldDescriptor> {
        (self.fields)()
    }

    /// A zero-valued instance whose fields are populated one by one afterwards.
    pub fn allocate(&self) -> Box<dyn Entity> {
        (self.allocate)()
    }
}

impl fmt::Debug for RecordInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordInfo")
            .field("table_name", &self.table_name)
            .finish_non_exhaustive()
    }
}

impl SequenceInfo {
    /// Element type.
    pub fn element(&self) -> TypeRef {
        (self.element)()
    }

    /// Whether iteration order is meaningful.
    pub fn is_ordered(&self) -> bool {
        self.ordered
    }
}

impl fmt::Debug for SequenceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceInfo")
            .field("element", &self.element().name())
            .field("ordered", &self.ordered)
            .finish()
    }
}

/// Dynamic value of one field.
#[derive(Debug)]
pub enum Datum {
    /// A scalar column value (possibly `NULL`).
    Scalar(Value),
    /// An instance of a mapped struct.
    Object(Box<dyn Entity>),
    /// The elements of a container, in iteration order.
    List(Vec<Datum>),
}

impl Datum {
    /// `NULL`.
    pub fn null() -> Self {
        Datum::Scalar(Value::Null)
    }

    /// Whether this is a `NULL` scalar.
    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Scalar(Value::Null))
    }

    /// Kind name used in conversion errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Datum::Scalar(value) => value.kind_name(),
            Datum::Object(_) => "object",
            Datum::List(_) => "list",
        }
    }

    /// Unwrap a scalar value.
    pub fn into_value(self) -> Result<Value> {
        match self {
            Datum::Scalar(value) => Ok(value),
            other => Err(ConversionError::new(other.kind_name(), "scalar value").into()),
        }
    }

    /// Unwrap container elements. `NULL` is an empty container.
    pub fn into_list(self) -> Result<Vec<Datum>> {
        match self {
            Datum::List(items) => Ok(items),
            Datum::Scalar(Value::Null) => Ok(Vec::new()),
            other => Err(ConversionError::new(other.kind_name(), "list").into()),
        }
    }

    /// Unwrap an object. `NULL` yields `None`.
    pub fn into_object(self) -> Result<Option<Box<dyn Entity>>> {
        match self {
            Datum::Object(entity) => Ok(Some(entity)),
            Datum::Scalar(Value::Null) => Ok(None),
            other => Err(ConversionError::new(other.kind_name(), "object").into()),
        }
    }

    /// Downcast an object to a concrete mapped type.
    pub fn into_record<T: Mapped>(self) -> Result<T> {
        match self {
            Datum::Object(entity) => entity
                .into_any()
                .downcast::<T>()
                .map(|boxed| *boxed)
                .map_err(|_| FieldAccessError::type_mismatch(type_name::<T>()).into()),
            other => Err(ConversionError::new(other.kind_name(), type_name::<T>()).into()),
        }
    }
}

impl Clone for Datum {
    fn clone(&self) -> Self {
        match self {
            Datum::Scalar(value) => Datum::Scalar(value.clone()),
            Datum::Object(entity) => Datum::Object(entity.clone_entity()),
            Datum::List(items) => Datum::List(items.clone()),
        }
    }
}

impl From<Value> for Datum {
    fn from(value: Value) -> Self {
        Datum::Scalar(value)
    }
}

/// Object-safe field accessor table of a mapped struct.
pub trait Entity: Any + fmt::Debug {
    /// Type key of the concrete struct.
    fn entity_type(&self) -> TypeRef;

    /// Read a field by Rust field name.
    fn read_field(&self, field: &str) -> Result<Datum>;

    /// Overwrite a field by Rust field name.
    fn write_field(&mut self, field: &str, datum: Datum) -> Result<()>;

    /// Clone behind the trait object.
    fn clone_entity(&self) -> Box<dyn Entity>;

    /// Recover the concrete type.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// A Rust type the engine can persist.
pub trait Persist: Sized + 'static {
    /// Runtime type key.
    fn type_ref() -> TypeRef;

    /// Convert to the dynamic representation.
    fn to_datum(&self) -> Datum;

    /// Convert back from the dynamic representation.
    fn from_datum(datum: Datum) -> Result<Self>;
}

/// A struct mapped to its own table.
pub trait Mapped: Entity + Persist + Default + Clone {
    /// Root table name.
    const TABLE_NAME: &'static str;

    /// Persistable fields in declaration order.
    fn fields() -> Vec<FieldDescriptor>;
}

/// Allocate a zero-valued `T` behind the accessor table.
pub fn allocate_default<T: Mapped>() -> Box<dyn Entity> {
    Box::new(T::default())
}

macro_rules! scalar_persist {
    ($($ty:ty => $sql:ident),* $(,)?) => {
        $(
            impl Persist for $ty {
                fn type_ref() -> TypeRef {
                    TypeRef::scalar::<$ty>(SqlType::$sql)
                }

                fn to_datum(&self) -> Datum {
                    Datum::Scalar(Value::from(self.clone()))
                }

                fn from_datum(datum: Datum) -> Result<Self> {
                    Ok(<$ty>::try_from(datum.into_value()?)?)
                }
            }
        )*
    };
}

scalar_persist!(
    bool => Boolean,
    i8 => TinyInt,
    i16 => SmallInt,
    i32 => Integer,
    i64 => BigInt,
    u8 => SmallInt,
    u16 => Integer,
    u32 => BigInt,
    f32 => Real,
    f64 => Double,
    String => Text,
);

impl<T: Persist> Persist for Option<T> {
    fn type_ref() -> TypeRef {
        T::type_ref().nullable()
    }

    fn to_datum(&self) -> Datum {
        self.as_ref().map_or_else(Datum::null, T::to_datum)
    }

    fn from_datum(datum: Datum) -> Result<Self> {
        if datum.is_null() {
            Ok(None)
        } else {
            T::from_datum(datum).map(Some)
        }
    }
}

impl<T: Persist> Persist for Vec<T> {
    fn type_ref() -> TypeRef {
        TypeRef::sequence::<Self, T>(true)
    }

    fn to_datum(&self) -> Datum {
        Datum::List(self.iter().map(T::to_datum).collect())
    }

    fn from_datum(datum: Datum) -> Result<Self> {
        datum.into_list()?.into_iter().map(T::from_datum).collect()
    }
}

impl<T: Persist> Persist for VecDeque<T> {
    fn type_ref() -> TypeRef {
        TypeRef::sequence::<Self, T>(true)
    }

    fn to_datum(&self) -> Datum {
        Datum::List(self.iter().map(T::to_datum).collect())
    }

    fn from_datum(datum: Datum) -> Result<Self> {
        datum.into_list()?.into_iter().map(T::from_datum).collect()
    }
}

impl<T: Persist + Ord> Persist for BTreeSet<T> {
    fn type_ref() -> TypeRef {
        TypeRef::sequence::<Self, T>(true)
    }

    fn to_datum(&self) -> Datum {
        Datum::List(self.iter().map(T::to_datum).collect())
    }

    fn from_datum(datum: Datum) -> Result<Self> {
        datum.into_list()?.into_iter().map(T::from_datum).collect()
    }
}

// Iteration order is unspecified but fixed for the duration of one `to_datum` call.
impl<T: Persist + Eq + Hash> Persist for HashSet<T> {
    fn type_ref() -> TypeRef {
        TypeRef::sequence::<Self, T>(false)
    }

    fn to_datum(&self) -> Datum {
        Datum::List(self.iter().map(T::to_datum).collect())
    }

    fn from_datum(datum: Datum) -> Result<Self> {
        datum.into_list()?.into_iter().map(T::from_datum).collect()
    }
}
