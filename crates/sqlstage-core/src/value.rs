//! Dynamic column values.

use serde::{Deserialize, Serialize};

use crate::error::ConversionError;
use crate::types::SqlType;

/// A single column value as it travels between Rust fields, SQL text and result rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// SQL `NULL`
    Null,
    /// Boolean
    Bool(bool),
    /// 8-bit integer
    TinyInt(i8),
    /// 16-bit integer
    SmallInt(i16),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    BigInt(i64),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// Text
    Text(String),
}

impl Value {
    /// Whether this is `NULL`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the value's kind, used in conversion errors.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::TinyInt(_) => "TINYINT",
            Value::SmallInt(_) => "SMALLINT",
            Value::Int(_) => "INT",
            Value::BigInt(_) => "BIGINT",
            Value::Float(_) => "FLOAT",
            Value::Double(_) => "DOUBLE",
            Value::Text(_) => "TEXT",
        }
    }

    /// Borrow the text content.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Widen any integer (or boolean) to `i64`.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Bool(b) => Some(i64::from(*b)),
            Value::TinyInt(v) => Some(i64::from(*v)),
            Value::SmallInt(v) => Some(i64::from(*v)),
            Value::Int(v) => Some(i64::from(*v)),
            Value::BigInt(v) => Some(*v),
            _ => None,
        }
    }

    /// Widen any number to `f64`.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// Read a boolean. Drivers without a boolean type report `0`/`1` integers.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::TinyInt(_) | Value::SmallInt(_) | Value::Int(_) | Value::BigInt(_) => {
                match self.as_i64() {
                    Some(0) => Some(false),
                    Some(1) => Some(true),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Render the value as a SQL literal.
    ///
    /// Floats are printed as-is; mapped values pass through [`coerce`](Self::coerce)
    /// first, which rejects NaN and infinities.
    #[must_use]
    pub fn to_sql_literal(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(true) => "TRUE".to_string(),
            Value::Bool(false) => "FALSE".to_string(),
            Value::TinyInt(v) => v.to_string(),
            Value::SmallInt(v) => v.to_string(),
            Value::Int(v) => v.to_string(),
            Value::BigInt(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Double(v) => v.to_string(),
            Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
        }
    }

    /// Coerce a raw driver value into the representation of `target`.
    ///
    /// `NULL` passes through unchanged. Integers and doubles are range-checked when
    /// narrowed, and floats must be finite.
    pub fn coerce(self, target: SqlType) -> Result<Value, ConversionError> {
        if self.is_null() {
            return Ok(self);
        }
        let from = self.kind_name();
        let fail = || ConversionError::new(from, target.sql_name());
        match target {
            SqlType::Boolean => self.as_bool().map(Value::Bool).ok_or_else(fail),
            SqlType::TinyInt => narrow::<i8>(&self, target).map(Value::TinyInt),
            SqlType::SmallInt => narrow::<i16>(&self, target).map(Value::SmallInt),
            SqlType::Integer => narrow::<i32>(&self, target).map(Value::Int),
            SqlType::BigInt => self.as_i64().map(Value::BigInt).ok_or_else(fail),
            SqlType::Real => {
                let wide = self.as_f64().ok_or_else(fail)?;
                narrow_float(wide, from).map(Value::Float)
            }
            SqlType::Double => {
                let wide = self.as_f64().ok_or_else(fail)?;
                finite(wide, from, target).map(Value::Double)
            }
            SqlType::Text => match self {
                Value::Text(_) => Ok(self),
                _ => Err(fail()),
            },
        }
    }
}

fn narrow<T: TryFrom<i64>>(value: &Value, target: SqlType) -> Result<T, ConversionError> {
    let wide = value
        .as_i64()
        .ok_or_else(|| ConversionError::new(value.kind_name(), target.sql_name()))?;
    T::try_from(wide).map_err(|_| {
        ConversionError::new(value.kind_name(), target.sql_name())
            .with_detail(format!("{} out of range", wide))
    })
}

fn finite(value: f64, from: &'static str, target: SqlType) -> Result<f64, ConversionError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConversionError::new(from, target.sql_name())
            .with_detail(format!("{} is not finite", value)))
    }
}

#[allow(clippy::cast_possible_truncation)]
fn narrow_float(value: f64, from: &'static str) -> Result<f32, ConversionError> {
    let value = finite(value, from, SqlType::Real)?;
    if value.abs() > f64::from(f32::MAX) {
        return Err(ConversionError::new(from, SqlType::Real.sql_name())
            .with_detail(format!("{} out of range", value)));
    }
    Ok(value as f32)
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_sql_literal())
    }
}

macro_rules! integer_conversions {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }

            impl TryFrom<Value> for $ty {
                type Error = ConversionError;

                fn try_from(value: Value) -> Result<Self, Self::Error> {
                    let wide = value.as_i64().ok_or_else(|| {
                        ConversionError::new(value.kind_name(), stringify!($ty))
                    })?;
                    <$ty>::try_from(wide).map_err(|_| {
                        ConversionError::new(value.kind_name(), stringify!($ty))
                            .with_detail(format!("{} out of range", wide))
                    })
                }
            }
        )*
    };
}

integer_conversions!(
    i8 => TinyInt,
    i16 => SmallInt,
    i32 => Int,
    i64 => BigInt,
    u8 => SmallInt,
    u16 => Int,
    u32 => BigInt,
);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl TryFrom<Value> for bool {
    type Error = ConversionError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value
            .as_bool()
            .ok_or_else(|| ConversionError::new(value.kind_name(), "bool"))
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl TryFrom<Value> for f32 {
    type Error = ConversionError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Float(v) => Ok(v),
            other => other
                .as_f64()
                .map(|v| v as f32)
                .ok_or_else(|| ConversionError::new(other.kind_name(), "f32")),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl TryFrom<Value> for f64 {
    type Error = ConversionError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value
            .as_f64()
            .ok_or_else(|| ConversionError::new(value.kind_name(), "f64"))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl TryFrom<Value> for String {
    type Error = ConversionError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(ConversionError::new(other.kind_name(), "String")),
        }
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
