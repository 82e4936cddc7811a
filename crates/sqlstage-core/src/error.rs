//! Error types for sqlstage.
//!
//! Stage resolution failures (`StageNotFound`, `StageNotSupported`) are configuration
//! errors: they abort the whole mapping pass for the root type and are never retried.

use std::error::Error as StdError;
use std::fmt;

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for all mapping operations.
#[derive(Debug)]
pub enum Error {
    /// No stage is registered for a type.
    StageNotFound {
        /// Full Rust type name.
        type_name: &'static str,
    },
    /// A stage was found, but its shape cannot be used where the type appears.
    StageNotSupported {
        /// Full Rust type name.
        type_name: &'static str,
        /// Where the type was encountered (e.g. `"collection element"`).
        context: &'static str,
    },
    /// Reading or writing a field through the introspector failed.
    FieldAccess(FieldAccessError),
    /// A value could not be converted to the declared type.
    Conversion(ConversionError),
    /// Two fields of one root type map to the same column or child table name.
    DuplicateRowName {
        /// Table the name collides in.
        table: String,
        /// The colliding column or child table name.
        name: String,
    },
    /// A cursor did not expose a requested column.
    MissingColumn {
        /// Column name that was requested.
        column: String,
    },
    /// An operation needs the parent's identity but the type declares no primary key.
    MissingPrimaryKey {
        /// Full Rust type name.
        type_name: &'static str,
    },
    /// Collection updates are rejected by the configured policy.
    CollectionUpdateUnsupported {
        /// Full Rust type name of the owning record.
        type_name: &'static str,
        /// Row name of the collection field.
        field: String,
    },
    /// The query execution collaborator failed.
    Query(QueryError),
    /// Invalid configuration (registry installed twice, malformed config).
    Config(String),
    /// Anything else.
    Custom(String),
}

impl Error {
    /// Create a `StageNotFound` error for a type name.
    pub fn stage_not_found(type_name: &'static str) -> Self {
        Error::StageNotFound { type_name }
    }

    /// Create a `StageNotSupported` error for a type name in a context.
    pub fn stage_not_supported(type_name: &'static str, context: &'static str) -> Self {
        Error::StageNotSupported { type_name, context }
    }

    /// Whether this error came from stage resolution (configuration, never data).
    #[must_use]
    pub const fn is_stage_error(&self) -> bool {
        matches!(
            self,
            Error::StageNotFound { .. } | Error::StageNotSupported { .. }
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::StageNotFound { type_name } => write!(f, "no stage for type {}", type_name),
            Error::StageNotSupported { type_name, context } => {
                write!(f, "stage not supported for type {} as {}", type_name, context)
            }
            Error::FieldAccess(err) => write!(f, "field access failed: {}", err),
            Error::Conversion(err) => write!(f, "conversion failed: {}", err),
            Error::DuplicateRowName { table, name } => {
                write!(f, "row name {} is used twice in table {}", name, table)
            }
            Error::MissingColumn { column } => write!(f, "result has no column {}", column),
            Error::MissingPrimaryKey { type_name } => {
                write!(f, "type {} declares no primary key", type_name)
            }
            Error::CollectionUpdateUnsupported { type_name, field } => write!(
                f,
                "updating collection field {} of {} is not supported by the configured policy",
                field, type_name
            ),
            Error::Query(err) => write!(f, "query failed: {}", err),
            Error::Config(msg) => write!(f, "configuration error: {}", msg),
            Error::Custom(msg) => f.write_str(msg),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::FieldAccess(err) => Some(err),
            Error::Conversion(err) => Some(err),
            Error::Query(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FieldAccessError> for Error {
    fn from(err: FieldAccessError) -> Self {
        Error::FieldAccess(err)
    }
}

impl From<ConversionError> for Error {
    fn from(err: ConversionError) -> Self {
        Error::Conversion(err)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Query(err)
    }
}

/// What went wrong while accessing a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAccessKind {
    /// The type has no field with that name.
    UnknownField,
    /// The type is not a mapped record, so it has no fields.
    NotARecord,
    /// A dynamic object was not of the expected concrete type.
    TypeMismatch,
}

/// Failure of an introspector read, write or allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAccessError {
    /// Type that owns (or should own) the field.
    pub type_name: &'static str,
    /// Field name, empty for whole-object failures.
    pub field: String,
    /// Failure category.
    pub kind: FieldAccessKind,
}

impl FieldAccessError {
    /// The type has no field named `field`.
    pub fn unknown_field(type_name: &'static str, field: impl Into<String>) -> Self {
        Self {
            type_name,
            field: field.into(),
            kind: FieldAccessKind::UnknownField,
        }
    }

    /// The type is not a mapped record.
    pub fn not_a_record(type_name: &'static str) -> Self {
        Self {
            type_name,
            field: String::new(),
            kind: FieldAccessKind::NotARecord,
        }
    }

    /// A dynamic object could not be downcast to `type_name`.
    pub fn type_mismatch(type_name: &'static str) -> Self {
        Self {
            type_name,
            field: String::new(),
            kind: FieldAccessKind::TypeMismatch,
        }
    }
}

impl fmt::Display for FieldAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FieldAccessKind::UnknownField => {
                write!(f, "{} has no field {}", self.type_name, self.field)
            }
            FieldAccessKind::NotARecord => write!(f, "{} is not a mapped record", self.type_name),
            FieldAccessKind::TypeMismatch => {
                write!(f, "object is not an instance of {}", self.type_name)
            }
        }
    }
}

impl StdError for FieldAccessError {}

/// A value could not be turned into the requested type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionError {
    /// Kind of the source value (e.g. `"TEXT"`, `"list"`).
    pub from: &'static str,
    /// Target type name.
    pub to: &'static str,
    /// Extra detail such as the out-of-range number.
    pub detail: Option<String>,
}

impl ConversionError {
    /// Create a conversion error without detail.
    pub fn new(from: &'static str, to: &'static str) -> Self {
        Self {
            from,
            to,
            detail: None,
        }
    }

    /// Attach detail to the error.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot convert {} to {}", self.from, self.to)?;
        if let Some(detail) = &self.detail {
            write!(f, " ({})", detail)?;
        }
        Ok(())
    }
}

impl StdError for ConversionError {}

/// Failure reported by a `QueryExecutor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryError {
    /// Statement that failed, if known.
    pub sql: Option<String>,
    /// Driver message.
    pub message: String,
}

impl QueryError {
    /// Create a query error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            sql: None,
            message: message.into(),
        }
    }

    /// Attach the failing statement.
    #[must_use]
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sql {
            Some(sql) => write!(f, "{} (statement: {})", self.message, sql),
            None => f.write_str(&self.message),
        }
    }
}

impl StdError for QueryError {}
