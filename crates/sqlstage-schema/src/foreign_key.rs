//! Parent identity carried into child tables.
//!
//! A child column is named `<parent_table>_<parent_column>`. The same name is used
//! at schema time ([`ForeignKey`]) and at data time ([`ForeignKeyObject`]), so child
//! inserts always line up with the child schema.

use serde::{Deserialize, Serialize};
use sqlstage_core::{ColumnDef, SqlType, Value};
use sqlstage_query::ForeignLink;

/// Schema-time parent identity column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Table holding the parent rows.
    pub parent_table: String,
    /// Primary key column in the parent table.
    pub column: String,
    /// Type of the parent column.
    pub sql_type: SqlType,
}

impl ForeignKey {
    /// Create a schema-time key.
    pub fn new(parent_table: impl Into<String>, column: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            parent_table: parent_table.into(),
            column: column.into(),
            sql_type,
        }
    }

    /// Name of the column in the child table.
    pub fn child_column(&self) -> String {
        child_column_name(&self.parent_table, &self.column)
    }
}

/// Data-time parent identity value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyObject {
    /// Table holding the parent row.
    pub parent_table: String,
    /// Primary key column in the parent table.
    pub column: String,
    /// The parent row's key value.
    pub value: Value,
}

impl ForeignKeyObject {
    /// Create a data-time key.
    pub fn new(parent_table: impl Into<String>, column: impl Into<String>, value: Value) -> Self {
        Self {
            parent_table: parent_table.into(),
            column: column.into(),
            value,
        }
    }

    /// Name of the column in the child table.
    pub fn child_column(&self) -> String {
        child_column_name(&self.parent_table, &self.column)
    }
}

fn child_column_name(parent_table: &str, column: &str) -> String {
    format!("{}_{}", parent_table, column)
}

/// Child schema columns for the parent's identity, in key order.
pub fn to_column_defs(keys: &[ForeignKey]) -> Vec<ColumnDef> {
    keys.iter()
        .map(|key| ColumnDef::new(key.child_column(), key.sql_type).not_null())
        .collect()
}

/// `FOREIGN KEY` constraints referencing the parent table(s).
///
/// Keys of the same parent table collapse into one composite link, in order of first
/// appearance.
pub fn to_foreign_links(keys: &[ForeignKey], cascade: bool) -> Vec<ForeignLink> {
    let mut links: Vec<ForeignLink> = Vec::new();
    for key in keys {
        match links
            .iter_mut()
            .find(|link| link.parent_table == key.parent_table)
        {
            Some(link) => {
                link.columns.push(key.child_column());
                link.parent_columns.push(key.column.clone());
            }
            None => links.push(
                ForeignLink::new(
                    vec![key.child_column()],
                    key.parent_table.clone(),
                    vec![key.column.clone()],
                )
                .cascade(cascade),
            ),
        }
    }
    tracing::trace!(keys = keys.len(), links = links.len(), "Built foreign key links");
    links
}

/// Child insert column/value pairs for the parent's identity, in key order.
pub fn to_column_values(objects: &[ForeignKeyObject]) -> Vec<(String, Value)> {
    objects
        .iter()
        .map(|object| (object.child_column(), object.value.clone()))
        .collect()
}
