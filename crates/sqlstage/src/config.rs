//! Mapper configuration.

use serde::{Deserialize, Serialize};
use sqlstage_core::{Error, Result};
use sqlstage_query::StatementBuilder;

/// How `UPDATE` generation treats collection fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionUpdatePolicy {
    /// Fail with `CollectionUpdateUnsupported` naming the field.
    #[default]
    Reject,
    /// Delete every child row of the parent, then insert the current elements.
    ReplaceAll,
}

/// What collection hydration does when the executor reports a query failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryFailurePolicy {
    /// Log the failure and hydrate an empty collection.
    #[default]
    UseDefault,
    /// Return the failure to the caller.
    Propagate,
}

/// Configuration for a [`Mapper`](crate::Mapper).
///
/// # Example
///
/// ```ignore
/// let config = MapperConfig::default()
///     .quote_identifiers(true)
///     .collection_update(CollectionUpdatePolicy::ReplaceAll);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Emit `CREATE TABLE IF NOT EXISTS`.
    pub if_not_exists: bool,
    /// Always double-quote identifiers.
    pub quote_identifiers: bool,
    /// Add `ON DELETE CASCADE` to child table foreign keys.
    pub cascade_deletes: bool,
    /// Collection handling during `UPDATE` generation.
    pub collection_update: CollectionUpdatePolicy,
    /// Query failure handling during collection hydration.
    pub query_failure: QueryFailurePolicy,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            if_not_exists: true,
            quote_identifiers: false,
            cascade_deletes: true,
            collection_update: CollectionUpdatePolicy::default(),
            query_failure: QueryFailurePolicy::default(),
        }
    }
}

impl MapperConfig {
    /// Parse a configuration from JSON. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(format!("invalid mapper config: {e}")))
    }

    /// Render the configuration as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("cannot serialize mapper config: {e}")))
    }

    /// Set `IF NOT EXISTS`.
    pub fn if_not_exists(mut self, value: bool) -> Self {
        self.if_not_exists = value;
        self
    }

    /// Set identifier quoting.
    pub fn quote_identifiers(mut self, value: bool) -> Self {
        self.quote_identifiers = value;
        self
    }

    /// Set `ON DELETE CASCADE` on child links.
    pub fn cascade_deletes(mut self, value: bool) -> Self {
        self.cascade_deletes = value;
        self
    }

    /// Set the collection update policy.
    pub fn collection_update(mut self, policy: CollectionUpdatePolicy) -> Self {
        self.collection_update = policy;
        self
    }

    /// Set the query failure policy.
    pub fn query_failure(mut self, policy: QueryFailurePolicy) -> Self {
        self.query_failure = policy;
        self
    }

    /// Statement builder matching this configuration.
    pub fn statement_builder(&self) -> StatementBuilder {
        StatementBuilder::new()
            .quote_identifiers(self.quote_identifiers)
            .if_not_exists(self.if_not_exists)
    }
}
