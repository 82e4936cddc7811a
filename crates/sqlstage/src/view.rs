//! Tabular result view: one logical result row as a named-property bag.
//!
//! Hydration copies cursor columns into a view under property names of its choosing,
//! then stages read from the view. Nested hydration never touches the driver cursor
//! directly.

use sqlstage_core::{Cursor, Error, Result, Value};

/// Named values of one result row, in load order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultView {
    properties: Vec<(String, Value)>,
}

impl ResultView {
    /// An empty view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property, replacing any previous value.
    pub fn set(&mut self, property: impl Into<String>, value: Value) {
        let property = property.into();
        match self.properties.iter_mut().find(|(name, _)| *name == property) {
            Some(slot) => slot.1 = value,
            None => self.properties.push((property, value)),
        }
    }

    /// Look up a property.
    pub fn get(&self, property: &str) -> Option<&Value> {
        self.properties
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value)
    }

    /// Look up a property that must be present.
    pub fn require(&self, property: &str) -> Result<&Value> {
        self.get(property).ok_or_else(|| Error::MissingColumn {
            column: property.to_string(),
        })
    }

    /// Copy `column` of the cursor's current row into `property`.
    pub fn load(&mut self, cursor: &dyn Cursor, column: &str, property: &str) -> Result<()> {
        let value = cursor.value_of(column)?;
        self.set(property, value);
        Ok(())
    }

    /// Whether a property is present.
    pub fn contains(&self, property: &str) -> bool {
        self.get(property).is_some()
    }

    /// Property names in load order.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|(name, _)| name.as_str())
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether the view is empty.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}
