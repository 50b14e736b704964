//! Table schemas.

use indexmap::IndexMap;
use quarry_common::constants::is_builtin_column;
use serde::{Deserialize, Serialize};

use super::field::{FieldDescription, FieldType};
use super::{SchemaError, SchemaResult};
use crate::ident::is_identifier;

/// Ordered mapping of field name to [`FieldDescription`].
///
/// Loaded fully before any query compiles against it and never mutated
/// during a compile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableSchema {
    fields: IndexMap<String, FieldDescription>,
}

impl TableSchema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, builder style.
    pub fn with_field(mut self, name: impl Into<String>, field: FieldDescription) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    /// Adds or replaces a field.
    pub fn add_field(&mut self, name: impl Into<String>, field: FieldDescription) {
        self.fields.insert(name.into(), field);
    }

    /// Returns a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescription> {
        self.fields.get(name)
    }

    /// Returns true if the schema declares `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Iterates over fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldDescription)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    /// Names of the list fields, in declaration order.
    pub fn list_fields(&self) -> Vec<&str> {
        self.fields()
            .filter(|(_, field)| field.is_list())
            .map(|(name, _)| name)
            .collect()
    }

    /// Names of the coordinates fields, in declaration order.
    pub fn coordinates_fields(&self) -> Vec<&str> {
        self.fields()
            .filter(|(_, field)| field.field_type == FieldType::Coordinates)
            .map(|(name, _)| name)
            .collect()
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no field is declared.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Checks every field name and descriptor.
    pub fn validate(&self) -> SchemaResult<()> {
        for (name, field) in self.fields() {
            if !is_identifier(name) || name.contains("__") {
                return Err(SchemaError::InvalidField {
                    field: name.to_string(),
                    message: "field names must be plain identifiers without \"__\"".to_string(),
                });
            }
            if is_builtin_column(name) {
                return Err(SchemaError::InvalidField {
                    field: name.to_string(),
                    message: "name is reserved for a built-in column".to_string(),
                });
            }
            field.validate(name)?;
        }
        Ok(())
    }

    /// Encodes the schema into its persisted form.
    pub fn to_db_string(&self) -> SchemaResult<String> {
        serde_json::to_string(self).map_err(|e| SchemaError::Encode(e.to_string()))
    }

    /// Decodes and validates a persisted schema.
    pub fn from_db_string(encoded: &str) -> SchemaResult<Self> {
        let schema: TableSchema =
            serde_json::from_str(encoded).map_err(|e| SchemaError::Decode(e.to_string()))?;
        schema.validate()?;
        Ok(schema)
    }
}
