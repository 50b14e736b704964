//! Field descriptors.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{SchemaError, SchemaResult};

/// Field descriptions keyed by output alias, in projection order.
pub type FieldDescriptions = IndexMap<String, FieldDescription>;

/// Types a declared field can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// Name of a document.
    Page,
    /// Short free text.
    String,
    /// Long free text.
    Text,
    /// Whole number.
    Integer,
    /// Floating point number.
    Float,
    /// Calendar date.
    Date,
    /// Date and time of day.
    Datetime,
    /// Yes/no value.
    Boolean,
    /// Latitude/longitude pair.
    Coordinates,
    /// Web address.
    #[serde(rename = "URL")]
    Url,
    /// E-mail address.
    Email,
    /// Name of an uploaded file.
    File,
    /// Markup rendered by the rich-text collaborator.
    Wikitext,
    /// Latitude or longitude projected out of a coordinates field.
    #[serde(rename = "Coordinates part")]
    CoordinatesPart,
}

impl FieldType {
    /// All types, in declaration order.
    pub const ALL: [FieldType; 14] = [
        FieldType::Page,
        FieldType::String,
        FieldType::Text,
        FieldType::Integer,
        FieldType::Float,
        FieldType::Date,
        FieldType::Datetime,
        FieldType::Boolean,
        FieldType::Coordinates,
        FieldType::Url,
        FieldType::Email,
        FieldType::File,
        FieldType::Wikitext,
        FieldType::CoordinatesPart,
    ];

    /// Returns the persisted name of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Page => "Page",
            FieldType::String => "String",
            FieldType::Text => "Text",
            FieldType::Integer => "Integer",
            FieldType::Float => "Float",
            FieldType::Date => "Date",
            FieldType::Datetime => "Datetime",
            FieldType::Boolean => "Boolean",
            FieldType::Coordinates => "Coordinates",
            FieldType::Url => "URL",
            FieldType::Email => "Email",
            FieldType::File => "File",
            FieldType::Wikitext => "Wikitext",
            FieldType::CoordinatesPart => "Coordinates part",
        }
    }

    /// Returns true if this type is stored as a number.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::Integer | FieldType::Float | FieldType::Boolean | FieldType::CoordinatesPart
        )
    }

    /// Returns true if this type is a date or date-time.
    pub fn is_temporal(&self) -> bool {
        matches!(self, FieldType::Date | FieldType::Datetime)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| SchemaError::Decode(format!("unknown field type \"{s}\"")))
    }
}

/// Describes one logical field of a table.
///
/// `delimiter` is set if and only if the field is a list; the constructors
/// keep that invariant and [`FieldDescription::validate`] checks decoded
/// values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescription {
    /// Field type.
    #[serde(rename = "type")]
    pub field_type: FieldType,

    #[serde(rename = "isList", default, skip_serializing_if = "is_false")]
    is_list: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    delimiter: Option<String>,

    /// Suppresses the field from browse-all-columns displays.
    #[serde(default, skip_serializing_if = "is_false")]
    pub hidden: bool,

    /// Free-form render hints, e.g. `link text` for URL fields.
    #[serde(flatten)]
    pub hints: BTreeMap<String, String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl FieldDescription {
    /// Hint naming the label of a rendered URL link.
    pub const LINK_TEXT_HINT: &'static str = "link text";

    /// Creates a scalar field of the given type.
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            is_list: false,
            delimiter: None,
            hidden: false,
            hints: BTreeMap::new(),
        }
    }

    /// Creates a list field whose stored value joins elements with `delimiter`.
    pub fn list(field_type: FieldType, delimiter: impl Into<String>) -> Self {
        Self {
            is_list: true,
            delimiter: Some(delimiter.into()),
            ..Self::new(field_type)
        }
    }

    /// Describes an expression that is not a plain field reference.
    ///
    /// Its values go through the rich-text renderer.
    pub fn derived() -> Self {
        Self::new(FieldType::Wikitext)
    }

    /// Marks the field hidden.
    pub fn with_hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Adds a render hint.
    pub fn with_hint(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.hints.insert(name.into(), value.into());
        self
    }

    /// Returns true if the field holds a list of values.
    pub fn is_list(&self) -> bool {
        self.is_list
    }

    /// Returns the list delimiter, if this is a list field.
    pub fn delimiter(&self) -> Option<&str> {
        self.delimiter.as_deref()
    }

    /// Returns a render hint.
    pub fn hint(&self, name: &str) -> Option<&str> {
        self.hints.get(name).map(String::as_str)
    }

    /// Returns the same description without list-ness.
    pub fn as_scalar(&self) -> Self {
        Self {
            is_list: false,
            delimiter: None,
            ..self.clone()
        }
    }

    /// Checks the descriptor's invariants.
    pub fn validate(&self, name: &str) -> SchemaResult<()> {
        let invalid = |message: &str| SchemaError::InvalidField {
            field: name.to_string(),
            message: message.to_string(),
        };

        match (&self.is_list, &self.delimiter) {
            (true, None) => return Err(invalid("list fields need a delimiter")),
            (false, Some(_)) => return Err(invalid("only list fields take a delimiter")),
            (true, Some(d)) if d.is_empty() => return Err(invalid("delimiter is empty")),
            _ => {}
        }

        if self.is_list && self.field_type == FieldType::Coordinates {
            return Err(invalid("coordinates fields cannot be lists"));
        }
        if self.field_type == FieldType::CoordinatesPart {
            return Err(invalid("\"Coordinates part\" cannot be declared"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_names() {
        for ty in FieldType::ALL {
            assert_eq!(ty.as_str().parse::<FieldType>().unwrap(), ty);
        }
        assert_eq!(FieldType::Url.to_string(), "URL");
        assert!("Polygon".parse::<FieldType>().is_err());
    }

    #[test]
    fn test_list_invariant() {
        let field = FieldDescription::list(FieldType::String, ";");
        assert!(field.is_list());
        assert_eq!(field.delimiter(), Some(";"));
        assert!(field.validate("Tags").is_ok());

        let scalar = field.as_scalar();
        assert!(!scalar.is_list());
        assert_eq!(scalar.delimiter(), None);
    }

    #[test]
    fn test_decoded_invariant_violations() {
        let missing: FieldDescription =
            serde_json::from_str(r#"{"type": "String", "isList": true}"#).unwrap();
        assert!(missing.validate("Tags").is_err());

        let stray: FieldDescription =
            serde_json::from_str(r#"{"type": "String", "delimiter": ","}"#).unwrap();
        assert!(stray.validate("Tags").is_err());

        let coords = FieldDescription::list(FieldType::Coordinates, ";");
        assert!(coords.validate("Where").is_err());
    }

    #[test]
    fn test_hints_are_flattened() {
        let field = FieldDescription::new(FieldType::Url).with_hint("link text", "site");
        let json = serde_json::to_string(&field).unwrap();
        assert_eq!(json, r#"{"type":"URL","link text":"site"}"#);

        let back: FieldDescription = serde_json::from_str(&json).unwrap();
        assert_eq!(back.hint(FieldDescription::LINK_TEXT_HINT), Some("site"));
    }
}
