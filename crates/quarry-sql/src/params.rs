//! Display parameters.
//!
//! Any clause of a query block that the compiler does not consume is a
//! display parameter for the formatter. Compound queries scope a
//! query-specific parameter to the rows its query produced, so a value is
//! either one scalar for every row or a row index to value mapping.

use std::collections::BTreeMap;
use std::ops::Range;

use indexmap::IndexMap;
use serde::Serialize;

/// Value of one display parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Applies to every row.
    Scalar(String),
    /// Applies only to the listed row indices.
    PerRow(BTreeMap<usize, String>),
}

impl ParamValue {
    /// Returns the value that applies to `row`, if any.
    pub fn for_row(&self, row: usize) -> Option<&str> {
        match self {
            ParamValue::Scalar(value) => Some(value),
            ParamValue::PerRow(values) => values.get(&row).map(String::as_str),
        }
    }

    /// Returns the value if it is a scalar.
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            ParamValue::Scalar(value) => Some(value),
            ParamValue::PerRow(_) => None,
        }
    }

    /// Returns true if the value is row-indexed.
    pub fn is_per_row(&self) -> bool {
        matches!(self, ParamValue::PerRow(_))
    }
}

/// Ordered display parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DisplayParams {
    values: IndexMap<String, ParamValue>,
}

impl DisplayParams {
    /// Creates an empty parameter map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a scalar parameter.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), ParamValue::Scalar(value.into()));
    }

    /// Sets a scalar parameter, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Assigns `value` to every row in `rows`.
    ///
    /// Returns false, changing nothing, if `name` already holds a scalar.
    pub fn set_rows(&mut self, name: &str, rows: Range<usize>, value: &str) -> bool {
        let entry = self
            .values
            .entry(name.to_string())
            .or_insert_with(|| ParamValue::PerRow(BTreeMap::new()));
        match entry {
            ParamValue::Scalar(_) => false,
            ParamValue::PerRow(values) => {
                for row in rows {
                    values.insert(row, value.to_string());
                }
                true
            }
        }
    }

    /// Returns a parameter.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    /// Returns a parameter if it is a scalar.
    pub fn scalar(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ParamValue::as_scalar)
    }

    /// Returns the value of a parameter for one row.
    pub fn for_row(&self, name: &str, row: usize) -> Option<&str> {
        self.get(name).and_then(|value| value.for_row(row))
    }

    /// Checks if a parameter is set.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no parameter is set.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DisplayParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = DisplayParams::new();
        for (name, value) in iter {
            params.set(name, value);
        }
        params
    }
}
