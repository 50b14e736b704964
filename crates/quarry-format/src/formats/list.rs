//! `list`, `ul` and `ol` formats.

use quarry_common::FormatError;
use quarry_sql::executor::{Row, RowSet};
use quarry_sql::params::DisplayParams;
use quarry_sql::schema::FieldDescriptions;

use super::{cell, displayed_fields, require_rows};
use crate::html;
use crate::registry::ImmediateFormat;

/// How rows are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStyle {
    /// One line, rows separated by the delimiter.
    Inline,
    /// `<ul>` items.
    Unordered,
    /// `<ol>` items.
    Ordered,
}

/// Shows each row as its first value, with the rest in parentheses:
/// `Dune (<span class="cargoFieldName">Year:</span> 1965)`.
#[derive(Debug, Clone)]
pub struct ListFormat {
    style: ListStyle,
    default_delimiter: String,
}

impl ListFormat {
    /// Creates a list format; `default_delimiter` separates inline rows
    /// unless `delimiter=` is given.
    pub fn new(style: ListStyle, default_delimiter: &str) -> Self {
        Self {
            style,
            default_delimiter: default_delimiter.to_string(),
        }
    }

    fn display_row(row: &Row, fields: &FieldDescriptions) -> String {
        let mut values = displayed_fields(fields)
            .map(|alias| (alias, cell(row, alias)))
            .filter(|(_, value)| !value.trim().is_empty());

        let Some((_, first)) = values.next() else {
            return String::new();
        };
        let rest: Vec<String> = values
            .map(|(alias, value)| {
                let label = html::element("span", &[("class", "cargoFieldName")], &format!("{alias}:"));
                format!("{label} {value}")
            })
            .collect();

        if rest.is_empty() {
            first.to_string()
        } else {
            format!("{first} ({})", rest.join(", "))
        }
    }
}

impl ImmediateFormat for ListFormat {
    fn name(&self) -> &str {
        match self.style {
            ListStyle::Inline => "list",
            ListStyle::Unordered => "ul",
            ListStyle::Ordered => "ol",
        }
    }

    fn scalar_only_parameters(&self) -> &[&str] {
        &["delimiter"]
    }

    fn render(
        &self,
        _raw: &RowSet,
        formatted: &RowSet,
        fields: &FieldDescriptions,
        params: &DisplayParams,
    ) -> Result<String, FormatError> {
        require_rows(formatted)?;
        let rows = formatted.iter().map(|row| Self::display_row(row, fields));

        Ok(match self.style {
            ListStyle::Inline => {
                let delimiter = params
                    .scalar("delimiter")
                    .unwrap_or(&self.default_delimiter);
                rows.collect::<Vec<_>>().join(&format!("{delimiter} "))
            }
            ListStyle::Unordered | ListStyle::Ordered => {
                let tag = self.name();
                let items: String = rows.map(|row| format!("<li>{row}</li>\n")).collect();
                format!("<{tag}>\n{items}</{tag}>\n")
            }
        })
    }
}
