//! `category` format.

use indexmap::IndexMap;
use quarry_common::FormatError;
use quarry_sql::executor::RowSet;
use quarry_sql::params::DisplayParams;
use quarry_sql::schema::FieldDescriptions;

use super::{cell, displayed_fields, require_rows};
use crate::html;
use crate::registry::ImmediateFormat;

const DEFAULT_COLUMNS: u32 = 3;

/// Lists the first displayed value of every row under the initial letter
/// of its raw value, like a category page.
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoryFormat;

impl ImmediateFormat for CategoryFormat {
    fn name(&self) -> &str {
        "category"
    }

    fn scalar_only_parameters(&self) -> &[&str] {
        &["columns"]
    }

    fn render(
        &self,
        raw: &RowSet,
        formatted: &RowSet,
        fields: &FieldDescriptions,
        params: &DisplayParams,
    ) -> Result<String, FormatError> {
        require_rows(formatted)?;
        let columns = match params.scalar("columns") {
            None => DEFAULT_COLUMNS,
            Some(value) => value
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| FormatError::InvalidParameter {
                    name: "columns".to_string(),
                    value: value.to_string(),
                })?,
        };
        let Some(first) = displayed_fields(fields).next() else {
            return Err(FormatError::no_results("No fields to display."));
        };

        let mut groups: IndexMap<String, Vec<&str>> = IndexMap::new();
        for (raw_row, row) in raw.iter().zip(formatted) {
            let value = cell(row, first);
            if value.trim().is_empty() {
                continue;
            }
            let initial = cell(raw_row, first)
                .trim()
                .chars()
                .next()
                .map_or_else(String::new, |c| c.to_uppercase().collect());
            groups.entry(initial).or_default().push(value);
        }
        groups.sort_keys();

        let mut text = format!(
            "<div class=\"cargoCategory\" style=\"column-count: {columns}\">\n"
        );
        for (initial, values) in &groups {
            text.push_str(&html::element("h3", &[], initial));
            text.push_str("\n<ul>");
            for value in values {
                text.push_str(&format!("<li>{value}</li>"));
            }
            text.push_str("</ul>\n");
        }
        text.push_str("</div>\n");
        Ok(text)
    }
}
