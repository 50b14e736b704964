//! `table` format.

use quarry_common::FormatError;
use quarry_sql::executor::RowSet;
use quarry_sql::params::DisplayParams;
use quarry_sql::schema::FieldDescriptions;

use super::{cell, displayed_fields, require_rows};
use crate::html;
use crate::registry::ImmediateFormat;

/// An HTML table with one column per displayed alias.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableFormat;

impl ImmediateFormat for TableFormat {
    fn name(&self) -> &str {
        "table"
    }

    fn render(
        &self,
        _raw: &RowSet,
        formatted: &RowSet,
        fields: &FieldDescriptions,
        _params: &DisplayParams,
    ) -> Result<String, FormatError> {
        require_rows(formatted)?;
        let columns: Vec<&str> = displayed_fields(fields).collect();

        let mut text = String::from("<table class=\"cargoTable\">\n<tr>");
        for alias in &columns {
            text.push_str(&html::element("th", &[], alias));
        }
        text.push_str("</tr>\n");

        for row in formatted {
            text.push_str("<tr>");
            for alias in &columns {
                let class = format!("field_{}", alias.replace(' ', "_"));
                text.push_str(&html::raw_element("td", &[("class", &class)], cell(row, alias)));
            }
            text.push_str("</tr>\n");
        }
        text.push_str("</table>\n");
        Ok(text)
    }
}
