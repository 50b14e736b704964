//! Built-in formats.
//!
//! | name                      | kind      |
//! |---------------------------|-----------|
//! | `list`, `ul`, `ol`        | immediate |
//! | `table`                   | immediate |
//! | `category`                | immediate |
//! | `googlemaps`, `openlayers`| immediate |
//! | `csv`, `timeline`         | deferred  |

mod category;
mod export;
mod list;
mod map;
mod table;

pub use category::CategoryFormat;
pub use export::{export_params, CsvFormat, TimelineFormat};
pub use list::{ListFormat, ListStyle};
pub use map::{MapFormat, MapService};
pub use table::TableFormat;

use quarry_common::FormatError;
use quarry_sql::executor::{Row, RowSet};
use quarry_sql::schema::{FieldDescriptions, FieldType};

/// Fails on an empty result.
pub(crate) fn require_rows(rows: &RowSet) -> Result<(), FormatError> {
    if rows.is_empty() {
        return Err(FormatError::no_results("No results found for this query."));
    }
    Ok(())
}

/// Aliases a format shows, in projection order.
pub(crate) fn displayed_fields(fields: &FieldDescriptions) -> impl Iterator<Item = &str> {
    fields
        .iter()
        .filter(|(_, d)| d.field_type != FieldType::CoordinatesPart)
        .map(|(alias, _)| alias.as_str())
}

/// Value of `alias` in `row`, or "" when absent.
pub(crate) fn cell<'r>(row: &'r Row, alias: &str) -> &'r str {
    row.get(alias).map_or("", String::as_str)
}
