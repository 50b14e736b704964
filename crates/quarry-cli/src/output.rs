//! Terminal output for raw rows.

use comfy_table::{Cell, ContentArrangement, Table};
use quarry_sql::executor::RowSet;
use serde_json::Value as JsonValue;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Formatted table output.
    Table,
    /// JSON output.
    Json,
    /// Tab-separated values.
    Raw,
}

/// Formats rows; `columns` fixes the column order.
pub fn format_rows(columns: &[String], rows: &RowSet, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => format_table(columns, rows),
        OutputFormat::Json => format_json(rows),
        OutputFormat::Raw => format_raw(columns, rows),
    }
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .load_preset(comfy_table::presets::UTF8_FULL)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    table
}

fn format_table(columns: &[String], rows: &RowSet) -> String {
    let mut table = new_table();
    if !columns.is_empty() {
        table.set_header(columns.iter().map(Cell::new));
    }
    for row in rows {
        table.add_row(
            columns
                .iter()
                .map(|c| Cell::new(row.get(c).map_or("", String::as_str))),
        );
    }
    table.to_string()
}

fn format_json(rows: &RowSet) -> String {
    let rows: Vec<JsonValue> = rows
        .iter()
        .map(|row| {
            JsonValue::Object(
                row.iter()
                    .map(|(alias, value)| (alias.clone(), JsonValue::String(value.clone())))
                    .collect(),
            )
        })
        .collect();
    serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string())
}

fn format_raw(columns: &[String], rows: &RowSet) -> String {
    rows.iter()
        .map(|row| {
            columns
                .iter()
                .map(|c| row.get(c).map_or("", String::as_str))
                .collect::<Vec<_>>()
                .join("\t")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Declared tables with their row counts.
pub fn format_table_list(tables: &[(String, u64)]) -> String {
    let mut table = new_table();
    table.set_header(vec![Cell::new("Table"), Cell::new("Rows")]);
    for (name, count) in tables {
        table.add_row(vec![Cell::new(name), Cell::new(count)]);
    }
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_sql::executor::Row;

    fn fixture() -> (Vec<String>, RowSet) {
        let columns = vec!["Title".to_string(), "Year".to_string()];
        let mut row = Row::new();
        row.insert("Title".to_string(), "Dune".to_string());
        row.insert("Year".to_string(), "1965".to_string());
        (columns, vec![row])
    }

    #[test]
    fn test_format_table() {
        let (columns, rows) = fixture();
        let output = format_rows(&columns, &rows, OutputFormat::Table);
        assert!(output.contains("Title"));
        assert!(output.contains("Dune"));
        assert!(output.contains("1965"));
    }

    #[test]
    fn test_format_json() {
        let (columns, rows) = fixture();
        let output = format_rows(&columns, &rows, OutputFormat::Json);
        let parsed: JsonValue = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed[0]["Title"], "Dune");
        assert_eq!(parsed[0]["Year"], "1965");
    }

    #[test]
    fn test_format_raw() {
        let (columns, rows) = fixture();
        assert_eq!(format_rows(&columns, &rows, OutputFormat::Raw), "Dune\t1965");
    }

    #[test]
    fn test_format_table_list() {
        let output = format_table_list(&[("Books".to_string(), 3)]);
        assert!(output.contains("Books"));
        assert!(output.contains('3'));
    }
}
