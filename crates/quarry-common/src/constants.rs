//! Naming constants shared by the compiler, the stores and the formatters.
//!
//! Every declared table carries a fixed set of built-in columns, and list
//! and coordinates fields are spread over several physical columns. The
//! names below are part of the persisted layout and must not change.

// =============================================================================
// Built-in Columns
// =============================================================================

/// Row identifier of a record in its main table.
pub const ROW_ID_COLUMN: &str = "_ID";

/// Full name of the document a record was stored from.
pub const PAGE_NAME_COLUMN: &str = "_pageName";

/// Title of the originating document, without its namespace prefix.
pub const PAGE_TITLE_COLUMN: &str = "_pageTitle";

/// Numeric namespace of the originating document.
pub const PAGE_NAMESPACE_COLUMN: &str = "_pageNamespace";

/// Identifier of the originating document.
pub const PAGE_ID_COLUMN: &str = "_pageID";

/// All built-in columns, in declaration order.
pub const BUILTIN_COLUMNS: [&str; 5] = [
    ROW_ID_COLUMN,
    PAGE_NAME_COLUMN,
    PAGE_TITLE_COLUMN,
    PAGE_NAMESPACE_COLUMN,
    PAGE_ID_COLUMN,
];

// =============================================================================
// Derived Column Suffixes
// =============================================================================

/// Suffix of the column holding the full (joined) value of a list or
/// coordinates field.
pub const FULL_SUFFIX: &str = "__full";

/// Suffix of the stored latitude column of a coordinates field.
pub const LAT_SUFFIX: &str = "__lat";

/// Suffix of the stored longitude column of a coordinates field.
pub const LON_SUFFIX: &str = "__lon";

/// Suffix appended to an output alias for the latitude of a coordinates
/// projection.
pub const LAT_ALIAS_SUFFIX: &str = " lat";

/// Suffix appended to an output alias for the longitude of a coordinates
/// projection.
pub const LON_ALIAS_SUFFIX: &str = " lon";

// =============================================================================
// Field Tables
// =============================================================================

/// Separator between a main table name and a list field name in the name
/// of the list's field table.
pub const FIELD_TABLE_SEPARATOR: &str = "__";

/// Column of a field table linking back to the main table's `_ID`.
pub const FIELD_TABLE_ROW_ID: &str = "_rowID";

/// Column of a field table holding one list element.
pub const FIELD_TABLE_VALUE: &str = "_value";

/// Column of a field table holding the element's position in the list.
pub const FIELD_TABLE_POSITION: &str = "_position";

// =============================================================================
// Metadata
// =============================================================================

/// Metadata table recording every declared table and its schema blob.
pub const TABLES_METADATA_TABLE: &str = "cargo_tables";

// =============================================================================
// Query Limits
// =============================================================================

/// Default number of rows returned when a query names no usable limit.
pub const DEFAULT_QUERY_LIMIT: usize = 100;

/// Hard ceiling on the number of rows a single query may request.
pub const MAX_QUERY_LIMIT: usize = 5000;

/// Returns the name of the field table backing list field `field` of `table`.
#[must_use]
pub fn field_table_name(table: &str, field: &str) -> String {
    format!("{table}{FIELD_TABLE_SEPARATOR}{field}")
}

/// Returns true if `name` is one of the built-in columns.
#[must_use]
pub fn is_builtin_column(name: &str) -> bool {
    BUILTIN_COLUMNS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_table_name() {
        assert_eq!(field_table_name("Books", "Authors"), "Books__Authors");
    }

    #[test]
    fn test_builtin_columns() {
        assert!(is_builtin_column("_pageName"));
        assert!(is_builtin_column("_ID"));
        assert!(!is_builtin_column("pageName"));
    }
}
