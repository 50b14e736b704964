//! Identifier helpers.
//!
//! Table and field names come from authored content and end up inside
//! generated statements, so they are restricted to plain identifiers and
//! always emitted quoted.

/// Returns true if `name` is a plain identifier: an ASCII letter or
/// underscore followed by ASCII letters, digits or underscores.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Quotes an identifier for use in a statement, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quotes a string literal for use in a statement, doubling embedded quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Returns `"table"."column"`.
pub fn qualified(table: &str, column: &str) -> String {
    format!("{}.{}", quote_ident(table), quote_ident(column))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("Books"));
        assert!(is_identifier("_pageName"));
        assert!(is_identifier("Publication_date2"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("2books"));
        assert!(!is_identifier("Books; DROP"));
        assert!(!is_identifier("Bücher"));
    }

    #[test]
    fn test_quoting() {
        assert_eq!(quote_ident("Books"), "\"Books\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
        assert_eq!(quote_literal("it's"), "'it''s'");
        assert_eq!(qualified("Books", "_pageName"), "\"Books\".\"_pageName\"");
    }
}
