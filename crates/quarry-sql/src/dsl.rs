//! Query block parsing.
//!
//! A query block is a `;`-separated list of `key=value` clauses:
//!
//! ```text
//! tables=Books,Authors; join on=Books.Author=Authors._pageName;
//! fields=Books._pageName=Book,Authors.Country; where=Year > 1950; format=table
//! ```
//!
//! Recognized keys fill [`QueryClauses`]; `format` selects the formatter
//! and every other key is a display parameter. Clauses without `=` are
//! ignored. Separators inside quotes do not split.

use crate::params::DisplayParams;

/// The raw clause strings of one query. Empty means absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryClauses {
    /// `tables=`
    pub tables: String,
    /// `fields=`
    pub fields: String,
    /// `where=`
    pub where_clause: String,
    /// `join on=`
    pub join_on: String,
    /// `group by=`
    pub group_by: String,
    /// `order by=`
    pub order_by: String,
    /// `limit=`
    pub limit: String,
}

impl QueryClauses {
    /// Creates clauses querying `tables`.
    pub fn new(tables: impl Into<String>) -> Self {
        Self {
            tables: tables.into(),
            ..Self::default()
        }
    }

    /// Sets `fields=`.
    pub fn with_fields(mut self, fields: impl Into<String>) -> Self {
        self.fields = fields.into();
        self
    }

    /// Sets `where=`.
    pub fn with_where(mut self, where_clause: impl Into<String>) -> Self {
        self.where_clause = where_clause.into();
        self
    }

    /// Sets `join on=`.
    pub fn with_join_on(mut self, join_on: impl Into<String>) -> Self {
        self.join_on = join_on.into();
        self
    }

    /// Sets `group by=`.
    pub fn with_group_by(mut self, group_by: impl Into<String>) -> Self {
        self.group_by = group_by.into();
        self
    }

    /// Sets `order by=`.
    pub fn with_order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = order_by.into();
        self
    }

    /// Sets `limit=`.
    pub fn with_limit(mut self, limit: impl Into<String>) -> Self {
        self.limit = limit.into();
        self
    }

    /// Stores `value` under a clause key. Returns false if the key is not a
    /// query clause.
    fn set(&mut self, key: &str, value: &str) -> bool {
        let slot = match key {
            "tables" | "table" => &mut self.tables,
            "fields" => &mut self.fields,
            "where" => &mut self.where_clause,
            "join on" => &mut self.join_on,
            "group by" => &mut self.group_by,
            "order by" => &mut self.order_by,
            "limit" => &mut self.limit,
            _ => return false,
        };
        *slot = value.to_string();
        true
    }
}

/// One parsed query block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryBlock {
    /// Query clauses.
    pub clauses: QueryClauses,
    /// Requested format, if any.
    pub format: Option<String>,
    /// Everything else.
    pub params: DisplayParams,
}

impl QueryBlock {
    /// Parses a `;`-separated block.
    pub fn parse(text: &str) -> Self {
        let mut block = QueryBlock::default();
        for part in split_top_level(text, ';') {
            block.apply(part);
        }
        block
    }

    /// Builds a block from already separated `key=value` clauses.
    pub fn from_params<S: AsRef<str>>(params: &[S]) -> Self {
        let mut block = QueryBlock::default();
        for param in params {
            block.apply(param.as_ref());
        }
        block
    }

    fn apply(&mut self, clause: &str) {
        let Some((key, value)) = clause.split_once('=') else {
            return;
        };
        let (key, value) = (key.trim(), value.trim());
        if key == "format" {
            self.format = Some(value.to_string());
        } else if !self.clauses.set(key, value) {
            self.params.set(key, value);
        }
    }
}

/// Several query blocks displayed together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompoundQuery {
    /// The query blocks; each block's params are query-specific.
    pub blocks: Vec<QueryBlock>,
    /// Requested format, if any.
    pub format: Option<String>,
    /// Overall display parameters.
    pub params: DisplayParams,
}

impl CompoundQuery {
    /// Sorts parameters into query blocks and overall parameters.
    ///
    /// A parameter containing `tables=` is a query block; anything else is
    /// `format` or an overall display parameter. A `format=` inside a block
    /// is ignored.
    pub fn from_params<S: AsRef<str>>(params: &[S]) -> Self {
        let mut compound = CompoundQuery::default();
        for param in params {
            let param = param.as_ref();
            if param.contains("tables=") {
                let mut block = QueryBlock::parse(param);
                // Format is chosen once for the whole compound query.
                block.format = None;
                compound.blocks.push(block);
                continue;
            }
            let Some((key, value)) = param.split_once('=') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());
            if key == "format" {
                compound.format = Some(value.to_string());
            } else {
                compound.params.set(key, value);
            }
        }
        compound
    }
}

/// Splits on `separator` outside quotes and parentheses.
pub(crate) fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => quote = Some(c),
            None if c == '(' => depth += 1,
            None if c == ')' => depth = depth.saturating_sub(1),
            None if c == separator && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            None => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_block() {
        let block = QueryBlock::parse(
            "tables=Books; fields=_pageName=Title,Year ; where=Year > 1950;order by=Year DESC;limit=20;format=table;delimiter=|",
        );
        assert_eq!(block.clauses.tables, "Books");
        assert_eq!(block.clauses.fields, "_pageName=Title,Year");
        assert_eq!(block.clauses.where_clause, "Year > 1950");
        assert_eq!(block.clauses.order_by, "Year DESC");
        assert_eq!(block.clauses.limit, "20");
        assert_eq!(block.format.as_deref(), Some("table"));
        assert_eq!(block.params.scalar("delimiter"), Some("|"));
    }

    #[test]
    fn test_table_alias_key_and_display_params() {
        let block = QueryBlock::parse("table=Books;join on=;height=300px;noise;zoom = 4");
        assert_eq!(block.clauses.tables, "Books");
        assert_eq!(block.clauses.join_on, "");
        assert_eq!(block.params.scalar("height"), Some("300px"));
        assert_eq!(block.params.scalar("zoom"), Some("4"));
        assert_eq!(block.params.len(), 2);
    }

    #[test]
    fn test_quoted_separator_does_not_split() {
        let block = QueryBlock::parse("tables=Books;where=Title = 'A; B'");
        assert_eq!(block.clauses.where_clause, "Title = 'A; B'");
    }

    #[test]
    fn test_from_separated_params() {
        let block = QueryBlock::from_params(&["tables=Books", "where=Genre = 'SF; Fantasy'"]);
        assert_eq!(block.clauses.where_clause, "Genre = 'SF; Fantasy'");
        assert!(block.format.is_none());
    }

    #[test]
    fn test_compound_query() {
        let compound = CompoundQuery::from_params(&[
            "tables=Books;fields=_pageName,Location",
            "tables=Films;fields=_pageName,Location;icon=film.png",
            "format=openlayers",
            "height=300px",
            "stray",
        ]);
        assert_eq!(compound.blocks.len(), 2);
        assert_eq!(compound.blocks[0].clauses.tables, "Books");
        assert!(compound.blocks[0].params.is_empty());
        assert_eq!(compound.blocks[1].params.scalar("icon"), Some("film.png"));
        assert_eq!(compound.format.as_deref(), Some("openlayers"));
        assert_eq!(compound.params.scalar("height"), Some("300px"));
        assert_eq!(compound.params.len(), 1);
    }

    #[test]
    fn test_compound_block_format_is_dropped() {
        let compound = CompoundQuery::from_params(&["tables=Books;format=table;icon=book.png"]);
        let block = &compound.blocks[0];
        assert!(block.format.is_none());
        assert!(!block.params.contains("format"));
        assert_eq!(block.params.scalar("icon"), Some("book.png"));
        assert!(compound.format.is_none());
    }

    #[test]
    fn test_split_top_level() {
        assert_eq!(split_top_level("a;b;'c;d';\"e;f\"", ';'), vec!["a", "b", "'c;d'", "\"e;f\""]);
        assert_eq!(split_top_level("", ';'), vec![""]);
        assert_eq!(
            split_top_level("CONCAT(a, ','), COUNT(*)", ','),
            vec!["CONCAT(a, ',')", " COUNT(*)"]
        );
    }
}
