//! DSL to SQL compilation.
//!
//! [`compile`] turns the clause strings of one query block into a
//! [`CompiledQuery`]: a single `SELECT` over the queried tables plus the
//! field description of every output alias.
//!
//! # Pipeline
//!
//! 1. `tables=` is split into [`TableRef`]s and every table is resolved.
//! 2. `fields=` is split on top-level commas; each entry is
//!    `expression=alias` or `expression`. Plain field references are typed
//!    from their schema, list fields are re-aggregated from their field
//!    table and bare coordinates fields expand into three aliases. Other
//!    expressions are validated like a clause and described as wikitext.
//! 3. `where`, `join on`, `group by` and `order by` are validated and
//!    rewritten by the clause lexer.
//! 4. The statement is assembled and re-parsed as a safety net.
//!
//! # Example
//!
//! ```
//! use quarry_common::QueryConfig;
//! use quarry_sql::compiler::compile;
//! use quarry_sql::dsl::QueryClauses;
//! use quarry_sql::registry::SchemaCatalog;
//! use quarry_sql::schema::{FieldDescription, FieldType, TableSchema};
//!
//! let catalog = SchemaCatalog::new();
//! catalog.register(
//!     "Books",
//!     TableSchema::new().with_field("Year", FieldDescription::new(FieldType::Integer)),
//! );
//!
//! let clauses = QueryClauses::new("Books").with_fields("_pageName=Title,Year");
//! let query = compile(&clauses, &catalog, &QueryConfig::default()).unwrap();
//! assert_eq!(
//!     query.sql(),
//!     r#"SELECT "Books"."_pageName" AS "Title", "Books"."Year" AS "Year" FROM "Books" ORDER BY "Books"."_pageName" LIMIT 100"#
//! );
//! ```

mod clause;
mod lexer;
mod scope;

use quarry_common::constants::{
    field_table_name, FIELD_TABLE_POSITION, FIELD_TABLE_ROW_ID, FIELD_TABLE_VALUE, FULL_SUFFIX,
    LAT_ALIAS_SUFFIX, LAT_SUFFIX, LON_ALIAS_SUFFIX, LON_SUFFIX, PAGE_NAME_COLUMN, ROW_ID_COLUMN,
};
use quarry_common::{CompileError, QueryConfig};
use sqlparser::ast::Statement;
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;

use crate::dsl::{split_top_level, QueryClauses};
use crate::ident::{is_identifier, qualified, quote_ident, quote_literal};
use crate::registry::{resolve_tables, SchemaResolver};
use crate::schema::{FieldDescription, FieldDescriptions, FieldType, TableSchema};

use clause::{reference_at, ClauseContext};
use lexer::{next_significant, tokenize};
use scope::{RefKind, Scope};

/// One queried table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    /// Declared table name.
    pub name: String,
    /// Alias given in `tables=`, if any.
    pub alias: Option<String>,
}

impl TableRef {
    /// Creates a table reference.
    pub fn new(name: impl Into<String>, alias: Option<String>) -> Self {
        Self {
            name: name.into(),
            alias,
        }
    }

    /// Name the table is referenced by in clauses and in the statement.
    pub fn effective_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    fn from_sql(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{} AS {}", quote_ident(&self.name), quote_ident(alias)),
            None => quote_ident(&self.name),
        }
    }
}

/// One output column of a compiled query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldExpr {
    /// Output alias.
    pub alias: String,
    /// SQL expression producing the value.
    pub expression: String,
    /// How the value is typed and rendered.
    pub description: FieldDescription,
}

/// A validated, schema-resolved query.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// Queried tables, in `tables=` order.
    pub tables: Vec<TableRef>,
    /// Schema of each table, aligned with `tables`.
    pub schemas: Vec<TableSchema>,
    /// Output columns, in projection order.
    pub fields: Vec<FieldExpr>,
    /// Join condition of each joined table, aligned with `tables[1..]`.
    pub join_conditions: Vec<String>,
    /// Rewritten `where` clause.
    pub where_sql: Option<String>,
    /// Rewritten `group by` clause.
    pub group_by_sql: Option<String>,
    /// Rewritten `order by` clause, or the default ordering.
    pub order_by_sql: String,
    /// Row limit applied by the store.
    pub limit: usize,
    /// Rows skipped before the first returned row.
    pub offset: usize,
    /// Description of every output alias, in projection order.
    pub field_descriptions: FieldDescriptions,
    /// The clause strings this query was compiled from.
    pub clauses: QueryClauses,
}

impl CompiledQuery {
    /// Output aliases, in projection order.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.alias.as_str())
    }

    /// Returns the same query starting `offset` rows later.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Assembles the SQL statement.
    pub fn sql(&self) -> String {
        let select = self
            .fields
            .iter()
            .map(|f| format!("{} AS {}", f.expression, quote_ident(&f.alias)))
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!("SELECT {select} FROM {}", self.tables[0].from_sql());
        for (table, condition) in self.tables[1..].iter().zip(&self.join_conditions) {
            sql.push_str(&format!(" LEFT OUTER JOIN {} ON ({condition})", table.from_sql()));
        }
        if let Some(where_sql) = &self.where_sql {
            sql.push_str(&format!(" WHERE {where_sql}"));
        }
        if let Some(group_by) = &self.group_by_sql {
            sql.push_str(&format!(" GROUP BY {group_by}"));
        }
        sql.push_str(&format!(" ORDER BY {} LIMIT {}", self.order_by_sql, self.limit));
        if self.offset > 0 {
            sql.push_str(&format!(" OFFSET {}", self.offset));
        }
        sql
    }

    /// Query-string parameters that let another endpoint re-run this query.
    ///
    /// Keys follow the DSL (`join on`, `group by`, ...); empty clauses are
    /// left out. `limit` is the effective limit.
    pub fn export_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("tables", self.clauses.tables.clone())];
        let optional = [
            ("join on", &self.clauses.join_on),
            ("fields", &self.clauses.fields),
            ("where", &self.clauses.where_clause),
            ("group by", &self.clauses.group_by),
            ("order by", &self.clauses.order_by),
        ];
        for (key, value) in optional {
            if !value.is_empty() {
                params.push((key, value.clone()));
            }
        }
        params.push(("limit", self.limit.to_string()));
        params
    }
}

/// Compiles one query block.
pub fn compile<R: SchemaResolver + ?Sized>(
    clauses: &QueryClauses,
    resolver: &R,
    config: &QueryConfig,
) -> Result<CompiledQuery, CompileError> {
    let tables = parse_tables(&clauses.tables)?;
    let schemas = resolve_tables(resolver, tables.iter().map(|t| t.name.as_str()))?;
    let scope = Scope::new(&tables, &schemas);

    let fields = compile_fields(&clauses.fields, &scope)?;
    let aliases: Vec<String> = fields.iter().map(|f| f.alias.clone()).collect();

    let join_conditions = compile_join_on(&clauses.join_on, &scope, tables.len())?;

    let where_sql = non_empty(&clauses.where_clause)
        .map(|text| {
            ClauseContext {
                clause: "where",
                scope: &scope,
                aliases: &[],
                allow_holds: true,
            }
            .rewrite(text)
        })
        .transpose()?
        .map(|r| r.sql);

    let group_by_sql = non_empty(&clauses.group_by)
        .map(|text| {
            ClauseContext {
                clause: "group by",
                scope: &scope,
                aliases: &aliases,
                allow_holds: false,
            }
            .rewrite(text)
        })
        .transpose()?
        .map(|r| r.sql);

    let order_by_sql = match non_empty(&clauses.order_by) {
        Some(text) => {
            ClauseContext {
                clause: "order by",
                scope: &scope,
                aliases: &aliases,
                allow_holds: false,
            }
            .rewrite(text)?
            .sql
        }
        None => group_by_sql
            .clone()
            .unwrap_or_else(|| qualified(scope.effective_name(0), PAGE_NAME_COLUMN)),
    };

    let limit = parse_limit(&clauses.limit, config);
    let field_descriptions = fields
        .iter()
        .map(|f| (f.alias.clone(), f.description.clone()))
        .collect();

    let query = CompiledQuery {
        tables,
        schemas,
        fields,
        join_conditions,
        where_sql,
        group_by_sql,
        order_by_sql,
        limit,
        offset: 0,
        field_descriptions,
        clauses: clauses.clone(),
    };

    let sql = query.sql();
    verify_statement(&sql)?;
    tracing::debug!(sql = %sql, "compiled query");
    Ok(query)
}

fn non_empty(text: &str) -> Option<&str> {
    let text = text.trim();
    (!text.is_empty()).then_some(text)
}

/// Parses `Name`, `Name=Alias` or `Name AS Alias` entries.
fn parse_tables(text: &str) -> Result<Vec<TableRef>, CompileError> {
    let invalid = |message: String| CompileError::invalid_clause("tables", message);

    let mut tables: Vec<TableRef> = Vec::new();
    for entry in text.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            if text.trim().is_empty() {
                return Err(invalid("no table was specified".to_string()));
            }
            return Err(invalid("empty table name".to_string()));
        }

        let words: Vec<&str> = entry.split_whitespace().collect();
        let (name, alias) = if let Some((name, alias)) = entry.split_once('=') {
            (name.trim(), Some(alias.trim()))
        } else if words.len() == 3 && words[1].eq_ignore_ascii_case("AS") {
            (words[0], Some(words[2]))
        } else {
            (entry, None)
        };

        if !is_identifier(name) {
            return Err(invalid(format!("\"{name}\" is not a valid table name")));
        }
        if let Some(alias) = alias {
            if !is_identifier(alias) {
                return Err(invalid(format!("\"{alias}\" is not a valid table alias")));
            }
        }

        let table = TableRef::new(name, alias.map(str::to_string));
        if tables.iter().any(|t| t.effective_name() == table.effective_name()) {
            return Err(invalid(format!(
                "\"{}\" is used more than once; give each use an alias",
                table.effective_name()
            )));
        }
        tables.push(table);
    }
    Ok(tables)
}

/// Splits a field entry into expression and alias on its one top-level
/// `=` that is not part of a comparison operator.
fn split_alias(entry: &str) -> Result<(&str, Option<&str>), CompileError> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut positions = Vec::new();
    let bytes = entry.as_bytes();

    for (i, c) in entry.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '(' => depth += 1,
                ')' => depth = depth.saturating_sub(1),
                '=' if depth == 0 => {
                    let previous = if i > 0 { bytes[i - 1] } else { b' ' };
                    if !matches!(previous, b'<' | b'>' | b'!') {
                        positions.push(i);
                    }
                }
                _ => {}
            },
        }
    }

    match positions.as_slice() {
        [] => Ok((entry.trim(), None)),
        [at] => Ok((entry[..*at].trim(), Some(entry[at + 1..].trim()))),
        _ => Err(CompileError::invalid_clause(
            "fields",
            format!("\"{entry}\" has more than one alias"),
        )),
    }
}

fn compile_fields(text: &str, scope: &Scope<'_>) -> Result<Vec<FieldExpr>, CompileError> {
    let text = if text.trim().is_empty() {
        PAGE_NAME_COLUMN
    } else {
        text
    };

    let mut fields: Vec<FieldExpr> = Vec::new();
    for entry in split_top_level(text, ',') {
        let (expression, alias) = split_alias(entry)?;
        if expression.is_empty() {
            return Err(CompileError::invalid_clause("fields", "empty field expression"));
        }
        for field in compile_field(expression, alias, scope)? {
            if field.alias.is_empty() || field.alias.contains('"') {
                return Err(CompileError::invalid_clause(
                    "fields",
                    format!("\"{}\" is not a valid alias", field.alias),
                ));
            }
            if fields.iter().any(|f| f.alias == field.alias) {
                return Err(CompileError::invalid_clause(
                    "fields",
                    format!("alias \"{}\" is used more than once", field.alias),
                ));
            }
            fields.push(field);
        }
    }
    Ok(fields)
}

fn compile_field(
    expression: &str,
    alias: Option<&str>,
    scope: &Scope<'_>,
) -> Result<Vec<FieldExpr>, CompileError> {
    let ctx = ClauseContext {
        clause: "fields",
        scope,
        aliases: &[],
        allow_holds: false,
    };

    let derived = || -> Result<Vec<FieldExpr>, CompileError> {
        let rewritten = ctx.rewrite(expression)?;
        Ok(vec![FieldExpr {
            alias: alias.unwrap_or(expression).to_string(),
            expression: rewritten.sql,
            description: FieldDescription::derived(),
        }])
    };

    let tokens = tokenize(expression).map_err(|m| CompileError::invalid_clause("fields", m))?;
    let plain_reference = reference_at(&tokens, next_significant(&tokens, 0))
        .filter(|(_, _, after)| next_significant(&tokens, *after) == tokens.len());
    let Some((qualifier, name, _)) = plain_reference else {
        return derived();
    };
    // Keywords and unresolved names get the clause treatment and its errors
    let Ok(field) = scope.resolve(qualifier, name) else {
        return derived();
    };

    let alias = alias.unwrap_or(name).to_string();
    let table = scope.effective_name(field.table);
    Ok(match field.kind {
        RefKind::Column {
            column,
            description,
        } => vec![FieldExpr {
            alias,
            expression: qualified(table, &column),
            description,
        }],
        RefKind::List { description } => {
            let field_table = field_table_name(scope.table_name(field.table), &field.field);
            let delimiter = description.delimiter().unwrap_or(",");
            vec![FieldExpr {
                alias,
                // group_concat keeps the order of the rows it is fed
                expression: format!(
                    "(SELECT group_concat({value}, {}) FROM (SELECT {value} FROM {} WHERE {} = {} ORDER BY {}))",
                    quote_literal(delimiter),
                    quote_ident(&field_table),
                    qualified(&field_table, FIELD_TABLE_ROW_ID),
                    qualified(table, ROW_ID_COLUMN),
                    quote_ident(FIELD_TABLE_POSITION),
                    value = quote_ident(FIELD_TABLE_VALUE),
                ),
                description,
            }]
        }
        RefKind::Coordinates { description } => {
            let part = FieldDescription::new(FieldType::CoordinatesPart);
            vec![
                FieldExpr {
                    alias: format!("{alias}{LAT_ALIAS_SUFFIX}"),
                    expression: qualified(table, &format!("{}{LAT_SUFFIX}", field.field)),
                    description: part.clone(),
                },
                FieldExpr {
                    alias: format!("{alias}{LON_ALIAS_SUFFIX}"),
                    expression: qualified(table, &format!("{}{LON_SUFFIX}", field.field)),
                    description: part,
                },
                FieldExpr {
                    alias: format!("{alias}{FULL_SUFFIX}"),
                    expression: qualified(table, &format!("{}{FULL_SUFFIX}", field.field)),
                    description,
                },
            ]
        }
    })
}

/// Pairs each joined table with the condition that joins it.
///
/// Conditions may be given in any order; each joined table takes the
/// first unused condition that references it and otherwise only tables
/// already joined.
fn compile_join_on(
    text: &str,
    scope: &Scope<'_>,
    table_count: usize,
) -> Result<Vec<String>, CompileError> {
    let invalid = |message: String| CompileError::invalid_clause("join on", message);
    let ctx = ClauseContext {
        clause: "join on",
        scope,
        aliases: &[],
        allow_holds: true,
    };

    let mut conditions = Vec::new();
    if let Some(text) = non_empty(text) {
        for condition in split_top_level(text, ',') {
            conditions.push(Some(ctx.rewrite(condition)?));
        }
    }

    if conditions.len() != table_count - 1 {
        return Err(invalid(format!(
            "{} tables need {} join conditions, found {}",
            table_count,
            table_count - 1,
            conditions.len()
        )));
    }

    let mut joined = Vec::with_capacity(conditions.len());
    for table in 1..table_count {
        let position = conditions.iter().position(|c| {
            c.as_ref()
                .is_some_and(|c| c.tables.contains(&table) && c.tables.iter().all(|&t| t <= table))
        });
        let Some(condition) = position.and_then(|p| conditions[p].take()) else {
            return Err(invalid(format!(
                "no condition joins table \"{}\" to the tables before it",
                scope.effective_name(table)
            )));
        };
        joined.push(condition.sql);
    }
    Ok(joined)
}

/// Positive integer, else the default; never above the maximum.
fn parse_limit(text: &str, config: &QueryConfig) -> usize {
    let requested = text
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|&n| n > 0)
        .map_or(config.default_limit, |n| usize::try_from(n).unwrap_or(usize::MAX));
    requested.min(config.max_limit)
}

/// Confirms the assembled text is exactly one `SELECT` query.
fn verify_statement(sql: &str) -> Result<(), CompileError> {
    let statements = Parser::parse_sql(&SQLiteDialect {}, sql)
        .map_err(|e| CompileError::invalid_clause("query", e.to_string()))?;
    match statements.as_slice() {
        [Statement::Query(_)] => Ok(()),
        _ => Err(CompileError::invalid_clause(
            "query",
            "the generated statement is not a single query",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SchemaCatalog;

    fn catalog() -> SchemaCatalog {
        let catalog = SchemaCatalog::new();
        catalog.register(
            "Books",
            TableSchema::new()
                .with_field("Authors", FieldDescription::list(FieldType::Page, ";"))
                .with_field("Year", FieldDescription::new(FieldType::Integer))
                .with_field("Country", FieldDescription::new(FieldType::String))
                .with_field("Location", FieldDescription::new(FieldType::Coordinates)),
        );
        catalog.register(
            "Authors",
            TableSchema::new()
                .with_field("Country", FieldDescription::new(FieldType::String))
                .with_field("Born", FieldDescription::new(FieldType::Date)),
        );
        catalog.register(
            "Countries",
            TableSchema::new().with_field("Continent", FieldDescription::new(FieldType::String)),
        );
        catalog
    }

    fn compile_clauses(clauses: &QueryClauses) -> Result<CompiledQuery, CompileError> {
        compile(clauses, &catalog(), &QueryConfig::default())
    }

    #[test]
    fn test_default_field_and_order() {
        let query = compile_clauses(&QueryClauses::new("Books")).unwrap();
        assert_eq!(query.aliases().collect::<Vec<_>>(), vec!["_pageName"]);
        assert_eq!(query.field_descriptions["_pageName"].field_type, FieldType::Page);
        assert_eq!(
            query.sql(),
            r#"SELECT "Books"."_pageName" AS "_pageName" FROM "Books" ORDER BY "Books"."_pageName" LIMIT 100"#
        );
    }

    #[test]
    fn test_unknown_table() {
        let err = compile_clauses(&QueryClauses::new("Books,Films")).unwrap_err();
        assert_eq!(err, CompileError::unknown_table("Films"));
    }

    #[test]
    fn test_tables_clause_errors() {
        assert!(matches!(
            compile_clauses(&QueryClauses::new("")),
            Err(CompileError::InvalidClause { ref clause, .. }) if clause == "tables"
        ));
        assert!(matches!(
            compile_clauses(&QueryClauses::new("Books; DROP TABLE Books")),
            Err(CompileError::InvalidClause { ref clause, .. }) if clause == "tables"
        ));
        assert!(matches!(
            compile_clauses(&QueryClauses::new("Books,Books").with_join_on("Books._ID=Books._ID")),
            Err(CompileError::InvalidClause { ref clause, .. }) if clause == "tables"
        ));
    }

    #[test]
    fn test_unknown_and_ambiguous_fields() {
        let err = compile_clauses(&QueryClauses::new("Books").with_fields("Publisher")).unwrap_err();
        assert_eq!(err, CompileError::unknown_field("Publisher"));

        let clauses = QueryClauses::new("Books,Authors")
            .with_join_on("Books.Authors HOLDS Authors._pageName")
            .with_fields("Country");
        assert!(matches!(
            compile_clauses(&clauses),
            Err(CompileError::AmbiguousField { ref field }) if field == "Country"
        ));
    }

    #[test]
    fn test_list_field_reaggregates() {
        let query = compile_clauses(&QueryClauses::new("Books").with_fields("Authors")).unwrap();
        assert_eq!(
            query.fields[0].expression,
            r#"(SELECT group_concat("_value", ';') FROM (SELECT "_value" FROM "Books__Authors" WHERE "Books__Authors"."_rowID" = "Books"."_ID" ORDER BY "_position"))"#
        );
        assert!(query.field_descriptions["Authors"].is_list());
    }

    #[test]
    fn test_coordinates_expand_to_three_aliases() {
        let query =
            compile_clauses(&QueryClauses::new("Books").with_fields("_pageName,Location=Where")).unwrap();
        let aliases: Vec<&str> = query.aliases().collect();
        assert_eq!(aliases, vec!["_pageName", "Where lat", "Where lon", "Where__full"]);
        assert_eq!(
            query.field_descriptions["Where lat"].field_type,
            FieldType::CoordinatesPart
        );
        assert_eq!(
            query.field_descriptions["Where__full"].field_type,
            FieldType::Coordinates
        );
        assert_eq!(query.fields[1].expression, r#""Books"."Location__lat""#);

        let query = compile_clauses(&QueryClauses::new("Books").with_fields("Location__lat")).unwrap();
        assert_eq!(query.field_descriptions["Location__lat"].field_type, FieldType::Float);
    }

    #[test]
    fn test_derived_expressions() {
        let query = compile_clauses(
            &QueryClauses::new("Books").with_fields("CONCAT(_pageName, ' (', Year, ')')=Label, COUNT(*)=N"),
        )
        .unwrap();
        assert_eq!(
            query.fields[0].expression,
            r#"CONCAT("Books"."_pageName", ' (', "Books"."Year", ')')"#
        );
        assert_eq!(query.field_descriptions["Label"].field_type, FieldType::Wikitext);
        assert_eq!(query.fields[1].expression, "COUNT(*)");

        let err = compile_clauses(&QueryClauses::new("Books").with_fields("UPPER(Publisher)=P")).unwrap_err();
        assert_eq!(err, CompileError::unknown_field("Publisher"));
    }

    #[test]
    fn test_alias_errors() {
        for fields in ["Year=Y,Country=Y", "Year=a\"b", "Year=A=B", "Year="] {
            let err = compile_clauses(&QueryClauses::new("Books").with_fields(fields)).unwrap_err();
            assert!(
                matches!(err, CompileError::InvalidClause { ref clause, .. } if clause == "fields"),
                "{fields}: {err}"
            );
        }
    }

    #[test]
    fn test_join_on_pairs_conditions() {
        let clauses = QueryClauses::new("Books=B,Authors=A,Countries")
            .with_join_on("A.Country = Countries._pageName, B.Authors HOLDS A._pageName")
            .with_fields("B._pageName=Book,Countries.Continent");
        let query = compile_clauses(&clauses).unwrap();
        assert_eq!(
            query.join_conditions,
            vec![
                r#""B"."_ID" IN (SELECT "_rowID" FROM "Books__Authors" WHERE "_value" = "A"."_pageName")"#.to_string(),
                r#""A"."Country" = "Countries"."_pageName""#.to_string(),
            ]
        );
        let sql = query.sql();
        assert!(sql.contains(r#"FROM "Books" AS "B" LEFT OUTER JOIN "Authors" AS "A" ON ("B"."_ID" IN"#));
        assert!(sql.contains(r#"LEFT OUTER JOIN "Countries" ON ("A"."Country" = "Countries"."_pageName")"#));
    }

    #[test]
    fn test_join_on_count_mismatch() {
        let err = compile_clauses(&QueryClauses::new("Books,Authors")).unwrap_err();
        assert!(matches!(err, CompileError::InvalidClause { ref clause, .. } if clause == "join on"));

        let err = compile_clauses(&QueryClauses::new("Books").with_join_on("Books._ID = 1")).unwrap_err();
        assert!(matches!(err, CompileError::InvalidClause { ref clause, .. } if clause == "join on"));

        let clauses = QueryClauses::new("Books,Authors,Countries")
            .with_join_on("Books._pageName = Authors._pageName, Books._pageName = Authors.Country");
        let err = compile_clauses(&clauses).unwrap_err();
        assert!(matches!(err, CompileError::InvalidClause { ref clause, .. } if clause == "join on"));
    }

    #[test]
    fn test_group_and_order_by() {
        let query = compile_clauses(
            &QueryClauses::new("Books")
                .with_fields("Country,COUNT(*)=Total")
                .with_group_by("Country"),
        )
        .unwrap();
        assert_eq!(query.group_by_sql.as_deref(), Some(r#""Books"."Country""#));
        assert_eq!(query.order_by_sql, r#""Books"."Country""#);

        let query = compile_clauses(
            &QueryClauses::new("Books")
                .with_fields("Country,COUNT(*)=Total")
                .with_group_by("Country")
                .with_order_by("Total DESC"),
        )
        .unwrap();
        assert_eq!(query.order_by_sql, r#""Total" DESC"#);
    }

    #[test]
    fn test_limit_fallback_and_clamp() {
        let config = QueryConfig::default();
        assert_eq!(parse_limit("", &config), 100);
        assert_eq!(parse_limit("abc", &config), 100);
        assert_eq!(parse_limit("-5", &config), 100);
        assert_eq!(parse_limit("0", &config), 100);
        assert_eq!(parse_limit(" 20 ", &config), 20);
        assert_eq!(parse_limit("999999", &config), 5000);
    }

    #[test]
    fn test_offset_and_export_params() {
        let query = compile_clauses(
            &QueryClauses::new("Books")
                .with_fields("_pageName,Year")
                .with_where("Year > 1900")
                .with_limit("10"),
        )
        .unwrap()
        .with_offset(10);
        assert!(query.sql().ends_with("LIMIT 10 OFFSET 10"));
        assert_eq!(
            query.export_params(),
            vec![
                ("tables", "Books".to_string()),
                ("fields", "_pageName,Year".to_string()),
                ("where", "Year > 1900".to_string()),
                ("limit", "10".to_string()),
            ]
        );
    }

    #[test]
    fn test_split_alias() {
        assert_eq!(split_alias("Year").unwrap(), ("Year", None));
        assert_eq!(split_alias(" Year = Y ").unwrap(), ("Year", Some("Y")));
        assert_eq!(
            split_alias("IFNULL(Year, 0) >= 1=Recent").unwrap(),
            ("IFNULL(Year, 0) >= 1", Some("Recent"))
        );
        assert_eq!(split_alias("CONCAT('a=b', Year)").unwrap(), ("CONCAT('a=b', Year)", None));
    }

    #[test]
    fn test_verify_statement() {
        assert!(verify_statement("SELECT 1").is_ok());
        assert!(verify_statement("SELECT 1; SELECT 2").is_err());
        assert!(verify_statement("DELETE FROM Books").is_err());
    }
}
