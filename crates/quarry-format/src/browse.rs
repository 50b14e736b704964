//! Browsing declared tables.

use quarry_common::constants::{FULL_SUFFIX, PAGE_NAME_COLUMN};
use quarry_common::{CompileError, ExecutionError, FormatError, QuarryError};
use quarry_sql::dsl::{QueryBlock, QueryClauses};
use quarry_sql::ident::quote_ident;
use quarry_sql::schema::{FieldDescription, FieldType, TableSchema};
use quarry_sql::storage::Store;

use crate::dispatch::QueryRunner;
use crate::html;

/// Alias of the document column in browse output.
const PAGE_ALIAS: &str = "Page";

impl<S: Store + ?Sized> QueryRunner<'_, S> {
    /// Shows the row count and the first rows of a table, every visible
    /// field in its own column.
    pub fn browse_table(&self, table: &str) -> String {
        match self.try_browse_table(table) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(table, error = %e, "browse failed");
                html::error_box(&e.user_message())
            }
        }
    }

    fn try_browse_table(&self, table: &str) -> Result<String, QuarryError> {
        let schema = self
            .store
            .resolve_schema(table)
            .map_err(ExecutionError::from)?
            .ok_or_else(|| CompileError::unknown_table(table))?;

        let count = self.row_count(table)?;
        let mut text = format!("<p>This table has <strong>{count}</strong> rows altogether.</p>\n");

        let block = QueryBlock {
            clauses: browse_clauses(table, &schema, self.config.query.browse_limit),
            format: Some("table".to_string()),
            ..QueryBlock::default()
        };
        match self.run(&block) {
            Ok(rows) => text.push_str(&rows),
            Err(QuarryError::Format(FormatError::NoResults(_))) => {}
            Err(e) => return Err(e),
        }
        Ok(text)
    }

    fn row_count(&self, table: &str) -> Result<u64, QuarryError> {
        let sql = format!("SELECT COUNT(*) AS \"count\" FROM {}", quote_ident(table));
        let rows = self.store.query(&sql).map_err(ExecutionError::from)?;
        Ok(rows
            .first()
            .and_then(|row| row.get("count"))
            .and_then(|count| count.parse().ok())
            .unwrap_or(0))
    }

    /// An HTML list of declared tables, each linking to its browse page.
    pub fn list_tables(&self) -> Result<String, QuarryError> {
        let tables = self.store.list_tables().map_err(ExecutionError::from)?;
        let mut text = String::from("<p>The following tables are defined:</p>\n<ul>\n");
        for table in &tables {
            let url = format!("{}/{}", self.config.render.tables_path, html::url_encode(table));
            text.push_str(&format!(
                "<li>{} ({})</li>\n",
                html::escape_text(table),
                html::element("a", &[("href", &url)], "view")
            ));
        }
        text.push_str("</ul>\n");
        Ok(text)
    }
}

/// Clauses selecting every visible field of `table`, ordered by document.
fn browse_clauses(table: &str, schema: &TableSchema, limit: usize) -> QueryClauses {
    let mut fields = vec![format!("{PAGE_NAME_COLUMN}={PAGE_ALIAS}")];
    for (name, field) in schema.fields().filter(|(_, f)| !f.hidden) {
        fields.push(format!("{}={}", browse_expression(name, field), name.replace('_', " ")));
    }

    QueryClauses::new(table)
        .with_fields(fields.join(","))
        .with_order_by(PAGE_NAME_COLUMN)
        .with_limit(limit.to_string())
}

fn browse_expression(name: &str, field: &FieldDescription) -> String {
    if field.is_list() || field.field_type == FieldType::Coordinates {
        format!("{name}{FULL_SUFFIX}")
    } else if field.field_type == FieldType::Url {
        format!("CASE WHEN LENGTH({name}) > 0 THEN CONCAT('[', {name}, ' URL]') ELSE '' END")
    } else {
        name.to_string()
    }
}
