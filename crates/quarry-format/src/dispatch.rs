//! The display pipeline: compile, select a format, execute, render.

use std::slice;

use quarry_common::{FormatError, QuarryConfig, QuarryError};
use quarry_sql::compiler::{compile, CompiledQuery};
use quarry_sql::dsl::{CompoundQuery, QueryBlock};
use quarry_sql::executor::{execute, execute_all, RowSet};
use quarry_sql::params::DisplayParams;
use quarry_sql::schema::FieldDescriptions;
use quarry_sql::storage::Store;

use crate::html;
use crate::registry::{FormatRegistry, Formatter, ImmediateFormat};
use crate::render::{PlainWikitext, ValueRenderer, WikitextRenderer};

/// Runs query blocks against a store and renders them as HTML.
pub struct QueryRunner<'s, S: Store + ?Sized> {
    pub(crate) store: &'s S,
    pub(crate) config: QuarryConfig,
    pub(crate) registry: FormatRegistry,
    pub(crate) wikitext: Box<dyn WikitextRenderer>,
}

impl<'s, S: Store + ?Sized> QueryRunner<'s, S> {
    /// Creates a runner with the built-in formats and plain wikitext
    /// rendering.
    pub fn new(store: &'s S, config: QuarryConfig) -> Self {
        Self {
            store,
            registry: FormatRegistry::new(config.render.clone()),
            wikitext: Box::new(PlainWikitext::new(config.render.article_path.clone())),
            config,
        }
    }

    /// Replaces the format registry.
    pub fn with_registry(mut self, registry: FormatRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replaces the wikitext renderer.
    pub fn with_wikitext(mut self, wikitext: impl WikitextRenderer + 'static) -> Self {
        self.wikitext = Box::new(wikitext);
        self
    }

    /// The configuration.
    pub fn config(&self) -> &QuarryConfig {
        &self.config
    }

    /// The format registry.
    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    pub(crate) fn values(&self) -> ValueRenderer<'_> {
        ValueRenderer::new(&self.config.render, self.wikitext.as_ref())
    }

    /// Runs one query block.
    pub fn run(&self, block: &QueryBlock) -> Result<String, QuarryError> {
        let query = compile(&block.clauses, self.store, &self.config.query)?;
        let formatter = self
            .registry
            .select(block.format.as_deref(), &query.field_descriptions);

        let format = match formatter {
            Formatter::Deferred(format) => {
                return Ok(format.render_by_self_query(
                    slice::from_ref(&query),
                    &block.params,
                    &[],
                )?);
            }
            Formatter::Immediate(format) => format,
        };

        let result = execute(&query, self.store)?;
        let formatted = self
            .values()
            .format_rows(&result.rows, &result.field_descriptions);
        let mut text = render_immediate(
            format.as_ref(),
            &result.rows,
            &formatted,
            &result.field_descriptions,
            &block.params,
        )?;

        if result.may_be_truncated() {
            text.push_str(&self.view_more_link(&query, block));
        }
        tracing::debug!(
            format = format.name(),
            rows = result.row_count(),
            elapsed_ms = result.execution_time_ms,
            "query displayed"
        );
        Ok(text)
    }

    /// Runs a compound query, merging every block's rows into one display.
    pub fn run_compound(&self, compound: &CompoundQuery) -> Result<String, QuarryError> {
        if compound.blocks.is_empty() {
            return Err(FormatError::no_results("No queries were given.").into());
        }

        let queries = compound
            .blocks
            .iter()
            .map(|block| compile(&block.clauses, self.store, &self.config.query))
            .collect::<Result<Vec<CompiledQuery>, _>>()?;
        let per_query_params: Vec<DisplayParams> =
            compound.blocks.iter().map(|b| b.params.clone()).collect();

        let mut all_fields = FieldDescriptions::new();
        for query in &queries {
            for (alias, description) in &query.field_descriptions {
                all_fields.insert(alias.clone(), description.clone());
            }
        }

        let format = match self.registry.select(compound.format.as_deref(), &all_fields) {
            Formatter::Deferred(format) => {
                return Ok(format.render_by_self_query(
                    &queries,
                    &compound.params,
                    &per_query_params,
                )?);
            }
            Formatter::Immediate(format) => format,
        };

        let merged = execute_all(&queries, &per_query_params, &compound.params, self.store)?;
        let formatted = self.values().format_merged(&merged);
        let text = render_immediate(
            format.as_ref(),
            &merged.rows,
            &formatted,
            &merged.field_descriptions,
            &merged.params,
        )?;
        tracing::debug!(
            format = format.name(),
            queries = queries.len(),
            rows = merged.rows.len(),
            "compound query displayed"
        );
        Ok(text)
    }

    /// Like [`run`](Self::run), with failures rendered as an error box.
    pub fn display(&self, block: &QueryBlock) -> String {
        self.run(block).unwrap_or_else(|e| error_output(&e))
    }

    /// Like [`run_compound`](Self::run_compound), with failures rendered
    /// as an error box.
    pub fn display_compound(&self, compound: &CompoundQuery) -> String {
        self.run_compound(compound).unwrap_or_else(|e| error_output(&e))
    }

    /// Link to the next page of a truncated result.
    pub fn view_more_link(&self, query: &CompiledQuery, block: &QueryBlock) -> String {
        let clauses = &query.clauses;
        let mut params: Vec<(&str, String)> = vec![("tables", clauses.tables.clone())];
        for (key, value) in [
            ("fields", &clauses.fields),
            ("where", &clauses.where_clause),
            ("join_on", &clauses.join_on),
            ("group_by", &clauses.group_by),
            ("order_by", &clauses.order_by),
        ] {
            if !value.is_empty() {
                params.push((key, value.clone()));
            }
        }
        if let Some(format) = &block.format {
            params.push(("format", format.clone()));
        }
        params.push(("offset", query.limit.to_string()));
        params.push(("limit", self.config.query.view_more_limit.to_string()));
        for (name, value) in block.params.iter() {
            if let Some(value) = value.as_scalar() {
                params.push((name, value.to_string()));
            }
        }

        let url = html::url_with_query(&self.config.render.view_data_path, &params);
        let link = html::element("a", &[("href", &url)], &self.config.render.view_more_text);
        format!("\n{}", html::raw_element("p", &[], &link))
    }
}

/// Renders with an immediate format after checking that parameters it
/// only accepts once were not given per query.
pub(crate) fn render_immediate(
    format: &dyn ImmediateFormat,
    raw: &RowSet,
    formatted: &RowSet,
    fields: &FieldDescriptions,
    params: &DisplayParams,
) -> Result<String, FormatError> {
    for name in format.scalar_only_parameters() {
        if params.get(name).is_some_and(|value| value.is_per_row()) {
            return Err(FormatError::ConflictingParameter {
                name: (*name).to_string(),
            });
        }
    }
    format.render(raw, formatted, fields, params)
}

fn error_output(error: &QuarryError) -> String {
    tracing::warn!(code = ?error.code(), error = %error, "query failed");
    html::error_box(&error.user_message())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_common::QueryConfig;
    use quarry_sql::schema::{FieldDescription, FieldType, TableSchema};
    use quarry_sql::storage::{Record, SqliteStore};

    fn store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .declare_table(
                "Books",
                &TableSchema::new()
                    .with_field("Year", FieldDescription::new(FieldType::Integer))
                    .with_field("Genres", FieldDescription::list(FieldType::String, ",")),
            )
            .unwrap();
        for (i, (name, year, genres)) in [
            ("Dune", "1965", "SF, Epic"),
            ("Emma", "1815", "Romance"),
            ("Ubik", "1969", "SF"),
        ]
        .into_iter()
        .enumerate()
        {
            store
                .insert_record(
                    "Books",
                    &Record::new(name)
                        .with_page_id(i as i64 + 1)
                        .with_value("Year", year)
                        .with_value("Genres", genres),
                )
                .unwrap();
        }
        store
    }

    fn small_limits() -> QuarryConfig {
        QuarryConfig {
            query: QueryConfig {
                default_limit: 2,
                ..QueryConfig::default()
            },
            ..QuarryConfig::default()
        }
    }

    #[test]
    fn test_run_table() {
        let store = store();
        let runner = QueryRunner::new(&store, QuarryConfig::default());
        let block = QueryBlock::parse("tables=Books;fields=_pageName=Title,Year;where=Year > 1900");
        let text = runner.run(&block).unwrap();
        assert_eq!(
            text,
            "<table class=\"cargoTable\">\n\
             <tr><th>Title</th><th>Year</th></tr>\n\
             <tr><td class=\"field_Title\"><a href=\"/wiki/Dune\" title=\"Dune\">Dune</a></td><td class=\"field_Year\">1965</td></tr>\n\
             <tr><td class=\"field_Title\"><a href=\"/wiki/Ubik\" title=\"Ubik\">Ubik</a></td><td class=\"field_Year\">1969</td></tr>\n\
             </table>\n"
        );
    }

    #[test]
    fn test_run_appends_view_more_link() {
        let store = store();
        let runner = QueryRunner::new(&store, small_limits());
        let block = QueryBlock::parse("tables=Books;fields=Year;format=ul;columns=2");
        let text = runner.run(&block).unwrap();
        assert!(text.starts_with("<ul>\n<li>1965</li>\n<li>1815</li>\n</ul>\n"));
        assert!(text.ends_with(
            "\n<p><a href=\"/wiki/Special:ViewData?tables=Books&amp;fields=Year&amp;format=ul\
             &amp;offset=2&amp;limit=100&amp;columns=2\">More...</a></p>"
        ));
    }

    #[test]
    fn test_run_list_field_rendering() {
        let store = store();
        let runner = QueryRunner::new(&store, QuarryConfig::default());
        let block = QueryBlock::parse("tables=Books;fields=Genres;where=_pageName='Dune';format=list");
        assert_eq!(runner.run(&block).unwrap(), "SF, Epic");
    }

    #[test]
    fn test_deferred_format_skips_execution() {
        let store = store();
        let runner = QueryRunner::new(&store, QuarryConfig::default());
        let block = QueryBlock::parse("tables=Books;fields=Year;format=csv");
        let text = runner.run(&block).unwrap();
        assert!(text.starts_with("<a href=\"/wiki/Special:CargoExport?tables=Books"));
        assert!(text.contains("format=csv"));
    }

    #[test]
    fn test_display_error_box() {
        let store = store();
        let runner = QueryRunner::new(&store, QuarryConfig::default());
        let text = runner.display(&QueryBlock::parse("tables=Films;fields=Year"));
        assert_eq!(
            text,
            "<div class=\"error\">Error: table \"Films\" does not exist</div>"
        );

        let text = runner.display(&QueryBlock::parse("tables=Books;where=Year > 3000"));
        assert!(text.starts_with("<div class=\"error\">Error: "));
    }

    #[test]
    fn test_run_compound() {
        let store = store();
        let runner = QueryRunner::new(&store, QuarryConfig::default());
        let compound = CompoundQuery::from_params(&[
            "tables=Books;fields=_pageName=Title;where=Year < 1900;label=old",
            "tables=Books;fields=_pageName=Title;where=Year > 1900;label=new",
            "format=ul",
        ]);
        let text = runner.run_compound(&compound).unwrap();
        assert_eq!(
            text,
            "<ul>\n\
             <li><a href=\"/wiki/Emma\" title=\"Emma\">Emma</a></li>\n\
             <li><a href=\"/wiki/Dune\" title=\"Dune\">Dune</a></li>\n\
             <li><a href=\"/wiki/Ubik\" title=\"Ubik\">Ubik</a></li>\n\
             </ul>\n"
        );
    }

    #[test]
    fn test_compound_scalar_only_conflict() {
        let store = store();
        let runner = QueryRunner::new(&store, QuarryConfig::default());
        let compound = CompoundQuery::from_params(&[
            "tables=Books;fields=_pageName;delimiter=-",
            "tables=Books;fields=Year;delimiter=/",
            "format=list",
        ]);
        assert_eq!(
            runner.run_compound(&compound),
            Err(QuarryError::Format(FormatError::ConflictingParameter {
                name: "delimiter".to_string()
            }))
        );
    }

    #[test]
    fn test_compound_without_blocks() {
        let store = store();
        let runner = QueryRunner::new(&store, QuarryConfig::default());
        let compound = CompoundQuery::from_params(&["format=table"]);
        assert!(runner
            .display_compound(&compound)
            .starts_with("<div class=\"error\">Error: "));
    }
}
