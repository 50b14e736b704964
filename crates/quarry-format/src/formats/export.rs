//! `csv` and `timeline` formats.
//!
//! Neither renders rows. Both hand the compiled queries to the export
//! endpoint, which runs them again when the link is followed or the
//! widget loads its data.

use quarry_common::{FormatError, RenderConfig};
use quarry_sql::compiler::CompiledQuery;
use quarry_sql::params::DisplayParams;

use crate::html;
use crate::registry::DeferredFormat;

const TIMELINE_HEIGHT: &str = "350px";

/// Query-string parameters recreating `queries` on the export endpoint.
///
/// A single query uses plain keys and omits empty clauses. Several
/// queries use indexed keys (`tables[0]`, `where[1]`, ...) and keep every
/// clause so positions line up.
pub fn export_params(queries: &[CompiledQuery]) -> Result<Vec<(String, String)>, FormatError> {
    match queries {
        [] => Err(FormatError::no_results("No queries to export.")),
        [query] => Ok(query
            .export_params()
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect()),
        queries => {
            let mut params = Vec::new();
            for (i, query) in queries.iter().enumerate() {
                let clauses = &query.clauses;
                for (key, value) in [
                    ("tables", &clauses.tables),
                    ("join on", &clauses.join_on),
                    ("fields", &clauses.fields),
                    ("where", &clauses.where_clause),
                    ("group by", &clauses.group_by),
                    ("order by", &clauses.order_by),
                ] {
                    params.push((format!("{key}[{i}]"), value.clone()));
                }
                params.push((format!("limit[{i}]"), query.limit.to_string()));
            }
            Ok(params)
        }
    }
}

fn export_url(
    config: &RenderConfig,
    queries: &[CompiledQuery],
    format: &str,
    extra: &[(&str, &str)],
) -> Result<String, FormatError> {
    let mut params = export_params(queries)?;
    params.push(("format".to_string(), format.to_string()));
    params.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
    Ok(html::url_with_query(&config.export_path, &params))
}

/// A link downloading the results as CSV.
#[derive(Debug, Clone)]
pub struct CsvFormat {
    config: RenderConfig,
}

impl CsvFormat {
    /// Creates a CSV link format.
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }
}

impl DeferredFormat for CsvFormat {
    fn name(&self) -> &str {
        "csv"
    }

    fn render_by_self_query(
        &self,
        queries: &[CompiledQuery],
        params: &DisplayParams,
        _per_query_params: &[DisplayParams],
    ) -> Result<String, FormatError> {
        let extra: Vec<(&str, &str)> = params
            .scalar("delimiter")
            .map(|delimiter| ("delimiter", delimiter))
            .into_iter()
            .collect();
        let url = export_url(&self.config, queries, "csv", &extra)?;
        let text = params
            .scalar("link text")
            .unwrap_or(&self.config.csv_link_text);
        Ok(html::element("a", &[("href", &url)], text))
    }
}

/// A timeline widget that loads its events from the export endpoint.
#[derive(Debug, Clone)]
pub struct TimelineFormat {
    config: RenderConfig,
}

impl TimelineFormat {
    /// Creates a timeline format.
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }
}

impl DeferredFormat for TimelineFormat {
    fn name(&self) -> &str {
        "timeline"
    }

    fn render_by_self_query(
        &self,
        queries: &[CompiledQuery],
        params: &DisplayParams,
        _per_query_params: &[DisplayParams],
    ) -> Result<String, FormatError> {
        let url = export_url(&self.config, queries, "timeline", &[])?;
        let width = params.scalar("width").unwrap_or(&self.config.timeline_width);
        let height = params.scalar("height").unwrap_or(TIMELINE_HEIGHT);
        let style = format!("width: {width}; height: {height}; border: 1px solid #aaa;");
        Ok(html::raw_element(
            "div",
            &[("class", "cargoTimeline"), ("dataurl", &url), ("style", &style)],
            "",
        ))
    }
}
