//! Query and rendering configuration structures.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_QUERY_LIMIT, MAX_QUERY_LIMIT};

/// Top-level configuration.
///
/// # Example
///
/// ```rust
/// use quarry_common::config::QuarryConfig;
///
/// let config = QuarryConfig::default();
/// assert_eq!(config.query.default_limit, 100);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuarryConfig {
    /// Query compilation settings.
    pub query: QueryConfig,

    /// Result rendering settings.
    pub render: RenderConfig,
}

impl QuarryConfig {
    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.query.validate()?;
        self.render.validate()
    }
}

/// Query compilation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Limit applied when `limit=` is missing, non-numeric or not positive.
    /// Default: 100
    pub default_limit: usize,

    /// Largest limit a query may request; larger values are clamped.
    /// Default: 5000
    pub max_limit: usize,

    /// Page size of the "view more" continuation link.
    /// Default: 100
    pub view_more_limit: usize,

    /// Number of rows shown when browsing a whole table.
    /// Default: 100
    pub browse_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_QUERY_LIMIT,
            max_limit: MAX_QUERY_LIMIT,
            view_more_limit: 100,
            browse_limit: 100,
        }
    }
}

impl QueryConfig {
    /// Validates the query settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.default_limit == 0 {
            return Err("query.default_limit must be positive".to_string());
        }
        if self.max_limit < self.default_limit {
            return Err("query.max_limit must be at least query.default_limit".to_string());
        }
        if self.view_more_limit == 0 || self.browse_limit == 0 {
            return Err("query.view_more_limit and query.browse_limit must be positive".to_string());
        }
        Ok(())
    }
}

/// Result rendering settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Render dates as "January 5, 2014" instead of "2014-01-05".
    pub american_dates: bool,

    /// Link target for documents; `$1` is replaced by the document name.
    /// Default: "/wiki/$1"
    pub article_path: String,

    /// Direct URL of an uploaded file; `$1` is replaced by the file name.
    /// Default: "/wiki/Special:FilePath/$1"
    pub file_path: String,

    /// Namespace prefix of file documents.
    /// Default: "File"
    pub file_namespace: String,

    /// Width of file thumbnails, in pixels.
    /// Default: 180
    pub thumbnail_width: u32,

    /// Separator placed between rows by the list format.
    /// Default: ","
    pub list_separator: String,

    /// Page that shows the continuation of a truncated result.
    pub view_data_path: String,

    /// Endpoint that serves exported query results.
    pub export_path: String,

    /// Page that lists declared tables; `<path>/<table>` browses one.
    pub tables_path: String,

    /// Text of the "view more" link.
    pub view_more_text: String,

    /// Text of the CSV export link.
    pub csv_link_text: String,

    /// Default map canvas height.
    pub map_height: String,

    /// Default map canvas width.
    pub map_width: String,

    /// Default timeline width.
    pub timeline_width: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            american_dates: false,
            article_path: "/wiki/$1".to_string(),
            file_path: "/wiki/Special:FilePath/$1".to_string(),
            file_namespace: "File".to_string(),
            thumbnail_width: 180,
            list_separator: ",".to_string(),
            view_data_path: "/wiki/Special:ViewData".to_string(),
            export_path: "/wiki/Special:CargoExport".to_string(),
            tables_path: "/wiki/Special:CargoTables".to_string(),
            view_more_text: "More...".to_string(),
            csv_link_text: "View CSV".to_string(),
            map_height: "400px".to_string(),
            map_width: "700px".to_string(),
            timeline_width: "100%".to_string(),
        }
    }
}

impl RenderConfig {
    /// Validates the rendering settings.
    pub fn validate(&self) -> Result<(), String> {
        if !self.article_path.contains("$1") {
            return Err("render.article_path must contain $1".to_string());
        }
        if !self.file_path.contains("$1") {
            return Err("render.file_path must contain $1".to_string());
        }
        if self.thumbnail_width == 0 {
            return Err("render.thumbnail_width must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = QuarryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.query.max_limit, 5000);
        assert_eq!(config.render.article_path, "/wiki/$1");
    }

    #[test]
    fn test_invalid_limits() {
        let mut config = QuarryConfig::default();
        config.query.default_limit = 0;
        assert!(config.validate().is_err());

        let mut config = QuarryConfig::default();
        config.query.max_limit = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_paths() {
        let mut config = QuarryConfig::default();
        config.render.article_path = "/wiki/".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let config: QuarryConfig =
            serde_json::from_str(r#"{"query": {"default_limit": 20}}"#).unwrap();
        assert_eq!(config.query.default_limit, 20);
        assert_eq!(config.query.max_limit, 5000);
        assert!(!config.render.american_dates);
    }
}
