//! # quarry-format
//!
//! Turns Quarry query blocks into HTML.
//!
//! This crate implements:
//! - Type-aware rendering of cell values (links, thumbnails, dates, lists)
//! - The formatter registry with its resolver hook and fallback heuristic
//! - The built-in formats: lists, tables, categories, maps, CSV, timelines
//! - [`QueryRunner`], the compile / execute / render pipeline
//! - Table browsing and the JSON results endpoint
//!
//! # Usage
//!
//! ```
//! use quarry_common::QuarryConfig;
//! use quarry_format::QueryRunner;
//! use quarry_sql::dsl::QueryBlock;
//! use quarry_sql::schema::{FieldDescription, FieldType, TableSchema};
//! use quarry_sql::storage::{Record, SqliteStore};
//!
//! let store = SqliteStore::open_in_memory().unwrap();
//! let schema = TableSchema::new().with_field("Year", FieldDescription::new(FieldType::Integer));
//! store.declare_table("Books", &schema).unwrap();
//! store
//!     .insert_record("Books", &Record::new("Dune").with_value("Year", "1965"))
//!     .unwrap();
//!
//! let runner = QueryRunner::new(&store, QuarryConfig::default());
//! let html = runner.display(&QueryBlock::parse("tables=Books;fields=Year;format=ul"));
//! assert_eq!(html, "<ul>\n<li>1965</li>\n</ul>\n");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// JSON results endpoint
pub mod api;

/// Table browsing
pub mod browse;

/// The display pipeline
pub mod dispatch;

/// Built-in formats
pub mod formats;

/// HTML and URL helpers
pub mod html;

/// Formatter contracts and selection
pub mod registry;

/// Value rendering
pub mod render;

pub use api::{query_results_json, ApiRequest};
pub use dispatch::QueryRunner;
pub use registry::{
    DeferredFormat, ExternalFormatResolver, FormatContext, FormatRegistry, Formatter,
    ImmediateFormat,
};
pub use render::{PlainWikitext, ValueRenderer, WikitextRenderer};
