//! # quarry-sql
//!
//! Schema model, query compiler and executor for Quarry.
//!
//! This crate implements:
//! - Typed field descriptors and table schemas with a stable persisted form
//! - Schema resolution through the store
//! - Parsing of `key=value;...` query blocks and compound queries
//! - Compilation of DSL clauses into a single validated `SELECT`
//! - Execution against a [`storage::Store`], including compound merging
//!
//! # Usage
//!
//! ```
//! use quarry_common::QuarryConfig;
//! use quarry_sql::dsl::QueryBlock;
//! use quarry_sql::compiler::compile;
//! use quarry_sql::executor::execute;
//! use quarry_sql::schema::{FieldDescription, FieldType, TableSchema};
//! use quarry_sql::storage::{Record, SqliteStore};
//!
//! let store = SqliteStore::open_in_memory().unwrap();
//! let schema = TableSchema::new().with_field("Author", FieldDescription::new(FieldType::String));
//! store.declare_table("Books", &schema).unwrap();
//! store
//!     .insert_record("Books", &Record::new("Dune").with_value("Author", "Herbert"))
//!     .unwrap();
//!
//! let block = QueryBlock::parse("tables=Books;fields=_pageName=Title,Author");
//! let query = compile(&block.clauses, &store, &QuarryConfig::default().query).unwrap();
//! let result = execute(&query, &store).unwrap();
//! assert_eq!(result.rows[0]["Author"], "Herbert");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Identifier validation and quoting
pub mod ident;

/// Field descriptors and table schemas
pub mod schema;

/// Table name to schema resolution
pub mod registry;

/// Display parameters
pub mod params;

/// Query block parsing
pub mod dsl;

/// DSL to SQL compilation
pub mod compiler;

/// Query execution and compound merging
pub mod executor;

/// Store interface and the SQLite reference store
pub mod storage;
