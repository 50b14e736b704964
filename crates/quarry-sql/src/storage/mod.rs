//! Storage interface.
//!
//! The pipeline never manages connections, transactions or migrations; it
//! talks to the store through [`Store`]. [`SqliteStore`] is the reference
//! implementation used by the CLI and the integration tests, and it also
//! owns the declare/populate side that lives outside the query pipeline.

mod error;
mod sqlite;

use indexmap::IndexMap;

use crate::schema::TableSchema;

pub use error::{StoreError, StoreResult};
pub use sqlite::{PopulationContext, PopulationOrigin, Record, SqliteStore};

/// One result row: column alias to value. An empty string means no value.
pub type Row = IndexMap<String, String>;

/// Ordered result rows.
pub type RowSet = Vec<Row>;

/// A relational store holding declared tables.
///
/// Implementations must be usable from concurrent pipeline invocations.
pub trait Store: Send + Sync {
    /// Loads the schema of a declared table, or `None` if it is not declared.
    fn resolve_schema(&self, table: &str) -> StoreResult<Option<TableSchema>>;

    /// Runs one read-only statement and returns its rows in store order.
    fn query(&self, sql: &str) -> StoreResult<RowSet>;

    /// Names of all declared tables.
    fn list_tables(&self) -> StoreResult<Vec<String>>;
}
