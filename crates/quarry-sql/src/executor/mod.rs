//! Query execution.
//!
//! A compiled query is run with exactly one [`Store::query`] call; the
//! limit is part of the statement, so the row count is a reliable
//! truncation signal. Compound queries are merged by [`execute_all`].

mod compound;

use std::time::Instant;

use quarry_common::ExecutionError;

use crate::compiler::CompiledQuery;
use crate::schema::FieldDescriptions;
use crate::storage::Store;

pub use crate::storage::{Row, RowSet};
pub use compound::{execute_all, MergedResult, Segment};

/// Rows of one executed query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// Rows keyed by output alias, in projection order.
    pub rows: RowSet,
    /// Description of every output alias.
    pub field_descriptions: FieldDescriptions,
    /// Limit the query ran with.
    pub limit: usize,
    /// Wall time of the store call.
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Returns the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the query returned no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns true if more rows may exist past the limit.
    ///
    /// A result of exactly `limit` rows reports true even when nothing
    /// follows.
    pub fn may_be_truncated(&self) -> bool {
        self.rows.len() == self.limit
    }
}

/// Runs one compiled query.
pub fn execute<S: Store + ?Sized>(
    query: &CompiledQuery,
    store: &S,
) -> Result<QueryResult, ExecutionError> {
    let sql = query.sql();
    let start = Instant::now();

    let raw = store.query(&sql).map_err(|e| {
        tracing::warn!(sql = %sql, error = %e, "query failed");
        ExecutionError::from(e)
    })?;

    let elapsed = start.elapsed();
    let rows = raw
        .into_iter()
        .map(|mut row| normalize(query, &mut row))
        .collect::<RowSet>();

    tracing::debug!(rows = rows.len(), elapsed_us = elapsed.as_micros() as u64, "query executed");

    Ok(QueryResult {
        rows,
        field_descriptions: query.field_descriptions.clone(),
        limit: query.limit,
        execution_time_ms: elapsed.as_millis() as u64,
    })
}

/// Reorders a store row to the compiled alias order; absent aliases get "".
fn normalize(query: &CompiledQuery, row: &mut Row) -> Row {
    query
        .aliases()
        .map(|alias| {
            let value = row.swap_remove(alias).unwrap_or_default();
            (alias.to_string(), value)
        })
        .collect()
}
