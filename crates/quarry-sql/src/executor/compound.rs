//! Compound query merging.

use std::ops::Range;

use quarry_common::{CompileError, QuarryError};

use super::{execute, RowSet};
use crate::compiler::CompiledQuery;
use crate::params::{DisplayParams, ParamValue};
use crate::schema::FieldDescriptions;
use crate::storage::Store;

/// The rows one query contributed to a merged result.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Row indices in the merged row set.
    pub rows: Range<usize>,
    /// Field descriptions of the contributing query.
    pub field_descriptions: FieldDescriptions,
}

/// Rows of several queries, concatenated.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedResult {
    /// All rows, query by query.
    pub rows: RowSet,
    /// Union of every query's field descriptions; a later query wins.
    pub field_descriptions: FieldDescriptions,
    /// Overall parameters plus every query-specific parameter, scoped to
    /// the rows of its query.
    pub params: DisplayParams,
    /// One segment per query, in order.
    pub segments: Vec<Segment>,
}

impl MergedResult {
    /// Field descriptions that apply to row `row`.
    pub fn descriptions_for_row(&self, row: usize) -> &FieldDescriptions {
        self.segments
            .iter()
            .find(|s| s.rows.contains(&row))
            .map_or(&self.field_descriptions, |s| &s.field_descriptions)
    }
}

/// Runs `queries` in order and merges their rows.
///
/// `per_query_params[i]` holds the query-specific parameters of
/// `queries[i]`; each becomes a per-row value over that query's rows. A
/// name that is also an overall parameter is a conflict.
pub fn execute_all<S: Store + ?Sized>(
    queries: &[CompiledQuery],
    per_query_params: &[DisplayParams],
    global_params: &DisplayParams,
    store: &S,
) -> Result<MergedResult, QuarryError> {
    let mut merged = MergedResult {
        rows: RowSet::new(),
        field_descriptions: FieldDescriptions::new(),
        params: global_params.clone(),
        segments: Vec::with_capacity(queries.len()),
    };

    for (i, query) in queries.iter().enumerate() {
        let result = execute(query, store)?;
        let start = merged.rows.len();
        let rows = start..start + result.row_count();

        if let Some(params) = per_query_params.get(i) {
            for (name, value) in params.iter() {
                // Query-specific values are always given once per block.
                let ParamValue::Scalar(value) = value else {
                    continue;
                };
                if !merged.params.set_rows(name, rows.clone(), value) {
                    return Err(CompileError::ConflictingParameter {
                        name: name.to_string(),
                    }
                    .into());
                }
            }
        }

        for (alias, description) in &result.field_descriptions {
            merged
                .field_descriptions
                .insert(alias.clone(), description.clone());
        }
        merged.segments.push(Segment {
            rows,
            field_descriptions: result.field_descriptions,
        });
        merged.rows.extend(result.rows);
    }

    tracing::debug!(
        queries = queries.len(),
        rows = merged.rows.len(),
        "compound query merged"
    );
    Ok(merged)
}
