//! JSON results endpoint.
//!
//! Returns raw values, one object per row wrapped under `"title"`:
//!
//! ```json
//! [{"title": {"Title": "Dune", "Year": "1965"}}]
//! ```

use quarry_common::{CompileError, QuarryError, QueryConfig};
use quarry_sql::compiler::compile;
use quarry_sql::dsl::QueryClauses;
use quarry_sql::executor::execute;
use quarry_sql::storage::Store;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Request parameters of the results endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApiRequest {
    /// Tables to query, with optional aliases.
    pub tables: String,
    /// Fields to return.
    pub fields: String,
    /// Row filter.
    #[serde(rename = "where")]
    pub where_clause: String,
    /// Join conditions.
    pub join_on: String,
    /// Grouping.
    pub group_by: String,
    /// Ordering.
    pub order_by: String,
    /// Row limit.
    pub limit: String,
}

impl ApiRequest {
    /// Converts the request into query clauses.
    pub fn into_clauses(self) -> QueryClauses {
        QueryClauses {
            tables: self.tables,
            fields: self.fields,
            where_clause: self.where_clause,
            join_on: self.join_on,
            group_by: self.group_by,
            order_by: self.order_by,
            limit: self.limit,
        }
    }
}

/// Compiles and runs `clauses`, returning the rows as JSON.
pub fn query_results_json<S: Store + ?Sized>(
    clauses: &QueryClauses,
    store: &S,
    config: &QueryConfig,
) -> Result<Value, QuarryError> {
    if clauses.tables.trim().is_empty() {
        return Err(CompileError::invalid_clause("tables", "the tables must be specified").into());
    }

    let query = compile(clauses, store, config)?;
    let result = execute(&query, store)?;

    let rows = result
        .rows
        .into_iter()
        .map(|row| {
            let values: Map<String, Value> = row
                .into_iter()
                .map(|(alias, value)| (alias, Value::String(value)))
                .collect();
            let mut entry = Map::new();
            entry.insert("title".to_string(), Value::Object(values));
            Value::Object(entry)
        })
        .collect();
    Ok(Value::Array(rows))
}
