//! Table name to schema resolution.
//!
//! The compiler only needs to look schemas up, so it depends on
//! [`SchemaResolver`] rather than on a full [`Store`]. Every store is a
//! resolver; [`SchemaCatalog`] is an in-memory resolver for callers that
//! hold schemas without a database.

use std::collections::HashMap;

use parking_lot::RwLock;
use quarry_common::CompileError;

use crate::schema::TableSchema;
use crate::storage::Store;

/// Resolves table names to their schemas.
pub trait SchemaResolver {
    /// Returns the schema of `table`, `None` if it is not declared, or
    /// `SchemaLoad` if the schema exists but cannot be loaded.
    fn resolve(&self, table: &str) -> Result<Option<TableSchema>, CompileError>;
}

impl<S: Store + ?Sized> SchemaResolver for S {
    fn resolve(&self, table: &str) -> Result<Option<TableSchema>, CompileError> {
        self.resolve_schema(table)
            .map_err(|e| CompileError::SchemaLoad {
                table: table.to_string(),
                message: e.to_string(),
            })
    }
}

/// Resolves every name, in order. The first undeclared table fails the
/// whole lookup with `UnknownTable`.
pub fn resolve_tables<R, I, N>(resolver: &R, tables: I) -> Result<Vec<TableSchema>, CompileError>
where
    R: SchemaResolver + ?Sized,
    I: IntoIterator<Item = N>,
    N: AsRef<str>,
{
    tables
        .into_iter()
        .map(|name| {
            let name = name.as_ref();
            resolver
                .resolve(name)?
                .ok_or_else(|| CompileError::unknown_table(name))
        })
        .collect()
}

/// In-memory schema catalog.
#[derive(Debug, Default)]
pub struct SchemaCatalog {
    /// Schemas by table name.
    tables: RwLock<HashMap<String, TableSchema>>,
}

impl SchemaCatalog {
    /// Creates a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a schema, replacing any previous one. Returns the replaced
    /// schema.
    pub fn register(&self, table: impl Into<String>, schema: TableSchema) -> Option<TableSchema> {
        self.tables.write().insert(table.into(), schema)
    }

    /// Removes a table.
    pub fn remove(&self, table: &str) -> Option<TableSchema> {
        self.tables.write().remove(table)
    }

    /// Checks if a table is registered.
    pub fn contains(&self, table: &str) -> bool {
        self.tables.read().contains_key(table)
    }

    /// Lists registered table names, sorted.
    pub fn list_tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the number of tables.
    pub fn table_count(&self) -> usize {
        self.tables.read().len()
    }
}

impl SchemaResolver for SchemaCatalog {
    fn resolve(&self, table: &str) -> Result<Option<TableSchema>, CompileError> {
        Ok(self.tables.read().get(table).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDescription, FieldType};
    use crate::storage::SqliteStore;

    fn books_schema() -> TableSchema {
        TableSchema::new().with_field("Year", FieldDescription::new(FieldType::Integer))
    }

    #[test]
    fn test_catalog_register() {
        let catalog = SchemaCatalog::new();
        assert!(catalog.register("Books", books_schema()).is_none());
        assert!(catalog.register("Books", books_schema()).is_some());
        catalog.register("Authors", TableSchema::new());

        assert!(catalog.contains("Books"));
        assert_eq!(catalog.table_count(), 2);
        assert_eq!(catalog.list_tables(), vec!["Authors", "Books"]);

        catalog.remove("Authors");
        assert!(!catalog.contains("Authors"));
    }

    #[test]
    fn test_resolve_tables_in_order() {
        let catalog = SchemaCatalog::new();
        catalog.register("Books", books_schema());
        catalog.register("Authors", TableSchema::new());

        let schemas = resolve_tables(&catalog, ["Authors", "Books"]).unwrap();
        assert!(schemas[0].is_empty());
        assert_eq!(schemas[1].len(), 1);
    }

    #[test]
    fn test_resolve_unknown_table() {
        let catalog = SchemaCatalog::new();
        catalog.register("Books", books_schema());

        let err = resolve_tables(&catalog, ["Books", "Films"]).unwrap_err();
        assert_eq!(err, CompileError::unknown_table("Films"));
    }

    #[test]
    fn test_store_is_resolver() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.declare_table("Books", &books_schema()).unwrap();

        let dyn_store: &dyn Store = &store;
        assert!(dyn_store.resolve("Books").unwrap().is_some());
        assert!(store.resolve("Films").unwrap().is_none());
    }
}
