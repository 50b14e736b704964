//! Name resolution against the queried tables.

use quarry_common::constants::{
    FULL_SUFFIX, LAT_SUFFIX, LON_SUFFIX, PAGE_ID_COLUMN, PAGE_NAMESPACE_COLUMN, PAGE_NAME_COLUMN,
    PAGE_TITLE_COLUMN, ROW_ID_COLUMN,
};

use super::TableRef;
use crate::schema::{FieldDescription, FieldType, TableSchema};

/// What a resolved name refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RefKind {
    /// A plain column of the main table.
    Column {
        column: String,
        description: FieldDescription,
    },
    /// A declared list field; its elements live in the field table.
    List { description: FieldDescription },
    /// A declared coordinates field.
    Coordinates { description: FieldDescription },
}

/// A name resolved to one table of the scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FieldRef {
    /// Index into the scope's tables.
    pub table: usize,
    /// Field name as written, without qualifier.
    pub field: String,
    pub kind: RefKind,
}

/// Why a name did not resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Unresolved {
    Unknown,
    Ambiguous,
}

/// The tables of one query with their schemas.
pub(crate) struct Scope<'a> {
    tables: &'a [TableRef],
    schemas: &'a [TableSchema],
}

impl<'a> Scope<'a> {
    pub(crate) fn new(tables: &'a [TableRef], schemas: &'a [TableSchema]) -> Self {
        Self { tables, schemas }
    }

    /// Name the table is referenced by in the statement.
    pub(crate) fn effective_name(&self, table: usize) -> &str {
        self.tables[table].effective_name()
    }

    /// Underlying table name, used for field tables.
    pub(crate) fn table_name(&self, table: usize) -> &str {
        &self.tables[table].name
    }

    pub(crate) fn table_index(&self, effective_name: &str) -> Option<usize> {
        self.tables
            .iter()
            .position(|t| t.effective_name() == effective_name)
    }

    /// Resolves `[qualifier.]name`.
    ///
    /// Built-in columns of an unqualified name bind to the first table.
    pub(crate) fn resolve(&self, qualifier: Option<&str>, name: &str) -> Result<FieldRef, Unresolved> {
        if let Some(qualifier) = qualifier {
            let table = self.table_index(qualifier).ok_or(Unresolved::Unknown)?;
            return lookup(&self.schemas[table], name)
                .map(|kind| FieldRef {
                    table,
                    field: name.to_string(),
                    kind,
                })
                .ok_or(Unresolved::Unknown);
        }

        if let Some(kind) = builtin(name) {
            return Ok(FieldRef {
                table: 0,
                field: name.to_string(),
                kind,
            });
        }

        let mut found = self
            .schemas
            .iter()
            .enumerate()
            .filter_map(|(table, schema)| lookup(schema, name).map(|kind| (table, kind)));
        match (found.next(), found.next()) {
            (Some((table, kind)), None) => Ok(FieldRef {
                table,
                field: name.to_string(),
                kind,
            }),
            (Some(_), Some(_)) => Err(Unresolved::Ambiguous),
            (None, _) => Err(Unresolved::Unknown),
        }
    }
}

fn builtin(name: &str) -> Option<RefKind> {
    let field_type = match name {
        PAGE_NAME_COLUMN => FieldType::Page,
        PAGE_TITLE_COLUMN => FieldType::String,
        PAGE_NAMESPACE_COLUMN | PAGE_ID_COLUMN | ROW_ID_COLUMN => FieldType::Integer,
        _ => return None,
    };
    Some(RefKind::Column {
        column: name.to_string(),
        description: FieldDescription::new(field_type),
    })
}

/// Looks a name up in one schema, including built-in and derived columns.
fn lookup(schema: &TableSchema, name: &str) -> Option<RefKind> {
    if let Some(kind) = builtin(name) {
        return Some(kind);
    }

    if let Some(field) = schema.field(name) {
        let description = field.clone();
        return Some(if field.is_list() {
            RefKind::List { description }
        } else if field.field_type == FieldType::Coordinates {
            RefKind::Coordinates { description }
        } else {
            RefKind::Column {
                column: name.to_string(),
                description,
            }
        });
    }

    if let Some(base) = name.strip_suffix(FULL_SUFFIX) {
        let field = schema.field(base)?;
        if field.is_list() || field.field_type == FieldType::Coordinates {
            return Some(RefKind::Column {
                column: name.to_string(),
                description: field.clone(),
            });
        }
        return None;
    }

    let base = name
        .strip_suffix(LAT_SUFFIX)
        .or_else(|| name.strip_suffix(LON_SUFFIX))?;
    let field = schema.field(base)?;
    (field.field_type == FieldType::Coordinates).then(|| RefKind::Column {
        column: name.to_string(),
        description: FieldDescription::new(FieldType::Float),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (Vec<TableRef>, Vec<TableSchema>) {
        let tables = vec![
            TableRef::new("Books", None),
            TableRef::new("Authors", Some("A".to_string())),
        ];
        let schemas = vec![
            TableSchema::new()
                .with_field("Author", FieldDescription::new(FieldType::Page))
                .with_field("Genres", FieldDescription::list(FieldType::String, ","))
                .with_field("Country", FieldDescription::new(FieldType::String)),
            TableSchema::new()
                .with_field("Country", FieldDescription::new(FieldType::String))
                .with_field("Birthplace", FieldDescription::new(FieldType::Coordinates)),
        ];
        (tables, schemas)
    }

    #[test]
    fn test_resolve_unique_and_builtin() {
        let (tables, schemas) = fixture();
        let scope = Scope::new(&tables, &schemas);

        let author = scope.resolve(None, "Author").unwrap();
        assert_eq!(author.table, 0);

        let birthplace = scope.resolve(None, "Birthplace").unwrap();
        assert_eq!(birthplace.table, 1);
        assert!(matches!(birthplace.kind, RefKind::Coordinates { .. }));

        let page = scope.resolve(None, "_pageName").unwrap();
        assert_eq!(page.table, 0);
        let page = scope.resolve(Some("A"), "_pageName").unwrap();
        assert_eq!(page.table, 1);
    }

    #[test]
    fn test_resolve_ambiguous_and_unknown() {
        let (tables, schemas) = fixture();
        let scope = Scope::new(&tables, &schemas);

        assert_eq!(scope.resolve(None, "Country"), Err(Unresolved::Ambiguous));
        assert_eq!(scope.resolve(Some("A"), "Country").unwrap().table, 1);
        assert_eq!(scope.resolve(None, "Publisher"), Err(Unresolved::Unknown));
        // Tables are referenced by alias once aliased
        assert_eq!(scope.resolve(Some("Authors"), "Country"), Err(Unresolved::Unknown));
    }

    #[test]
    fn test_resolve_derived_columns() {
        let (tables, schemas) = fixture();
        let scope = Scope::new(&tables, &schemas);

        let full = scope.resolve(None, "Genres__full").unwrap();
        assert!(matches!(
            full.kind,
            RefKind::Column { ref column, ref description } if column == "Genres__full" && description.is_list()
        ));

        let lat = scope.resolve(None, "Birthplace__lat").unwrap();
        assert!(matches!(
            lat.kind,
            RefKind::Column { ref description, .. } if description.field_type == FieldType::Float
        ));

        assert_eq!(scope.resolve(None, "Author__full"), Err(Unresolved::Unknown));
        assert_eq!(scope.resolve(None, "Author__lat"), Err(Unresolved::Unknown));
    }
}
