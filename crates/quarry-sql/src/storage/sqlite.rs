//! SQLite reference store.

use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use parking_lot::Mutex;
use quarry_common::constants::{
    field_table_name, FIELD_TABLE_POSITION, FIELD_TABLE_ROW_ID, FIELD_TABLE_VALUE, FULL_SUFFIX,
    LAT_SUFFIX, LON_SUFFIX, PAGE_ID_COLUMN, PAGE_NAMESPACE_COLUMN, PAGE_NAME_COLUMN,
    PAGE_TITLE_COLUMN, ROW_ID_COLUMN, TABLES_METADATA_TABLE,
};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use super::{Row, RowSet, Store, StoreError, StoreResult};
use crate::ident::{is_identifier, quote_ident};
use crate::schema::{FieldDescription, FieldType, TableSchema};

/// Tracks which tables hold rows of which document.
const PAGES_TABLE: &str = "cargo_pages";

/// What triggered a population run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopulationOrigin {
    /// A document was saved.
    PageSave,
    /// A table was (re)declared and is being repopulated.
    Template,
    /// Explicit load, e.g. from the CLI.
    Manual,
}

impl fmt::Display for PopulationOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PopulationOrigin::PageSave => write!(f, "page save"),
            PopulationOrigin::Template => write!(f, "template"),
            PopulationOrigin::Manual => write!(f, "manual"),
        }
    }
}

/// Explicit context of one population run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulationContext {
    /// What triggered the run.
    pub origin: PopulationOrigin,
    /// Document whose records are being stored.
    pub page_id: i64,
    /// Delete the document's existing rows in the table first.
    pub replace_old_rows: bool,
}

impl PopulationContext {
    /// Context for a document save; old rows are always replaced.
    pub fn page_save(page_id: i64) -> Self {
        Self {
            origin: PopulationOrigin::PageSave,
            page_id,
            replace_old_rows: true,
        }
    }

    /// Context for repopulating a table from one document.
    pub fn template(page_id: i64, replace_old_rows: bool) -> Self {
        Self {
            origin: PopulationOrigin::Template,
            page_id,
            replace_old_rows,
        }
    }

    /// Context for an explicit load that only appends.
    pub fn manual(page_id: i64) -> Self {
        Self {
            origin: PopulationOrigin::Manual,
            page_id,
            replace_old_rows: false,
        }
    }
}

/// One record to store: the originating document plus field values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Full name of the originating document.
    pub page_name: String,
    /// Document title without namespace.
    pub page_title: String,
    /// Namespace number of the document.
    pub page_namespace: i64,
    /// Identifier of the document.
    pub page_id: i64,
    /// Raw field values keyed by field name.
    pub values: IndexMap<String, String>,
}

impl Record {
    /// Creates a record for a document in the main namespace.
    pub fn new(page_name: impl Into<String>) -> Self {
        let page_name = page_name.into();
        Self {
            page_title: page_name.clone(),
            page_name,
            page_namespace: 0,
            page_id: 0,
            values: IndexMap::new(),
        }
    }

    /// Sets the document identifier.
    pub fn with_page_id(mut self, page_id: i64) -> Self {
        self.page_id = page_id;
        self
    }

    /// Sets the namespace number and title.
    pub fn with_namespace(mut self, namespace: i64, title: impl Into<String>) -> Self {
        self.page_namespace = namespace;
        self.page_title = title.into();
        self
    }

    /// Sets a field value.
    pub fn with_value(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(field.into(), value.into());
        self
    }
}

/// A [`Store`] backed by one SQLite database.
///
/// Declared tables follow the physical layout every query compiles
/// against: a main table with the built-in columns, `F__full` for list
/// fields plus a `T__F` field table, and `C__full`/`C__lat`/`C__lon` for
/// coordinates.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Opens (or creates) a database file.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .map_err(|e| StoreError::Unreachable(format!("{}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), "opened sqlite store");
        Self::init(conn)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {meta} (
                main_table TEXT PRIMARY KEY,
                field_tables TEXT NOT NULL,
                table_schema TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS {pages} (
                table_name TEXT NOT NULL,
                page_id INTEGER NOT NULL,
                UNIQUE (table_name, page_id)
            );",
            meta = TABLES_METADATA_TABLE,
            pages = PAGES_TABLE,
        ))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Declares a table, replacing any previous declaration and its rows.
    pub fn declare_table(&self, table: &str, schema: &TableSchema) -> StoreResult<()> {
        if !is_identifier(table)
            || table.contains("__")
            || table == TABLES_METADATA_TABLE
            || table == PAGES_TABLE
        {
            return Err(StoreError::InvalidSchema {
                table: table.to_string(),
                message: "table names must be plain identifiers without \"__\"".to_string(),
            });
        }
        schema.validate().map_err(|e| StoreError::InvalidSchema {
            table: table.to_string(),
            message: e.to_string(),
        })?;
        let encoded = schema.to_db_string().map_err(|e| StoreError::InvalidSchema {
            table: table.to_string(),
            message: e.to_string(),
        })?;

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        drop_table_in(&tx, table)?;

        let mut columns = vec![
            format!("{} INTEGER PRIMARY KEY", quote_ident(ROW_ID_COLUMN)),
            format!("{} TEXT", quote_ident(PAGE_NAME_COLUMN)),
            format!("{} TEXT", quote_ident(PAGE_TITLE_COLUMN)),
            format!("{} INTEGER", quote_ident(PAGE_NAMESPACE_COLUMN)),
            format!("{} INTEGER", quote_ident(PAGE_ID_COLUMN)),
        ];
        let mut field_tables = Vec::new();
        for (name, field) in schema.fields() {
            if field.is_list() {
                columns.push(format!("{} TEXT", quote_ident(&format!("{name}{FULL_SUFFIX}"))));
                let field_table = field_table_name(table, name);
                tx.execute_batch(&format!(
                    "CREATE TABLE {} ({} INTEGER NOT NULL, {} {}, {} INTEGER NOT NULL)",
                    quote_ident(&field_table),
                    quote_ident(FIELD_TABLE_ROW_ID),
                    quote_ident(FIELD_TABLE_VALUE),
                    column_type(field.field_type),
                    quote_ident(FIELD_TABLE_POSITION),
                ))?;
                tx.execute_batch(&format!(
                    "CREATE INDEX {} ON {} ({}, {})",
                    quote_ident(&format!("idx_{field_table}")),
                    quote_ident(&field_table),
                    quote_ident(FIELD_TABLE_ROW_ID),
                    quote_ident(FIELD_TABLE_POSITION),
                ))?;
                field_tables.push(field_table);
            } else if field.field_type == FieldType::Coordinates {
                columns.push(format!("{} TEXT", quote_ident(&format!("{name}{FULL_SUFFIX}"))));
                columns.push(format!("{} REAL", quote_ident(&format!("{name}{LAT_SUFFIX}"))));
                columns.push(format!("{} REAL", quote_ident(&format!("{name}{LON_SUFFIX}"))));
            } else {
                columns.push(format!("{} {}", quote_ident(name), column_type(field.field_type)));
            }
        }
        tx.execute_batch(&format!(
            "CREATE TABLE {} ({})",
            quote_ident(table),
            columns.join(", ")
        ))?;

        let field_tables_json = serde_json::to_string(&field_tables)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        tx.execute(
            &format!(
                "INSERT INTO {TABLES_METADATA_TABLE} (main_table, field_tables, table_schema) VALUES (?1, ?2, ?3)"
            ),
            params![table, field_tables_json, encoded],
        )?;
        tx.commit()?;

        tracing::info!(table, fields = schema.len(), "declared table");
        Ok(())
    }

    /// Drops a declared table and its field tables. Returns false if the
    /// table was not declared.
    pub fn drop_table(&self, table: &str) -> StoreResult<bool> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let dropped = drop_table_in(&tx, table)?;
        tx.commit()?;
        Ok(dropped)
    }

    /// Stores one record and returns its row id.
    pub fn insert_record(&self, table: &str, record: &Record) -> StoreResult<i64> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let schema = load_schema_in(&tx, table)?.ok_or_else(|| StoreError::InvalidSchema {
            table: table.to_string(),
            message: "table is not declared".to_string(),
        })?;
        let row_id = insert_in(&tx, table, &schema, record, record.page_id)?;
        tx.commit()?;
        Ok(row_id)
    }

    /// Stores all records of one document under an explicit population
    /// context. Returns the number of rows written.
    pub fn populate(
        &self,
        ctx: &PopulationContext,
        table: &str,
        records: &[Record],
    ) -> StoreResult<usize> {
        tracing::debug!(
            origin = %ctx.origin,
            table,
            page_id = ctx.page_id,
            records = records.len(),
            "populating table"
        );

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let schema = load_schema_in(&tx, table)?.ok_or_else(|| StoreError::InvalidSchema {
            table: table.to_string(),
            message: "table is not declared".to_string(),
        })?;
        if ctx.replace_old_rows {
            delete_page_rows_in(&tx, table, ctx.page_id)?;
        }
        for record in records {
            insert_in(&tx, table, &schema, record, ctx.page_id)?;
        }
        tx.commit()?;
        Ok(records.len())
    }

    /// Deletes every row any table holds for a document. Returns the number
    /// of main-table rows removed.
    pub fn delete_page(&self, page_id: i64) -> StoreResult<usize> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let tables: Vec<String> = {
            let mut stmt =
                tx.prepare(&format!("SELECT table_name FROM {PAGES_TABLE} WHERE page_id = ?1"))?;
            let names = stmt.query_map(params![page_id], |row| row.get(0))?;
            names.collect::<Result<_, _>>()?
        };

        let mut deleted = 0;
        for table in &tables {
            deleted += delete_page_rows_in(&tx, table, page_id)?;
        }
        tx.execute(
            &format!("DELETE FROM {PAGES_TABLE} WHERE page_id = ?1"),
            params![page_id],
        )?;
        tx.commit()?;

        tracing::debug!(page_id, tables = tables.len(), rows = deleted, "deleted page rows");
        Ok(deleted)
    }
}

impl Store for SqliteStore {
    fn resolve_schema(&self, table: &str) -> StoreResult<Option<TableSchema>> {
        let conn = self.conn.lock();
        load_schema_in(&conn, table)
    }

    fn query(&self, sql: &str) -> StoreResult<RowSet> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        if !stmt.readonly() {
            return Err(StoreError::PermissionDenied(
                "only read-only statements may be queried".to_string(),
            ));
        }

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query([])?;
        let mut result = RowSet::new();
        while let Some(row) = rows.next()? {
            let mut values = Row::with_capacity(columns.len());
            for (i, name) in columns.iter().enumerate() {
                values.insert(name.clone(), value_to_string(row.get_ref(i)?));
            }
            result.push(values);
        }
        Ok(result)
    }

    fn list_tables(&self) -> StoreResult<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare(&format!("SELECT main_table FROM {TABLES_METADATA_TABLE} ORDER BY main_table"))?;
        let names = stmt.query_map([], |row| row.get(0))?;
        Ok(names.collect::<Result<_, _>>()?)
    }
}

fn column_type(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::Integer | FieldType::Boolean => "INTEGER",
        FieldType::Float | FieldType::CoordinatesPart => "REAL",
        FieldType::Page
        | FieldType::String
        | FieldType::Text
        | FieldType::Date
        | FieldType::Datetime
        | FieldType::Coordinates
        | FieldType::Url
        | FieldType::Email
        | FieldType::File
        | FieldType::Wikitext => "TEXT",
    }
}

fn value_to_string(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Converts one raw element into the value bound for its column.
fn typed_value(field: &FieldDescription, raw: &str) -> Value {
    let raw = raw.trim();
    if raw.is_empty() {
        return Value::Null;
    }
    match field.field_type {
        FieldType::Boolean => match raw.to_ascii_lowercase().as_str() {
            "yes" | "true" | "on" | "1" => Value::Integer(1),
            "no" | "false" | "off" | "0" => Value::Integer(0),
            _ => Value::Text(raw.to_string()),
        },
        FieldType::Integer => raw
            .parse::<i64>()
            .map_or_else(|_| Value::Text(raw.to_string()), Value::Integer),
        FieldType::Float => raw
            .parse::<f64>()
            .map_or_else(|_| Value::Text(raw.to_string()), Value::Real),
        _ => Value::Text(raw.to_string()),
    }
}

/// Parses `"lat, lon"` in decimal degrees.
fn parse_coordinates(raw: &str) -> Option<(f64, f64)> {
    let (lat, lon) = raw.split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lon: f64 = lon.trim().parse().ok()?;
    ((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)).then_some((lat, lon))
}

fn load_schema_in(conn: &Connection, table: &str) -> StoreResult<Option<TableSchema>> {
    let encoded: Option<String> = conn
        .query_row(
            &format!("SELECT table_schema FROM {TABLES_METADATA_TABLE} WHERE main_table = ?1"),
            params![table],
            |row| row.get(0),
        )
        .optional()?;

    encoded
        .map(|blob| {
            TableSchema::from_db_string(&blob).map_err(|e| StoreError::InvalidSchema {
                table: table.to_string(),
                message: e.to_string(),
            })
        })
        .transpose()
}

fn load_field_tables_in(conn: &Connection, table: &str) -> StoreResult<Option<Vec<String>>> {
    let encoded: Option<String> = conn
        .query_row(
            &format!("SELECT field_tables FROM {TABLES_METADATA_TABLE} WHERE main_table = ?1"),
            params![table],
            |row| row.get(0),
        )
        .optional()?;

    encoded
        .map(|blob| {
            serde_json::from_str(&blob).map_err(|e| StoreError::InvalidSchema {
                table: table.to_string(),
                message: format!("cannot decode field tables: {e}"),
            })
        })
        .transpose()
}

fn drop_table_in(conn: &Connection, table: &str) -> StoreResult<bool> {
    let Some(field_tables) = load_field_tables_in(conn, table)? else {
        return Ok(false);
    };
    for field_table in &field_tables {
        conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_ident(field_table)))?;
    }
    conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_ident(table)))?;
    conn.execute(
        &format!("DELETE FROM {TABLES_METADATA_TABLE} WHERE main_table = ?1"),
        params![table],
    )?;
    conn.execute(
        &format!("DELETE FROM {PAGES_TABLE} WHERE table_name = ?1"),
        params![table],
    )?;
    Ok(true)
}

fn delete_page_rows_in(conn: &Connection, table: &str, page_id: i64) -> StoreResult<usize> {
    let field_tables = load_field_tables_in(conn, table)?.unwrap_or_default();
    for field_table in &field_tables {
        conn.execute(
            &format!(
                "DELETE FROM {ft} WHERE {row_id} IN (SELECT {id} FROM {main} WHERE {page} = ?1)",
                ft = quote_ident(field_table),
                row_id = quote_ident(FIELD_TABLE_ROW_ID),
                id = quote_ident(ROW_ID_COLUMN),
                main = quote_ident(table),
                page = quote_ident(PAGE_ID_COLUMN),
            ),
            params![page_id],
        )?;
    }
    let deleted = conn.execute(
        &format!(
            "DELETE FROM {} WHERE {} = ?1",
            quote_ident(table),
            quote_ident(PAGE_ID_COLUMN)
        ),
        params![page_id],
    )?;
    Ok(deleted)
}

fn insert_in(
    conn: &Connection,
    table: &str,
    schema: &TableSchema,
    record: &Record,
    page_id: i64,
) -> StoreResult<i64> {
    if let Some(unknown) = record.values.keys().find(|name| !schema.contains(name)) {
        return Err(StoreError::InvalidSchema {
            table: table.to_string(),
            message: format!("record sets undeclared field \"{unknown}\""),
        });
    }

    let mut columns = vec![
        quote_ident(PAGE_NAME_COLUMN),
        quote_ident(PAGE_TITLE_COLUMN),
        quote_ident(PAGE_NAMESPACE_COLUMN),
        quote_ident(PAGE_ID_COLUMN),
    ];
    let mut values = vec![
        Value::Text(record.page_name.clone()),
        Value::Text(record.page_title.clone()),
        Value::Integer(record.page_namespace),
        Value::Integer(page_id),
    ];

    for (name, field) in schema.fields() {
        let raw = record.values.get(name).map(String::as_str).unwrap_or("");
        if field.is_list() {
            columns.push(quote_ident(&format!("{name}{FULL_SUFFIX}")));
            values.push(if raw.trim().is_empty() {
                Value::Null
            } else {
                Value::Text(raw.to_string())
            });
        } else if field.field_type == FieldType::Coordinates {
            let parsed = parse_coordinates(raw);
            columns.push(quote_ident(&format!("{name}{FULL_SUFFIX}")));
            columns.push(quote_ident(&format!("{name}{LAT_SUFFIX}")));
            columns.push(quote_ident(&format!("{name}{LON_SUFFIX}")));
            values.push(if raw.trim().is_empty() {
                Value::Null
            } else {
                Value::Text(raw.trim().to_string())
            });
            values.push(parsed.map_or(Value::Null, |(lat, _)| Value::Real(lat)));
            values.push(parsed.map_or(Value::Null, |(_, lon)| Value::Real(lon)));
        } else {
            columns.push(quote_ident(name));
            values.push(typed_value(field, raw));
        }
    }

    let placeholders = vec!["?"; values.len()].join(", ");
    conn.execute(
        &format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(table),
            columns.join(", "),
            placeholders
        ),
        params_from_iter(values.iter()),
    )?;
    let row_id = conn.last_insert_rowid();

    for (name, field) in schema.fields() {
        let Some(delimiter) = field.delimiter() else {
            continue;
        };
        let Some(raw) = record.values.get(name) else {
            continue;
        };
        let field_table = field_table_name(table, name);
        let sql = format!(
            "INSERT INTO {} ({}, {}, {}) VALUES (?1, ?2, ?3)",
            quote_ident(&field_table),
            quote_ident(FIELD_TABLE_ROW_ID),
            quote_ident(FIELD_TABLE_VALUE),
            quote_ident(FIELD_TABLE_POSITION),
        );
        let elements = raw.split(delimiter).map(str::trim).filter(|e| !e.is_empty());
        for (position, element) in elements.enumerate() {
            conn.execute(
                &sql,
                params![row_id, typed_value(field, element), position as i64],
            )?;
        }
    }

    if page_id != 0 {
        conn.execute(
            &format!("INSERT OR IGNORE INTO {PAGES_TABLE} (table_name, page_id) VALUES (?1, ?2)"),
            params![table, page_id],
        )?;
    }
    Ok(row_id)
}
