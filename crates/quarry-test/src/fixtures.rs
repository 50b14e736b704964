//! A small library catalog: books, their authors and some cafes.
//!
//! | table   | rows | notable fields                                   |
//! |---------|------|--------------------------------------------------|
//! | Books   | 4    | `Authors` (Page list, `;`), `Tags` (String list) |
//! | Authors | 3    | `Country`, `Born` (Date)                         |
//! | Cafes   | 3    | `Location` (Coordinates), one row unlocated      |

use std::path::Path;

use quarry_sql::schema::{FieldDescription, FieldType, TableSchema};
use quarry_sql::storage::{PopulationContext, Record, SqliteStore, StoreResult};

/// Schema of `Books`.
pub fn books_schema() -> TableSchema {
    TableSchema::new()
        .with_field("Authors", FieldDescription::list(FieldType::Page, ";"))
        .with_field("Year", FieldDescription::new(FieldType::Integer))
        .with_field("Published", FieldDescription::new(FieldType::Date))
        .with_field(
            "Website",
            FieldDescription::new(FieldType::Url).with_hint(FieldDescription::LINK_TEXT_HINT, "homepage"),
        )
        .with_field("Tags", FieldDescription::list(FieldType::String, ";"))
        .with_field("Blurb", FieldDescription::new(FieldType::Wikitext).with_hidden())
}

/// Schema of `Authors`.
pub fn authors_schema() -> TableSchema {
    TableSchema::new()
        .with_field("Country", FieldDescription::new(FieldType::String))
        .with_field("Born", FieldDescription::new(FieldType::Date))
}

/// Schema of `Cafes`.
pub fn cafes_schema() -> TableSchema {
    TableSchema::new()
        .with_field("Location", FieldDescription::new(FieldType::Coordinates))
        .with_field("Rating", FieldDescription::new(FieldType::Integer))
}

/// Declares the three tables and stores every fixture record.
pub fn seed(store: &SqliteStore) -> StoreResult<()> {
    store.declare_table("Books", &books_schema())?;
    store.declare_table("Authors", &authors_schema())?;
    store.declare_table("Cafes", &cafes_schema())?;

    let books = [
        (1, "Dune", "Frank Herbert", "1965", "1965-08-01", "https://dune.example", "SF;Epic"),
        (2, "Good Omens", "Terry Pratchett;Neil Gaiman", "1990", "1990-05-01", "", "Fantasy;  ;Comic"),
        (3, "Emma", "Jane Austen", "1815", "1815-12-23", "", "Romance"),
        (4, "Coraline", "Neil Gaiman", "2002", "", "", ""),
    ];
    for (page_id, name, authors, year, published, website, tags) in books {
        let record = Record::new(name)
            .with_value("Authors", authors)
            .with_value("Year", year)
            .with_value("Published", published)
            .with_value("Website", website)
            .with_value("Tags", tags);
        store.populate(&PopulationContext::page_save(page_id), "Books", &[record])?;
    }

    let authors = [
        (11, "Frank Herbert", "USA", "1920-10-08"),
        (12, "Terry Pratchett", "UK", "1948-04-28"),
        (13, "Neil Gaiman", "UK", "1960-11-10"),
    ];
    for (page_id, name, country, born) in authors {
        let record = Record::new(name)
            .with_value("Country", country)
            .with_value("Born", born);
        store.populate(&PopulationContext::page_save(page_id), "Authors", &[record])?;
    }

    let cafes = [
        (21, "Café <Flore>", "48.854, 2.333", "5"),
        (22, "Hawelka", "48.208, 16.370", "4"),
        (23, "Nowhere Diner", "", "2"),
    ];
    for (page_id, name, location, rating) in cafes {
        let record = Record::new(name)
            .with_value("Location", location)
            .with_value("Rating", rating);
        store.populate(&PopulationContext::page_save(page_id), "Cafes", &[record])?;
    }

    Ok(())
}

/// An in-memory store holding the fixture tables.
pub fn library_store() -> StoreResult<SqliteStore> {
    let store = SqliteStore::open_in_memory()?;
    seed(&store)?;
    Ok(store)
}

/// An on-disk store at `path` holding the fixture tables.
pub fn library_store_at(path: &Path) -> StoreResult<SqliteStore> {
    let store = SqliteStore::open(path)?;
    seed(&store)?;
    Ok(store)
}
