//! Subcommands.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Subcommand, ValueEnum};
use quarry_format::{query_results_json, QueryRunner};
use quarry_sql::compiler::compile;
use quarry_sql::dsl::{CompoundQuery, QueryBlock};
use quarry_sql::executor::execute;
use quarry_sql::ident::quote_ident;
use quarry_sql::schema::TableSchema;
use quarry_sql::storage::{PopulationContext, Record, SqliteStore, Store};
use tracing::info;

use crate::config::CliConfig;
use crate::output::{self, OutputFormat};

/// A CLI subcommand.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Declare a table from a JSON schema file, replacing any existing one
    Declare {
        /// Table name
        table: String,
        /// Schema file, e.g. {"Year": {"type": "Integer"}}
        #[arg(long, value_name = "FILE")]
        schema: PathBuf,
    },
    /// Store one record
    Insert {
        /// Table name
        table: String,
        /// Name of the originating document
        page: String,
        /// Identifier of the originating document
        #[arg(long, default_value_t = 0)]
        page_id: i64,
        /// Field value; repeat for several fields
        #[arg(short = 'f', long = "field", value_name = "NAME=VALUE")]
        fields: Vec<String>,
        /// Replace the document's existing rows in the table
        #[arg(long)]
        replace: bool,
    },
    /// Delete every row stored for a document
    DeletePage {
        /// Identifier of the document
        page_id: i64,
    },
    /// Drop a declared table
    Drop {
        /// Table name
        table: String,
    },
    /// Display one query block as HTML, e.g. "tables=Books;fields=Year;format=ul"
    Query {
        /// The query block
        block: String,
    },
    /// Display a compound query as HTML; each argument is one parameter
    Compound {
        /// Query blocks (containing "tables=") and overall parameters
        #[arg(required = true)]
        params: Vec<String>,
    },
    /// Print the results of a query block as JSON
    Json {
        /// The query block
        block: String,
    },
    /// Print the raw rows of a query block
    Rows {
        /// The query block
        block: String,
        /// Output format
        #[arg(short = 'o', long, value_enum, default_value = "table")]
        output: OutputFormatArg,
    },
    /// List declared tables
    Tables {
        /// Print the HTML listing instead
        #[arg(long)]
        html: bool,
    },
    /// Display the first rows of a table as HTML
    Browse {
        /// Table name
        table: String,
    },
}

/// Output format argument.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormatArg {
    /// Display results in a formatted table
    Table,
    /// Display results as JSON
    Json,
    /// Display tab-separated values
    Raw,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Table => OutputFormat::Table,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Raw => OutputFormat::Raw,
        }
    }
}

impl Command {
    /// Runs the command and returns what to print.
    pub fn execute(&self, store: &SqliteStore, config: &CliConfig) -> Result<String> {
        let runner = QueryRunner::new(store, config.quarry.clone());
        match self {
            Command::Declare { table, schema } => {
                let encoded = std::fs::read_to_string(schema)
                    .with_context(|| format!("cannot read schema file {}", schema.display()))?;
                let schema = TableSchema::from_db_string(&encoded)?;
                store.declare_table(table, &schema)?;
                Ok(format!("Declared table {table} with {} fields", schema.len()))
            }
            Command::Insert {
                table,
                page,
                page_id,
                fields,
                replace,
            } => {
                let record = parse_record(page, *page_id, fields)?;
                let ctx = if *replace {
                    PopulationContext::page_save(*page_id)
                } else {
                    PopulationContext::manual(*page_id)
                };
                let written = store.populate(&ctx, table, &[record])?;
                Ok(format!("Stored {written} row(s) in {table}"))
            }
            Command::DeletePage { page_id } => {
                let deleted = store.delete_page(*page_id)?;
                Ok(format!("Deleted {deleted} row(s)"))
            }
            Command::Drop { table } => {
                if !store.drop_table(table)? {
                    bail!("table {table} is not declared");
                }
                Ok(format!("Dropped table {table}"))
            }
            Command::Query { block } => Ok(runner.display(&QueryBlock::parse(block))),
            Command::Compound { params } => {
                Ok(runner.display_compound(&CompoundQuery::from_params(params)))
            }
            Command::Json { block } => {
                let block = QueryBlock::parse(block);
                let value = query_results_json(&block.clauses, store, &config.quarry.query)?;
                Ok(serde_json::to_string_pretty(&value)?)
            }
            Command::Rows { block, output } => {
                let block = QueryBlock::parse(block);
                let query = compile(&block.clauses, store, &config.quarry.query)?;
                info!(sql = %query.sql(), "running query");
                let result = execute(&query, store)?;
                let columns: Vec<String> = query.aliases().map(str::to_string).collect();
                Ok(output::format_rows(&columns, &result.rows, (*output).into()))
            }
            Command::Tables { html } => {
                if *html {
                    return Ok(runner.list_tables()?);
                }
                let mut tables = Vec::new();
                for name in store.list_tables()? {
                    let count = row_count(store, &name)?;
                    tables.push((name, count));
                }
                Ok(output::format_table_list(&tables))
            }
            Command::Browse { table } => Ok(runner.browse_table(table)),
        }
    }
}

/// Builds a record from `NAME=VALUE` arguments.
fn parse_record(page: &str, page_id: i64, fields: &[String]) -> Result<Record> {
    let mut record = Record::new(page).with_page_id(page_id);
    for field in fields {
        let Some((name, value)) = field.split_once('=') else {
            bail!("field \"{field}\" must be NAME=VALUE");
        };
        record = record.with_value(name.trim(), value);
    }
    Ok(record)
}

fn row_count(store: &SqliteStore, table: &str) -> Result<u64> {
    let rows = store.query(&format!("SELECT COUNT(*) AS n FROM {}", quote_ident(table)))?;
    Ok(rows
        .first()
        .and_then(|row| row.get("n"))
        .and_then(|n| n.parse().ok())
        .unwrap_or(0))
}
