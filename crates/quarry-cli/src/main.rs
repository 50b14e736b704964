//! Quarry Command-Line Interface
//!
//! Declares tables, stores records and renders queries against a SQLite
//! database.
//!
//! # Usage
//!
//! ```bash
//! # Declare a table and store a record
//! quarry --db wiki.db declare Books --schema books.json
//! quarry --db wiki.db insert Books "Dune" --page-id 1 -f Year=1965 -f "Genres=SF;Epic"
//!
//! # Render a query block
//! quarry --db wiki.db query "tables=Books;fields=_pageName=Title,Year;format=table"
//!
//! # Raw rows as JSON
//! quarry --db wiki.db rows -o json "tables=Books;where=Year > 1900"
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::Parser;
use quarry_sql::storage::SqliteStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod output;

use commands::Command;
use config::CliConfig;

/// Quarry command-line interface
#[derive(Parser, Debug)]
#[command(
    name = "quarry",
    author = "Quarry Team",
    version,
    about = "Declare, populate and query structured wiki tables",
    long_about = "Declare typed tables, store records extracted from documents, and render\n\
                  query blocks as HTML lists, tables, maps and export links."
)]
struct Args {
    /// SQLite database file
    #[arg(short = 'd', long, env = "QUARRY_DB", value_name = "FILE")]
    db: Option<PathBuf>,

    /// Configuration file path
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short = 'v', long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = load_config(&args)?;
    let Some(path) = &config.database else {
        bail!("no database given; pass --db or set `database` in the config file");
    };
    info!(path = %path.display(), "opening database");
    let store = SqliteStore::open(path)?;

    let output = args.command.execute(&store, &config)?;
    println!("{output}");
    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("quarry_cli=debug,quarry_sql=debug,quarry_format=debug")
    } else {
        EnvFilter::new("quarry_cli=warn,quarry_sql=warn,quarry_format=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Args) -> Result<CliConfig> {
    let mut config = CliConfig::load(args.config.as_deref())?;
    if let Some(db) = &args.db {
        config.database = Some(db.clone());
    }
    Ok(config)
}
