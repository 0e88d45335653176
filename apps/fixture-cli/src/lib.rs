//! Command-line front end over the fixture library: create tables, load and
//! dump fixture documents, and run SQL against SQLite files.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};
use dal_fixture::{
    DatabaseDumper, FixtureError, QueryResultBuilder, RawDao, SqliteDatabaseDumper,
    SqliteRawDao, SqliteTableLoader, SqliteTableMaker, TableLoader, TableMaker,
};
use db_infra::config::db::{build_connection_settings, DataSourceConfig, DbKind, RuntimeEnv};
use db_infra::{DataSourceManager, FileDataSourceManager};
use tracing::info;

#[derive(Clone, ValueEnum)]
pub enum Env {
    Prod,
    Test,
}

#[derive(Parser)]
#[command(name = "fixture")]
#[command(about = "Create, seed and dump SQLite fixture databases")]
pub struct Args {
    /// SQLite file for the selected data source (created if missing). Without
    /// it the file comes from FIXTURE_DATA_SOURCES.
    #[arg(short, long)]
    pub db: Option<PathBuf>,

    /// Data source to operate on
    #[arg(short, long, default_value = "main")]
    pub source: String,

    /// Runtime environment
    #[arg(short, long, value_enum, default_value = "test")]
    pub env: Env,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the tables of a schema document
    Make { schema: PathBuf },
    /// Insert the rows of a fixture document
    Load { fixture: PathBuf },
    /// Write the named tables as a fixture document (stdout without --out)
    Dump {
        #[arg(short, long)]
        out: Option<PathBuf>,
        #[arg(required = true)]
        tables: Vec<String>,
    },
    /// Run a query and print the result table
    Query { sql: String },
    /// Run a statement and print the affected row count
    Exec { sql: String },
}

/// Data sources from `FIXTURE_DATA_SOURCES`, with `--db` taking precedence for
/// the selected source.
pub fn data_sources(args: &Args) -> Result<DataSourceConfig, FixtureError> {
    let config = DataSourceConfig::from_env()?;
    Ok(match &args.db {
        Some(path) => config.with(args.source.as_str(), path),
        None => config,
    })
}

pub fn run(args: Args) -> Result<(), FixtureError> {
    let env = match args.env {
        Env::Prod => RuntimeEnv::Prod,
        Env::Test => RuntimeEnv::Test,
    };
    let sources = data_sources(&args)?;
    let path = sources.path_for(&args.source).ok_or_else(|| {
        FixtureError::config(format!(
            "no database for data source '{}': pass --db or set FIXTURE_DATA_SOURCES",
            args.source
        ))
    })?;
    info!(data_source = %args.source, db = %path.display(), "using database");

    let settings = build_connection_settings(env, DbKind::SqliteFile)?;
    let manager: Arc<dyn DataSourceManager> =
        Arc::new(FileDataSourceManager::new(sources, settings));
    let source = args.source.as_str();

    match args.command {
        Command::Make { schema } => {
            let tables = SqliteTableMaker::new(manager).make(source, &read(&schema)?)?;
            println!("created {}", tables.join(", "));
        }
        Command::Load { fixture } => {
            let rows = SqliteTableLoader::new(manager).load(source, &read(&fixture)?)?;
            println!("{rows} rows loaded");
        }
        Command::Dump { out, tables } => {
            let names: Vec<&str> = tables.iter().map(String::as_str).collect();
            let text = SqliteDatabaseDumper::new(manager)
                .dump(source, &names)?
                .render()?;
            match out {
                Some(path) => {
                    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                        fs::create_dir_all(parent).map_err(|e| FixtureError::io(parent, e))?;
                    }
                    fs::write(&path, text).map_err(|e| FixtureError::io(&path, e))?;
                    println!("wrote {}", path.display());
                }
                None => print!("{text}"),
            }
        }
        Command::Query { sql } => {
            let start = Instant::now();
            let rows = SqliteRawDao::new(manager).execute_query(source, &sql)?;
            print!("{}", QueryResultBuilder::new().build(&rows));
            println!(
                "{} rows in set ({:.3} sec)",
                rows.len(),
                start.elapsed().as_secs_f64()
            );
        }
        Command::Exec { sql } => {
            let affected = SqliteRawDao::new(manager).execute_update(source, &sql)?;
            println!("{affected} rows affected");
        }
    }

    Ok(())
}

fn read(path: &Path) -> Result<String, FixtureError> {
    fs::read_to_string(path).map_err(|e| FixtureError::io(path, e))
}
