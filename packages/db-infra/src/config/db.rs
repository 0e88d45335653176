use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use crate::error::DbInfraError;

/// Storage backing a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbKind {
    /// Fresh in-memory SQLite database, gone once the connection closes
    SqliteMemory,
    /// SQLite database file on disk
    SqliteFile,
}

/// Runtime environment the connections are opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEnv {
    Prod,
    Test,
}

/// Per-connection settings applied right after a connection is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Log every statement at trace level (dev mode)
    pub trace_sql: bool,
    pub foreign_keys: bool,
    pub busy_timeout_ms: u64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            trace_sql: false,
            foreign_keys: true,
            busy_timeout_ms: 2000,
        }
    }
}

/// Build connection settings for the given environment and storage kind.
///
/// `FIXTURE_SQL_TRACE` forces statement tracing on or off; otherwise tracing is
/// enabled only for in-memory test databases.
pub fn build_connection_settings(
    env: RuntimeEnv,
    db_kind: DbKind,
) -> Result<ConnectionSettings, DbInfraError> {
    let default_trace = matches!(
        (env, db_kind),
        (RuntimeEnv::Test, DbKind::SqliteMemory)
    );

    let trace_sql = match env::var("FIXTURE_SQL_TRACE") {
        Ok(raw) => parse_flag("FIXTURE_SQL_TRACE", &raw)?,
        Err(_) => default_trace,
    };

    let busy_timeout_ms = match env::var("FIXTURE_BUSY_TIMEOUT_MS") {
        Ok(raw) => raw.parse::<u64>().map_err(|_| {
            DbInfraError::config(format!(
                "FIXTURE_BUSY_TIMEOUT_MS must be a number of milliseconds, got '{raw}'"
            ))
        })?,
        Err(_) => match db_kind {
            DbKind::SqliteMemory => 0,
            DbKind::SqliteFile => 2000,
        },
    };

    Ok(ConnectionSettings {
        trace_sql,
        foreign_keys: true,
        busy_timeout_ms,
    })
}

/// Parse a boolean flag value the way all `FIXTURE_*` flags are parsed.
pub fn parse_flag(name: &str, raw: &str) -> Result<bool, DbInfraError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(DbInfraError::config(format!(
            "{name} must be a boolean (true/false/1/0), got '{other}'"
        ))),
    }
}

/// Mapping of data-source names to SQLite files for file-backed managers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataSourceConfig {
    entries: BTreeMap<String, PathBuf>,
}

impl DataSourceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a data source backed by the file at `path`.
    pub fn with(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.entries.insert(name.into(), path.into());
        self
    }

    /// Read `FIXTURE_DATA_SOURCES` as a comma separated list of `name=path` pairs.
    pub fn from_env() -> Result<Self, DbInfraError> {
        match env::var("FIXTURE_DATA_SOURCES") {
            Ok(raw) => Self::parse(&raw),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn parse(raw: &str) -> Result<Self, DbInfraError> {
        let mut config = Self::default();
        for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let Some((name, path)) = pair.split_once('=') else {
                return Err(DbInfraError::config(format!(
                    "data source entry '{pair}' must look like name=path"
                )));
            };
            let name = name.trim();
            let path = path.trim();
            if name.is_empty() || path.is_empty() {
                return Err(DbInfraError::config(format!(
                    "data source entry '{pair}' has an empty name or path"
                )));
            }
            config.entries.insert(name.to_string(), PathBuf::from(path));
        }
        Ok(config)
    }

    pub fn path_for(&self, name: &str) -> Option<&Path> {
        self.entries.get(name).map(PathBuf::as_path)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
