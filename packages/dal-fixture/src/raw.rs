//! Raw SQL execution without any mapping: rows come back as loosely-typed
//! column/value records.

use std::sync::Arc;

use db_infra::{with_data_source, DataSourceManager};
use rusqlite::types::Value;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::FixtureError;

/// Literal statement that terminates a data source.
pub const SHUTDOWN_COMMAND: &str = "SHUTDOWN";

/// One row returned by a raw query, columns in select order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawRow {
    columns: Vec<(String, Value)>,
}

impl RawRow {
    pub fn new(columns: Vec<(String, Value)>) -> Self {
        Self { columns }
    }

    /// Column lookup, ASCII case-insensitive like SQL identifiers.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, value)| value)
    }

    pub fn get_i64(&self, column: &str) -> Option<i64> {
        match self.get(column)? {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn get_str(&self, column: &str) -> Option<&str> {
        match self.get(column)? {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.columns.iter().map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl IntoIterator for RawRow {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.into_iter()
    }
}

/// Raw statement/query executor against a named data source.
pub trait RawDao: Send + Sync {
    fn execute_query(&self, data_source: &str, sql: &str) -> Result<Vec<RawRow>, FixtureError>;

    /// Run a statement and return the number of affected rows. `SHUTDOWN`
    /// terminates the data source.
    fn execute_update(&self, data_source: &str, sql: &str) -> Result<usize, FixtureError>;
}

pub struct SqliteRawDao {
    manager: Arc<dyn DataSourceManager>,
}

impl SqliteRawDao {
    pub fn new(manager: Arc<dyn DataSourceManager>) -> Self {
        Self { manager }
    }
}

impl RawDao for SqliteRawDao {
    fn execute_query(&self, data_source: &str, sql: &str) -> Result<Vec<RawRow>, FixtureError> {
        let rows = with_data_source(self.manager.as_ref(), data_source, |source| {
            query_rows(source.connection(), sql).map_err(|e| source.fail(e))
        })?;
        debug!(data_source, rows = rows.len(), "raw query");
        Ok(rows)
    }

    fn execute_update(&self, data_source: &str, sql: &str) -> Result<usize, FixtureError> {
        if is_shutdown_command(sql) {
            info!(data_source, "shutdown requested");
            self.manager.shutdown(data_source)?;
            return Ok(0);
        }

        let affected = with_data_source(self.manager.as_ref(), data_source, |source| {
            source
                .connection()
                .execute(sql, [])
                .map_err(|e| source.fail(e))
        })?;
        debug!(data_source, affected, "raw update");
        Ok(affected)
    }
}

/// Run `sql` and collect every row with its column names.
pub(crate) fn query_rows(conn: &Connection, sql: &str) -> rusqlite::Result<Vec<RawRow>> {
    let mut stmt = conn.prepare(sql)?;
    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut columns = Vec::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            columns.push((name.clone(), row.get::<_, Value>(idx)?));
        }
        out.push(RawRow::new(columns));
    }
    Ok(out)
}

/// Double-quote an identifier for SQLite.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn is_shutdown_command(sql: &str) -> bool {
    sql.trim()
        .trim_end_matches(';')
        .trim_end()
        .eq_ignore_ascii_case(SHUTDOWN_COMMAND)
}
