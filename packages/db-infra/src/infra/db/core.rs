use std::collections::{BTreeSet, HashMap};
use std::panic::RefUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Value;
use rusqlite::Connection;
use tracing::{debug, info, trace};
use ulid::Ulid;

use crate::config::db::ConnectionSettings;
use crate::error::DbInfraError;

/// Body of a SQL-callable scalar function.
pub type ScalarFn = Arc<dyn Fn(&[Value]) -> rusqlite::Result<Value> + Send + Sync + RefUnwindSafe>;

/// An open, named database connection together with the aliases defined on it.
pub struct DataSource {
    name: String,
    id: String,
    conn: Connection,
    aliases: BTreeSet<String>,
}

impl DataSource {
    pub(crate) fn new(name: &str, conn: Connection) -> Self {
        Self {
            name: name.to_string(),
            id: format!("{}-{}", name, Ulid::new()),
            conn,
            aliases: BTreeSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unique id of this particular connection, for log correlation.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Wrap a driver error with this data source's name.
    pub fn fail(&self, source: rusqlite::Error) -> DbInfraError {
        DbInfraError::execution(&self.name, source)
    }

    pub fn has_alias(&self, alias: &str) -> bool {
        self.aliases.contains(alias)
    }

    /// Bind `alias` to `body` as a scalar SQL function unless it already exists.
    /// The function is evaluated on every call, never folded per statement.
    ///
    /// Returns `false` when the alias was already defined on this data source.
    pub fn define_alias(
        &mut self,
        alias: &str,
        arity: i32,
        body: ScalarFn,
    ) -> Result<bool, DbInfraError> {
        if self.aliases.contains(alias) {
            debug!(data_source = %self.id, alias, "alias exists, skipping");
            return Ok(false);
        }

        self.conn
            .create_scalar_function(
                alias,
                arity,
                FunctionFlags::SQLITE_UTF8,
                move |ctx| {
                    let args = (0..ctx.len())
                        .map(|i| ctx.get::<Value>(i))
                        .collect::<rusqlite::Result<Vec<_>>>()?;
                    body(&args)
                },
            )
            .map_err(|e| DbInfraError::execution(&self.name, e))?;

        self.aliases.insert(alias.to_string());
        debug!(data_source = %self.id, alias, arity, "alias defined");
        Ok(true)
    }

}

/// Provider of named data sources.
///
/// Implementations own the connections; callers borrow a data source for the
/// duration of a closure. After [`DataSourceManager::shutdown`] a data source is
/// terminal and every further access fails with [`DbInfraError::ShutDown`].
pub trait DataSourceManager: Send + Sync {
    fn with_data_source(
        &self,
        name: &str,
        f: &mut dyn FnMut(&mut DataSource) -> Result<(), DbInfraError>,
    ) -> Result<(), DbInfraError>;

    /// Close the connection and mark the data source terminal. Idempotent.
    fn shutdown(&self, name: &str) -> Result<(), DbInfraError>;

    fn is_shut_down(&self, name: &str) -> bool;
}

/// Run `f` against the named data source and hand back its result.
pub fn with_data_source<R, F>(
    manager: &dyn DataSourceManager,
    name: &str,
    f: F,
) -> Result<R, DbInfraError>
where
    F: FnOnce(&mut DataSource) -> Result<R, DbInfraError>,
{
    let mut f = Some(f);
    let mut out = None;

    manager.with_data_source(name, &mut |source| {
        if let Some(f) = f.take() {
            out = Some(f(source)?);
        }
        Ok(())
    })?;

    out.ok_or_else(|| {
        DbInfraError::config(format!(
            "data source manager did not run the callback for '{name}'"
        ))
    })
}

enum Slot {
    Open(DataSource),
    ShutDown,
}

/// Connection table shared by the manager implementations.
#[derive(Default)]
pub(crate) struct SlotTable {
    slots: Mutex<HashMap<String, Slot>>,
}

impl SlotTable {
    pub(crate) fn with<O>(
        &self,
        name: &str,
        open: O,
        f: &mut dyn FnMut(&mut DataSource) -> Result<(), DbInfraError>,
    ) -> Result<(), DbInfraError>
    where
        O: FnOnce() -> Result<Connection, DbInfraError>,
    {
        let mut slots = self.slots.lock();

        if !slots.contains_key(name) {
            let source = DataSource::new(name, open()?);
            info!(data_source = %source.id(), "data source opened");
            slots.insert(name.to_string(), Slot::Open(source));
        }

        match slots.get_mut(name) {
            Some(Slot::Open(source)) => f(source),
            Some(Slot::ShutDown) | None => Err(DbInfraError::ShutDown {
                data_source: name.to_string(),
            }),
        }
    }

    pub(crate) fn shutdown(&self, name: &str) -> Result<(), DbInfraError> {
        let previous = self.slots.lock().insert(name.to_string(), Slot::ShutDown);

        match previous {
            Some(Slot::Open(source)) => {
                let id = source.id().to_string();
                source
                    .conn
                    .close()
                    .map_err(|(_, e)| DbInfraError::execution(name, e))?;
                info!(data_source = %id, "data source shut down");
            }
            Some(Slot::ShutDown) => {
                debug!(data_source = name, "data source already shut down");
            }
            None => {
                debug!(data_source = name, "data source shut down before first use");
            }
        }
        Ok(())
    }

    pub(crate) fn is_shut_down(&self, name: &str) -> bool {
        matches!(self.slots.lock().get(name), Some(Slot::ShutDown))
    }
}

/// Apply connection settings to a freshly opened connection.
pub(crate) fn prepare_connection(
    name: &str,
    mut conn: Connection,
    settings: &ConnectionSettings,
) -> Result<Connection, DbInfraError> {
    conn.pragma_update(None, "foreign_keys", settings.foreign_keys)
        .map_err(|e| DbInfraError::execution(name, e))?;

    if settings.busy_timeout_ms > 0 {
        conn.busy_timeout(Duration::from_millis(settings.busy_timeout_ms))
            .map_err(|e| DbInfraError::execution(name, e))?;
    }

    if settings.trace_sql {
        conn.trace(Some(trace_statement));
    }

    Ok(conn)
}

fn trace_statement(sql: &str) {
    trace!(target: "db_infra::sql", sql, "statement");
}
