use std::fs;

use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use crate::config::db::{ConnectionSettings, DataSourceConfig};
use crate::error::DbInfraError;
use crate::infra::db::core::{prepare_connection, DataSource, DataSourceManager, SlotTable};

/// File-backed data-source manager: each configured name maps to a SQLite file.
pub struct FileDataSourceManager {
    config: DataSourceConfig,
    settings: ConnectionSettings,
    slots: SlotTable,
}

impl FileDataSourceManager {
    pub fn new(config: DataSourceConfig, settings: ConnectionSettings) -> Self {
        Self {
            config,
            settings,
            slots: SlotTable::default(),
        }
    }

    fn open(&self, name: &str) -> Result<Connection, DbInfraError> {
        let path = self.config.path_for(name).ok_or_else(|| {
            DbInfraError::config(format!("no file configured for data source '{name}'"))
        })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                DbInfraError::config(format!(
                    "failed to create directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        debug!(data_source = name, path = %path.display(), "opening sqlite file");
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| DbInfraError::execution(name, e))?;

        prepare_connection(name, conn, &self.settings)
    }
}

impl DataSourceManager for FileDataSourceManager {
    fn with_data_source(
        &self,
        name: &str,
        f: &mut dyn FnMut(&mut DataSource) -> Result<(), DbInfraError>,
    ) -> Result<(), DbInfraError> {
        self.slots.with(name, || self.open(name), f)
    }

    fn shutdown(&self, name: &str) -> Result<(), DbInfraError> {
        self.slots.shutdown(name)
    }

    fn is_shut_down(&self, name: &str) -> bool {
        self.slots.is_shut_down(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::db::core::with_data_source;

    #[test]
    fn test_unknown_data_source_is_config_error() {
        let manager =
            FileDataSourceManager::new(DataSourceConfig::new(), ConnectionSettings::default());
        let err = with_data_source(&manager, "missing", |_| Ok(())).unwrap_err();
        assert!(matches!(err, DbInfraError::Config { .. }));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_data_survives_reopen_through_new_manager() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("main.db");
        let config = DataSourceConfig::new().with("main", &path);

        let first = FileDataSourceManager::new(config.clone(), ConnectionSettings::default());
        with_data_source(&first, "main", |source| {
            source
                .connection()
                .execute_batch("CREATE TABLE t (id INTEGER); INSERT INTO t VALUES (7);")
                .map_err(|e| source.fail(e))
        })
        .unwrap();
        first.shutdown("main").unwrap();
        assert!(path.exists());

        let second = FileDataSourceManager::new(config, ConnectionSettings::default());
        let id: i64 = with_data_source(&second, "main", |source| {
            source
                .connection()
                .query_row("SELECT id FROM t", [], |row| row.get(0))
                .map_err(|e| source.fail(e))
        })
        .unwrap();
        assert_eq!(id, 7);
    }
}
