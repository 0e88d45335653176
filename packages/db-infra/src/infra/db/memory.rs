use rusqlite::Connection;

use crate::config::db::ConnectionSettings;
use crate::error::DbInfraError;
use crate::infra::db::core::{prepare_connection, DataSource, DataSourceManager, SlotTable};

/// Test data-source manager: every name maps to its own fresh in-memory
/// database, opened on first use and destroyed by `shutdown`.
pub struct TestDataSourceManager {
    settings: ConnectionSettings,
    slots: SlotTable,
}

impl TestDataSourceManager {
    pub fn new(settings: ConnectionSettings) -> Self {
        Self {
            settings,
            slots: SlotTable::default(),
        }
    }
}

impl Default for TestDataSourceManager {
    fn default() -> Self {
        Self::new(ConnectionSettings::default())
    }
}

impl DataSourceManager for TestDataSourceManager {
    fn with_data_source(
        &self,
        name: &str,
        f: &mut dyn FnMut(&mut DataSource) -> Result<(), DbInfraError>,
    ) -> Result<(), DbInfraError> {
        self.slots.with(
            name,
            || {
                let conn =
                    Connection::open_in_memory().map_err(|e| DbInfraError::execution(name, e))?;
                prepare_connection(name, conn, &self.settings)
            },
            f,
        )
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

    fn count_tables(manager: &TestDataSourceManager, name: &str) -> i64 {
        with_data_source(manager, name, |source| {
            source
                .connection()
                .query_row("SELECT count(*) FROM sqlite_master WHERE type = 'table'", [], |row| {
                    row.get(0)
                })
                .map_err(|e| source.fail(e))
        })
        .unwrap()
    }

    #[test]
    fn test_data_sources_are_isolated_by_name() {
        let manager = TestDataSourceManager::default();

        with_data_source(&manager, "a", |source| {
            source
                .connection()
                .execute_batch("CREATE TABLE only_in_a (id INTEGER)")
                .map_err(|e| source.fail(e))
        })
        .unwrap();

        assert_eq!(count_tables(&manager, "a"), 1);
        assert_eq!(count_tables(&manager, "b"), 0);
    }

    #[test]
    fn test_separate_managers_do_not_share_databases() {
        let first = TestDataSourceManager::default();
        let second = TestDataSourceManager::default();

        with_data_source(&first, "main", |source| {
            source
                .connection()
                .execute_batch("CREATE TABLE t (id INTEGER)")
                .map_err(|e| source.fail(e))
        })
        .unwrap();

        assert_eq!(count_tables(&second, "main"), 0);
    }

    #[test]
    fn test_foreign_keys_enabled_by_settings() {
        let manager = TestDataSourceManager::default();
        let enabled: i64 = with_data_source(&manager, "main", |source| {
            source
                .connection()
                .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
                .map_err(|e| source.fail(e))
        })
        .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn test_access_after_shutdown_fails() {
        let manager = TestDataSourceManager::default();
        assert_eq!(count_tables(&manager, "main"), 0);

        manager.shutdown("main").unwrap();
        assert!(manager.is_shut_down("main"));

        let err = with_data_source(&manager, "main", |_| Ok(())).unwrap_err();
        assert_eq!(err.to_string(), "Data source 'main' has been shut down");
    }
}
