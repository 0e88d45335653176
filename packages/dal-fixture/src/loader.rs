use std::sync::Arc;

use db_infra::{with_data_source, DataSourceManager, DbInfraError};
use rusqlite::params_from_iter;
use rusqlite::types::Value;
use tracing::{debug, info};

use crate::document::{FixtureDocument, FixtureRow};
use crate::error::FixtureError;
use crate::raw::quote_ident;

/// Inserts the rows of a fixture document into existing tables.
pub trait TableLoader: Send + Sync {
    /// Returns the number of inserted rows.
    fn load(&self, data_source: &str, fixture: &str) -> Result<usize, FixtureError>;
}

pub struct SqliteTableLoader {
    manager: Arc<dyn DataSourceManager>,
}

impl SqliteTableLoader {
    pub fn new(manager: Arc<dyn DataSourceManager>) -> Self {
        Self { manager }
    }
}

impl TableLoader for SqliteTableLoader {
    fn load(&self, data_source: &str, fixture: &str) -> Result<usize, FixtureError> {
        let doc = FixtureDocument::parse(fixture)?;

        let inserted = with_data_source(self.manager.as_ref(), data_source, |source| {
            let fail = |e: rusqlite::Error| DbInfraError::execution(data_source, e);
            let tx = source.connection_mut().transaction().map_err(fail)?;
            let mut inserted = 0;

            for table in &doc.tables {
                for row in &table.rows {
                    let sql = insert_sql(&table.name, row);
                    let values: Vec<Value> = row.iter().map(|(_, value)| value.into()).collect();
                    let mut stmt = tx.prepare_cached(&sql).map_err(fail)?;
                    inserted += stmt.execute(params_from_iter(values.iter())).map_err(fail)?;
                }
                debug!(data_source, table = %table.name, rows = table.rows.len(), "table loaded");
            }

            tx.commit().map_err(fail)?;
            Ok(inserted)
        })?;

        info!(data_source, tables = doc.tables.len(), rows = inserted, "fixture loaded");
        Ok(inserted)
    }
}

/// Parameterized insert for `row`; a row without columns takes every default.
fn insert_sql(table: &str, row: &FixtureRow) -> String {
    if row.is_empty() {
        return format!("INSERT INTO {} DEFAULT VALUES", quote_ident(table));
    }
    let columns = row.columns().map(quote_ident).collect::<Vec<_>>().join(", ");
    let params = (1..=row.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("INSERT INTO {} ({columns}) VALUES ({params})", quote_ident(table))
}
