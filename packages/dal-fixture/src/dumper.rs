use std::sync::Arc;

use db_infra::{with_data_source, DataSourceManager};
use sea_query::{Alias, Asterisk, Query, SqliteQueryBuilder};
use tracing::info;

use crate::document::{FixtureDocument, FixtureRow, FixtureTable};
use crate::error::FixtureError;
use crate::raw::query_rows;

/// Captures current table contents as a fixture document.
pub trait DatabaseDumper: Send + Sync {
    fn dump(&self, data_source: &str, tables: &[&str]) -> Result<FixtureDocument, FixtureError>;
}

pub struct SqliteDatabaseDumper {
    manager: Arc<dyn DataSourceManager>,
}

impl SqliteDatabaseDumper {
    pub fn new(manager: Arc<dyn DataSourceManager>) -> Self {
        Self { manager }
    }
}

impl DatabaseDumper for SqliteDatabaseDumper {
    fn dump(&self, data_source: &str, tables: &[&str]) -> Result<FixtureDocument, FixtureError> {
        let doc = with_data_source(self.manager.as_ref(), data_source, |source| {
            let mut doc = FixtureDocument::default();
            for &name in tables {
                let sql = Query::select()
                    .column(Asterisk)
                    .from(Alias::new(name))
                    .to_string(SqliteQueryBuilder);
                let rows = query_rows(source.connection(), &sql).map_err(|e| source.fail(e))?;
                doc.tables.push(FixtureTable {
                    name: name.to_string(),
                    rows: rows.into_iter().map(FixtureRow::from).collect(),
                });
            }
            Ok(doc)
        })?;

        info!(data_source, tables = doc.tables.len(), rows = doc.row_count(), "tables dumped");
        Ok(doc)
    }
}
