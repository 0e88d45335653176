use std::sync::Arc;

use db_infra::{with_data_source, DataSourceManager, DbInfraError};
use tracing::info;

use crate::error::FixtureError;
use crate::schema::SchemaDocument;

/// Creates tables described by a schema-definition document.
pub trait TableMaker: Send + Sync {
    /// Returns the names of the tables the document declares.
    fn make(&self, data_source: &str, schema: &str) -> Result<Vec<String>, FixtureError>;
}

pub struct SqliteTableMaker {
    manager: Arc<dyn DataSourceManager>,
}

impl SqliteTableMaker {
    pub fn new(manager: Arc<dyn DataSourceManager>) -> Self {
        Self { manager }
    }
}

impl TableMaker for SqliteTableMaker {
    fn make(&self, data_source: &str, schema: &str) -> Result<Vec<String>, FixtureError> {
        let doc = SchemaDocument::parse(schema)?;
        let statements = doc.to_statements();

        with_data_source(self.manager.as_ref(), data_source, |source| {
            let tx = source
                .connection_mut()
                .transaction()
                .map_err(|e| DbInfraError::execution(data_source, e))?;
            for sql in &statements {
                tx.execute_batch(sql)
                    .map_err(|e| DbInfraError::execution(data_source, e))?;
            }
            tx.commit()
                .map_err(|e| DbInfraError::execution(data_source, e))
        })?;

        let tables: Vec<String> = doc.table_names().map(String::from).collect();
        info!(data_source, tables = ?tables, statements = statements.len(), "tables created");
        Ok(tables)
    }
}
