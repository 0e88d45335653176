//! Per-test fixture lifecycle.
//!
//! A [`FixtureBuilder`] collects configuration and collaborators; `set_up`
//! turns it into a ready [`Fixture`] bound to one data source. `tear_down`
//! consumes the fixture and shuts that data source down.
//!
//! ```no_run
//! use dal_fixture::{FixtureBuilder, FixtureConfig};
//!
//! # fn main() -> Result<(), dal_fixture::FixtureError> {
//! let fixture = FixtureBuilder::new("main", "myapp")
//!     .with_config(FixtureConfig::default())
//!     .set_up()?;
//! fixture.create_tables("orders")?;
//! fixture.execute_update("INSERT INTO orders VALUES (1, 'a')")?;
//! fixture.tear_down()?;
//! # Ok(())
//! # }
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use db_infra::{DataSourceManager, TestDataSourceManager};
use tracing::{debug, info, warn};

use crate::config::FixtureConfig;
use crate::dumper::{DatabaseDumper, SqliteDatabaseDumper};
use crate::error::FixtureError;
use crate::functions::{string_functions, FunctionDefiner, FunctionSet};
use crate::loader::{SqliteTableLoader, TableLoader};
use crate::maker::{SqliteTableMaker, TableMaker};
use crate::query_result::QueryResultBuilder;
use crate::raw::{RawDao, RawRow, SqliteRawDao, SHUTDOWN_COMMAND};
use crate::resource::{FsResourceLoader, ResourceLoader};

/// Maps `(namespace, schema_name)` to a schema resource path.
pub type SchemaPathPolicy = Box<dyn Fn(&str, &str) -> String + Send + Sync>;

/// A group of tests sharing one default data source and namespace.
pub trait FixtureSuite {
    const DEFAULT_DATA_SOURCE: &'static str;
    const NAMESPACE: &'static str;

    /// Hook to adjust the builder before `set_up`.
    fn configure(builder: FixtureBuilder) -> FixtureBuilder {
        builder
    }
}

/// Unconfigured fixture. Every collaborator left unset gets the SQLite default
/// at `set_up`.
pub struct FixtureBuilder {
    data_source: String,
    namespace: String,
    config: Option<FixtureConfig>,
    manager: Option<Arc<dyn DataSourceManager>>,
    raw_dao: Option<Box<dyn RawDao>>,
    table_maker: Option<Box<dyn TableMaker>>,
    table_loader: Option<Box<dyn TableLoader>>,
    dumper: Option<Box<dyn DatabaseDumper>>,
    resources: Option<Box<dyn ResourceLoader>>,
    schema_path: Option<SchemaPathPolicy>,
    default_functions: bool,
}

impl FixtureBuilder {
    pub fn new(data_source: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            data_source: data_source.into(),
            namespace: namespace.into(),
            config: None,
            manager: None,
            raw_dao: None,
            table_maker: None,
            table_loader: None,
            dumper: None,
            resources: None,
            schema_path: None,
            default_functions: true,
        }
    }

    pub fn for_suite<S: FixtureSuite>() -> Self {
        S::configure(Self::new(S::DEFAULT_DATA_SOURCE, S::NAMESPACE))
    }

    /// Explicit configuration. Without one, `set_up` reads it from the environment.
    pub fn with_config(mut self, config: FixtureConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_manager(mut self, manager: Arc<dyn DataSourceManager>) -> Self {
        self.manager = Some(manager);
        self
    }

    pub fn with_raw_dao(mut self, raw_dao: impl RawDao + 'static) -> Self {
        self.raw_dao = Some(Box::new(raw_dao));
        self
    }

    pub fn with_table_maker(mut self, maker: impl TableMaker + 'static) -> Self {
        self.table_maker = Some(Box::new(maker));
        self
    }

    pub fn with_table_loader(mut self, loader: impl TableLoader + 'static) -> Self {
        self.table_loader = Some(Box::new(loader));
        self
    }

    pub fn with_dumper(mut self, dumper: impl DatabaseDumper + 'static) -> Self {
        self.dumper = Some(Box::new(dumper));
        self
    }

    pub fn with_resources(mut self, resources: impl ResourceLoader + 'static) -> Self {
        self.resources = Some(Box::new(resources));
        self
    }

    /// Replace the `/<namespace>/<schema>-codegen.json` convention.
    pub fn with_schema_path<F>(mut self, policy: F) -> Self
    where
        F: Fn(&str, &str) -> String + Send + Sync + 'static,
    {
        self.schema_path = Some(Box::new(policy));
        self
    }

    /// Skip registering the default string functions.
    pub fn without_default_functions(mut self) -> Self {
        self.default_functions = false;
        self
    }

    pub fn set_up(self) -> Result<Fixture, FixtureError> {
        let config = match self.config {
            Some(config) => config,
            None => FixtureConfig::from_env()?,
        };

        let manager: Arc<dyn DataSourceManager> = match self.manager {
            Some(manager) => manager,
            None => Arc::new(TestDataSourceManager::new(config.connection_settings()?)),
        };

        let raw_dao = self
            .raw_dao
            .unwrap_or_else(|| Box::new(SqliteRawDao::new(manager.clone())));
        let table_maker = self
            .table_maker
            .unwrap_or_else(|| Box::new(SqliteTableMaker::new(manager.clone())));
        let table_loader = self
            .table_loader
            .unwrap_or_else(|| Box::new(SqliteTableLoader::new(manager.clone())));
        let dumper = self
            .dumper
            .unwrap_or_else(|| Box::new(SqliteDatabaseDumper::new(manager.clone())));
        let resources = self
            .resources
            .unwrap_or_else(|| Box::new(FsResourceLoader::new(config.resource_root())));
        let schema_path = self
            .schema_path
            .unwrap_or_else(|| Box::new(FixtureConfig::schema_resource));

        let fixture = Fixture {
            data_source: self.data_source,
            namespace: self.namespace,
            definer: FunctionDefiner::new(manager.clone()),
            config,
            manager,
            raw_dao,
            table_maker,
            table_loader,
            dumper,
            resources,
            schema_path,
            torn_down: false,
        };

        info!(
            data_source = %fixture.data_source,
            namespace = %fixture.namespace,
            dev_mode = fixture.config.dev_mode,
            "fixture set up"
        );

        if self.default_functions {
            fixture.define_functions(&string_functions())?;
        }

        Ok(fixture)
    }
}

/// A ready fixture bound to its default data source.
pub struct Fixture {
    data_source: String,
    namespace: String,
    config: FixtureConfig,
    manager: Arc<dyn DataSourceManager>,
    raw_dao: Box<dyn RawDao>,
    table_maker: Box<dyn TableMaker>,
    table_loader: Box<dyn TableLoader>,
    dumper: Box<dyn DatabaseDumper>,
    definer: FunctionDefiner,
    resources: Box<dyn ResourceLoader>,
    schema_path: SchemaPathPolicy,
    torn_down: bool,
}

impl Fixture {
    pub fn data_source(&self) -> &str {
        &self.data_source
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn config(&self) -> &FixtureConfig {
        &self.config
    }

    pub fn manager(&self) -> &Arc<dyn DataSourceManager> {
        &self.manager
    }

    /// Create the tables of the schema named `schema_name` in this fixture's
    /// namespace. Returns the declared table names.
    pub fn create_tables(&self, schema_name: &str) -> Result<Vec<String>, FixtureError> {
        let resource = (self.schema_path)(&self.namespace, schema_name);
        let schema = self
            .resources
            .load(&resource)?
            .ok_or_else(|| FixtureError::not_found(&resource))?;

        self.table_maker.make(&self.data_source, &schema)
    }

    /// Register the value-returning entries of `set` as SQL aliases.
    pub fn define_functions(&self, set: &FunctionSet) -> Result<Vec<String>, FixtureError> {
        self.definer.define(&self.data_source, set)
    }

    /// Dump `tables` to `target` and return the written file.
    ///
    /// Nothing is written when `tables` is empty.
    pub fn dump_to(&self, target: &str, tables: &[&str]) -> Result<Option<PathBuf>, FixtureError> {
        if tables.is_empty() {
            debug!(dump_target = target, "no tables to dump");
            return Ok(None);
        }

        let path = self.config.dump_path(&self.namespace, target);
        let document = self.dumper.dump(&self.data_source, tables)?;
        let text = document.render()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| FixtureError::io(parent, e))?;
        }
        fs::write(&path, text).map_err(|e| FixtureError::io(&path, e))?;

        info!(
            data_source = %self.data_source,
            file = %path.display(),
            tables = tables.len(),
            rows = document.row_count(),
            "fixture written"
        );
        Ok(Some(path))
    }

    pub fn execute_query(&self, sql: &str) -> Result<Vec<RawRow>, FixtureError> {
        self.raw_dao.execute_query(&self.data_source, sql)
    }

    pub fn execute_update(&self, sql: &str) -> Result<usize, FixtureError> {
        self.raw_dao.execute_update(&self.data_source, sql)
    }

    /// Load the fixture document at `resource`. Returns the inserted row count.
    pub fn load_from(&self, resource: &str) -> Result<usize, FixtureError> {
        let fixture = self
            .resources
            .load(resource)?
            .ok_or_else(|| FixtureError::not_found(resource))?;

        self.table_loader.load(&self.data_source, &fixture)
    }

    /// Print the query result and its timing to stdout.
    pub fn show_query(&self, sql: &str) -> Result<(), FixtureError> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.show_query_to(&mut out, sql)
    }

    pub fn show_query_to<W: Write>(&self, out: &mut W, sql: &str) -> Result<(), FixtureError> {
        let start = Instant::now();
        let rows = self.execute_query(sql)?;
        let elapsed = start.elapsed();

        let table = QueryResultBuilder::new().build(&rows);
        write!(
            out,
            "{table}{} rows in set ({:.3} sec)\n\n",
            rows.len(),
            elapsed.as_secs_f64()
        )
        .map_err(|e| FixtureError::io("<query output>", e))
    }

    /// Shut the data source down. The fixture is unusable afterwards.
    pub fn tear_down(mut self) -> Result<(), FixtureError> {
        self.torn_down = true;
        self.execute_update(SHUTDOWN_COMMAND)?;
        info!(data_source = %self.data_source, "fixture torn down");
        Ok(())
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        if self.torn_down {
            return;
        }
        warn!(data_source = %self.data_source, "fixture dropped without tear_down, shutting down");
        if let Err(e) = self.raw_dao.execute_update(&self.data_source, SHUTDOWN_COMMAND) {
            warn!(data_source = %self.data_source, error = %e, "shutdown on drop failed");
        }
    }
}
