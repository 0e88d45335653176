//! Per-test database fixtures: schema creation, fixture loading and dumping,
//! raw SQL and SQL-callable functions over an isolated SQLite data source.

pub mod config;
pub mod document;
pub mod dumper;
pub mod error;
pub mod functions;
pub mod lifecycle;
pub mod loader;
pub mod maker;
pub mod query_result;
pub mod raw;
pub mod resource;
pub mod schema;

pub use config::FixtureConfig;
pub use document::{FieldValue, FixtureDocument, FixtureRow, FixtureTable};
pub use dumper::{DatabaseDumper, SqliteDatabaseDumper};
pub use error::FixtureError;
pub use functions::{string_functions, FunctionDefiner, FunctionSet, VARIADIC};
pub use lifecycle::{Fixture, FixtureBuilder, FixtureSuite};
pub use loader::{SqliteTableLoader, TableLoader};
pub use maker::{SqliteTableMaker, TableMaker};
pub use query_result::QueryResultBuilder;
pub use raw::{RawDao, RawRow, SqliteRawDao, SHUTDOWN_COMMAND};
pub use resource::{FsResourceLoader, MemoryResourceLoader, ResourceLoader};
pub use schema::SchemaDocument;

#[cfg(test)]
#[ctor::ctor]
fn init_logging() {
    fixture_test_support::logging::init();
}
