//! Shared data-source configuration and connection infrastructure.
//! Used by the fixture library and the fixture CLI.

pub mod config;
pub mod error;
pub mod infra;

pub use config::db;
pub use error::DbInfraError;
pub use infra::db::core::{with_data_source, DataSource, DataSourceManager, ScalarFn};
pub use infra::db::file::FileDataSourceManager;
pub use infra::db::memory::TestDataSourceManager;
