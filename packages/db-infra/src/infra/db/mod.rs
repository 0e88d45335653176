//! Data-source infrastructure - connection ownership, settings and shutdown.

pub mod core;
pub mod file;
pub mod memory;

pub use core::{with_data_source, DataSource, DataSourceManager, ScalarFn};
pub use file::FileDataSourceManager;
pub use memory::TestDataSourceManager;
