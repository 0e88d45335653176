#![allow(dead_code)]

// tests/common/mod.rs
use std::fs;
use std::path::Path;

use dal_fixture::{Fixture, FixtureBuilder, FixtureConfig};
use tempfile::TempDir;

#[ctor::ctor]
fn init_logging() {
    fixture_test_support::logging::init();
}

pub const ORDERS_SCHEMA: &str = r#"{
  "entities": [
    {
      "table": "ORDERS",
      "columns": [
        {"name": "id", "type": "int"},
        {"name": "name", "type": "varchar"}
      ]
    }
  ]
}"#;

/// Temporary resource root plus dump base for one test.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn resources(&self) -> std::path::PathBuf {
        self.dir.path().join("resources")
    }

    pub fn dumps(&self) -> std::path::PathBuf {
        self.dir.path().join("dumps")
    }

    /// Write `text` at `path` relative to the resource root.
    pub fn put(&self, path: &str, text: &str) {
        let file = self.resources().join(path.trim_start_matches('/'));
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).expect("create resource dir");
        }
        fs::write(file, text).expect("write resource");
    }

    pub fn config(&self) -> FixtureConfig {
        FixtureConfig::default()
            .with_resource_root(self.resources())
            .with_dump_base(self.dumps())
    }

    /// Fixture in namespace `namespace` over data source `main`.
    pub fn fixture(&self, namespace: &str) -> Fixture {
        FixtureBuilder::new("main", namespace)
            .with_config(self.config())
            .set_up()
            .expect("fixture set up")
    }
}

pub fn read(path: &Path) -> String {
    fs::read_to_string(path).expect("read file")
}
