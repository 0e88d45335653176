use std::env;
use std::path::{Path, PathBuf};

use db_infra::config::db::{
    build_connection_settings, parse_flag, ConnectionSettings, DbKind, RuntimeEnv,
};

use crate::error::FixtureError;

/// Base directory for resources and dumps when nothing else is configured.
pub const DEFAULT_RESOURCE_DIR: &str = "src/test/resources";

/// Suffix of schema-definition resources: `<namespace>/<schema>-codegen.json`.
pub const SCHEMA_SUFFIX: &str = "-codegen.json";

/// Fixture configuration, passed explicitly at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureConfig {
    /// Development mode: enables statement tracing on test connections
    pub dev_mode: bool,
    /// Root that schema and fixture resource paths are resolved against
    pub resource_root: PathBuf,
    /// Root that `dump_to` writes under
    pub dump_base: PathBuf,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            dev_mode: true,
            resource_root: PathBuf::from(DEFAULT_RESOURCE_DIR),
            dump_base: PathBuf::from(DEFAULT_RESOURCE_DIR),
        }
    }
}

impl FixtureConfig {
    /// Defaults overridden by `FIXTURE_DEV_MODE`, `FIXTURE_RESOURCE_ROOT` and
    /// `FIXTURE_DUMP_BASE`.
    pub fn from_env() -> Result<Self, FixtureError> {
        let mut config = Self::default();

        if let Ok(raw) = env::var("FIXTURE_DEV_MODE") {
            config.dev_mode = parse_flag("FIXTURE_DEV_MODE", &raw)
                .map_err(|e| FixtureError::config(e.to_string()))?;
        }
        if let Some(root) = non_empty_var("FIXTURE_RESOURCE_ROOT") {
            config.resource_root = PathBuf::from(root);
        }
        if let Some(base) = non_empty_var("FIXTURE_DUMP_BASE") {
            config.dump_base = PathBuf::from(base);
        }

        Ok(config)
    }

    pub fn with_dev_mode(mut self, dev_mode: bool) -> Self {
        self.dev_mode = dev_mode;
        self
    }

    pub fn with_resource_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.resource_root = root.into();
        self
    }

    pub fn with_dump_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.dump_base = base.into();
        self
    }

    /// Connection settings for the in-memory test data sources.
    pub fn connection_settings(&self) -> Result<ConnectionSettings, FixtureError> {
        let mut settings = build_connection_settings(RuntimeEnv::Test, DbKind::SqliteMemory)
            .map_err(|e| FixtureError::config(e.to_string()))?;
        settings.trace_sql = self.dev_mode;
        Ok(settings)
    }

    /// Resource path of a schema definition by naming convention.
    pub fn schema_resource(namespace: &str, schema_name: &str) -> String {
        let dir = namespace_dir(namespace);
        if dir.is_empty() {
            format!("/{schema_name}{SCHEMA_SUFFIX}")
        } else {
            format!("/{dir}/{schema_name}{SCHEMA_SUFFIX}")
        }
    }

    /// Output file for `dump_to`.
    ///
    /// Targets starting with `/` are anchored at the dump base; anything else is
    /// nested under the namespace directory.
    pub fn dump_path(&self, namespace: &str, target: &str) -> PathBuf {
        match target.strip_prefix('/') {
            Some(anchored) => self.dump_base.join(anchored),
            None => self.dump_base.join(namespace_dir(namespace)).join(target),
        }
    }

    pub fn resource_root(&self) -> &Path {
        &self.resource_root
    }
}

/// Directory form of a namespace: `myapp::orders` and `myapp.orders` both map
/// to `myapp/orders`.
pub fn namespace_dir(namespace: &str) -> String {
    namespace
        .split(|c: char| c == ':' || c == '.' || c == '/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use std::env;

    use serial_test::serial;

    use super::*;

    fn clear_env() {
        env::remove_var("FIXTURE_DEV_MODE");
        env::remove_var("FIXTURE_RESOURCE_ROOT");
        env::remove_var("FIXTURE_DUMP_BASE");
    }

    #[test]
    fn test_namespace_dir_normalizes_separators() {
        assert_eq!(namespace_dir("myapp"), "myapp");
        assert_eq!(namespace_dir("myapp::orders"), "myapp/orders");
        assert_eq!(namespace_dir("org.unidal.test"), "org/unidal/test");
        assert_eq!(namespace_dir("/a//b/"), "a/b");
        assert_eq!(namespace_dir(""), "");
    }

    #[test]
    fn test_schema_resource_convention() {
        assert_eq!(
            FixtureConfig::schema_resource("myapp", "orders"),
            "/myapp/orders-codegen.json"
        );
        assert_eq!(
            FixtureConfig::schema_resource("", "orders"),
            "/orders-codegen.json"
        );
    }

    #[test]
    fn test_dump_path_anchored_and_relative() {
        let config = FixtureConfig::default().with_dump_base("/base");
        assert_eq!(
            config.dump_path("myapp::orders", "/abs/data.json"),
            PathBuf::from("/base/abs/data.json")
        );
        assert_eq!(
            config.dump_path("myapp::orders", "data.json"),
            PathBuf::from("/base/myapp/orders/data.json")
        );
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        let config = FixtureConfig::from_env().unwrap();
        assert_eq!(config, FixtureConfig::default());
        assert!(config.dev_mode);
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        env::set_var("FIXTURE_DEV_MODE", "0");
        env::set_var("FIXTURE_RESOURCE_ROOT", "/tmp/resources");
        env::set_var("FIXTURE_DUMP_BASE", "/tmp/dumps");

        let config = FixtureConfig::from_env().unwrap();
        assert!(!config.dev_mode);
        assert_eq!(config.resource_root, PathBuf::from("/tmp/resources"));
        assert_eq!(config.dump_base, PathBuf::from("/tmp/dumps"));

        env::set_var("FIXTURE_DEV_MODE", "sometimes");
        let err = FixtureConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("FIXTURE_DEV_MODE"));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_dev_mode_drives_statement_tracing() {
        env::remove_var("FIXTURE_SQL_TRACE");
        let on = FixtureConfig::default().with_dev_mode(true);
        let off = FixtureConfig::default().with_dev_mode(false);
        assert!(on.connection_settings().unwrap().trace_sql);
        assert!(!off.connection_settings().unwrap().trace_sql);
    }
}
