//! Resource lookup for schema and fixture documents.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::debug;

use crate::error::FixtureError;

/// Resolves resource paths such as `/myapp/orders-codegen.json` to their text.
///
/// `Ok(None)` means the resource does not exist.
pub trait ResourceLoader: Send + Sync {
    fn load(&self, path: &str) -> Result<Option<String>, FixtureError>;
}

/// Loads resources from files under a root directory. A leading `/` on the
/// resource path is relative to the root, never the filesystem root.
#[derive(Debug, Clone)]
pub struct FsResourceLoader {
    root: PathBuf,
}

impl FsResourceLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

impl ResourceLoader for FsResourceLoader {
    fn load(&self, path: &str) -> Result<Option<String>, FixtureError> {
        let file = self.resolve(path);
        match fs::read_to_string(&file) {
            Ok(text) => {
                debug!(resource = path, file = %file.display(), "resource loaded");
                Ok(Some(text))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(FixtureError::io(file, e)),
        }
    }
}

/// In-memory resources keyed by path, for tests and embedded fixtures.
#[derive(Debug, Clone, Default)]
pub struct MemoryResourceLoader {
    resources: HashMap<String, String>,
}

impl MemoryResourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, text: impl Into<String>) -> Self {
        self.resources.insert(normalize(path), text.into());
        self
    }
}

impl ResourceLoader for MemoryResourceLoader {
    fn load(&self, path: &str) -> Result<Option<String>, FixtureError> {
        Ok(self.resources.get(&normalize(path)).cloned())
    }
}

fn normalize(path: &str) -> String {
    path.trim_start_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fs_loader_resolves_under_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("myapp")).unwrap();
        fs::write(dir.path().join("myapp/orders-codegen.json"), "{}").unwrap();

        let loader = FsResourceLoader::new(dir.path());
        assert_eq!(loader.load("/myapp/orders-codegen.json").unwrap().as_deref(), Some("{}"));
        assert_eq!(loader.load("myapp/orders-codegen.json").unwrap().as_deref(), Some("{}"));
        assert!(loader.load("/myapp/missing.json").unwrap().is_none());
    }

    #[test]
    fn test_fs_loader_reports_unreadable_paths() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a-directory")).unwrap();

        let err = FsResourceLoader::new(dir.path()).load("/a-directory").unwrap_err();
        assert!(matches!(err, FixtureError::Io { .. }));
    }

    #[test]
    fn test_memory_loader_ignores_leading_slash() {
        let loader = MemoryResourceLoader::new().with("/x/data.json", "[]");
        assert_eq!(loader.load("x/data.json").unwrap().as_deref(), Some("[]"));
        assert!(loader.load("/y").unwrap().is_none());
    }
}
