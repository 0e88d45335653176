use std::path::PathBuf;

use db_infra::DbInfraError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Resource({resource}) not found!")]
    ResourceNotFound { resource: String },
    #[error(transparent)]
    Execution(#[from] DbInfraError),
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Document error: {detail}")]
    Document { detail: String },
    #[error("Configuration error: {detail}")]
    Config { detail: String },
}

impl FixtureError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::ResourceNotFound {
            resource: resource.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn document(detail: impl Into<String>) -> Self {
        Self::Document {
            detail: detail.into(),
        }
    }

    pub fn config(detail: impl Into<String>) -> Self {
        Self::Config {
            detail: detail.into(),
        }
    }

    /// True when the failure came from a data source that was shut down.
    pub fn is_shut_down(&self) -> bool {
        matches!(self, Self::Execution(DbInfraError::ShutDown { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_message_is_not_wrapped_twice() {
        let err = FixtureError::from(DbInfraError::ShutDown {
            data_source: "main".to_string(),
        });
        assert_eq!(err.to_string(), "Data source 'main' has been shut down");
        assert!(err.is_shut_down());
    }

    #[test]
    fn test_resource_not_found_message() {
        assert_eq!(
            FixtureError::not_found("/myapp/orders-codegen.json").to_string(),
            "Resource(/myapp/orders-codegen.json) not found!"
        );
    }
}
