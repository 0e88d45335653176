use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbInfraError {
    #[error("Configuration error: {message}")]
    Config { message: String },
    #[error("Execution failed on data source '{data_source}': {source}")]
    Execution {
        data_source: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("Data source '{data_source}' has been shut down")]
    ShutDown { data_source: String },
}

impl DbInfraError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn execution(data_source: impl Into<String>, source: rusqlite::Error) -> Self {
        Self::Execution {
            data_source: data_source.into(),
            source,
        }
    }
}
