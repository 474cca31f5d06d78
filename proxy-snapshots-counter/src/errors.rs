use std::path::PathBuf;

use proxy_snapshots::ProxyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CounterError {
    #[error("storage file {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid stored data: {0}")]
    Json(#[from] serde_json::Error),

    /// A value could not be read back as a domain type.
    #[error("invalid {kind}: {message}")]
    Invalid { kind: &'static str, message: String },

    /// A settled `Async` error replayed from a snapshot.
    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Proxy(#[from] ProxyError),
}

impl CounterError {
    pub(crate) fn invalid(kind: &'static str, message: impl Into<String>) -> Self {
        CounterError::Invalid {
            kind,
            message: message.into(),
        }
    }
}

pub type CounterResult<T> = Result<T, CounterError>;
