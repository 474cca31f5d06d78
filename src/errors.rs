//! Error types for the proxy snapshot system.
//!
//! Every fallible operation in the crate returns [`ProxyResult`]. Only the
//! corrupt-snapshot case is recovered internally (see [`crate::store`]); all
//! other variants surface to the caller.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while serializing, recording or replaying calls.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// No registered type handler accepts the value.
    #[error("no serializer found for value: {value}")]
    Serialization { value: String },

    /// A plain-object key cannot be expressed in generated source.
    #[error("unsupported object key: {key}")]
    UnsupportedKey { key: String },

    /// An intercepted call diverged from the recorded snapshot.
    #[error(transparent)]
    SnapshotMismatch(#[from] SnapshotMismatch),

    /// An existing snapshot file could not be loaded.
    #[error("corrupt snapshot {path}: {message}")]
    CorruptSnapshot { path: PathBuf, message: String },

    /// The fixture CLI was given an unrecognized subcommand.
    #[error("unknown command: {command}")]
    UnknownCommand { command: String },

    /// Generated source could not be parsed.
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Parsed source could not be evaluated into values.
    #[error("evaluation error: {message}")]
    Eval { message: String },

    /// A module constructor rejected its arguments.
    #[error("module {module}: {message}")]
    Module { module: String, message: String },

    /// A real method failed while being recorded.
    #[error("method {path} failed: {message}")]
    Method { path: String, message: String },

    /// A member accessed through a proxy does not exist or has the wrong kind.
    #[error("cannot access {path}: {message}")]
    MissingMember { path: String, message: String },

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {message}")]
    Config { path: PathBuf, message: String },

    /// Rendered snapshot text does not match the file on disk.
    #[error("snapshot {path} does not match:\n{diff}")]
    SnapshotAssertion { path: PathBuf, diff: String },

    #[error("rollback failed: {message}")]
    Rollback { message: String },

    #[error("test harness: {message}")]
    Harness { message: String },

    /// The fixture producer callback failed.
    #[error("fixture producer failed: {message}")]
    Producer { message: String },
}

impl ProxyError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ProxyError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn eval(message: impl Into<String>) -> Self {
        ProxyError::Eval {
            message: message.into(),
        }
    }

    /// True when this error is a recorded-call divergence.
    pub fn is_mismatch(&self) -> bool {
        matches!(self, ProxyError::SnapshotMismatch(_))
    }
}

/// Result type for proxy snapshot operations.
pub type ProxyResult<T> = Result<T, ProxyError>;

/// Raised from an intercepted call that does not match the snapshot entry
/// at the same position.
#[derive(Debug, Clone, Error)]
pub struct SnapshotMismatch {
    /// Zero-based position of the call within the test's call sequence.
    pub index: usize,
    /// Accessor text of the call that was made, e.g. `obj.counter.get("id2")`.
    pub actual: String,
    /// Accessor text of the recorded entry, if the snapshot had one.
    pub expected: Option<String>,
}

impl fmt::Display for SnapshotMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "snapshot call failed at index {}: {}",
            self.index, self.actual
        )?;
        match &self.expected {
            Some(expected) => write!(f, " (expected {})", expected),
            None => write!(f, " (no recorded call)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_message_names_index() {
        let mismatch = SnapshotMismatch {
            index: 0,
            actual: "obj.get(\"id2\")".to_string(),
            expected: Some("obj.get(\"id1\")".to_string()),
        };
        let message = ProxyError::from(mismatch).to_string();
        assert!(message.contains("index 0"));
        assert!(message.contains("expected obj.get(\"id1\")"));
    }

    #[test]
    fn test_mismatch_without_expected_entry() {
        let mismatch = SnapshotMismatch {
            index: 3,
            actual: "obj.save()".to_string(),
            expected: None,
        };
        assert_eq!(
            mismatch.to_string(),
            "snapshot call failed at index 3: obj.save() (no recorded call)"
        );
    }
}
