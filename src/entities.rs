//! Core types shared by the store, the engine and the harness.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{ProxyError, ProxyResult};
use crate::serializer::Serializer;
use crate::value::Value;

/// A named export of a source module, used to emit `import` lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolImport {
    /// Exported name (e.g., "Repositories", "modules").
    pub name: String,
    /// Module path, absolute or relative to the project root.
    pub path: PathBuf,
}

impl SymbolImport {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Recording policy for the running test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    /// Strict replay; any divergence fails.
    None,
    /// Record only when no snapshot exists yet.
    New,
    /// Always re-record.
    All,
}

impl Default for UpdateMode {
    fn default() -> Self {
        UpdateMode::New
    }
}

impl FromStr for UpdateMode {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "none" => Ok(UpdateMode::None),
            "new" => Ok(UpdateMode::New),
            "all" => Ok(UpdateMode::All),
            other => Err(ProxyError::Harness {
                message: format!("invalid update mode '{}': expected none, new or all", other),
            }),
        }
    }
}

impl fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateMode::None => write!(f, "none"),
            UpdateMode::New => write!(f, "new"),
            UpdateMode::All => write!(f, "all"),
        }
    }
}

/// Identity of the running test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentTest {
    /// Path of the file the test is defined in.
    pub path: PathBuf,
    /// Test name (last segment of the full test path).
    pub name: String,
    pub update_mode: UpdateMode,
}

impl CurrentTest {
    /// Whether calls made during this test may invoke real methods.
    pub fn records(&self, snapshot_present: bool) -> bool {
        match self.update_mode {
            UpdateMode::All => true,
            UpdateMode::New => !snapshot_present,
            UpdateMode::None => false,
        }
    }
}

/// An intercepted method invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// Property names from the proxy root to the invoked method.
    pub path: Vec<String>,
    pub args: Vec<Value>,
    /// Present once the call has a recorded or replayed result.
    pub returns: Option<Value>,
}

impl Call {
    pub fn new(path: Vec<String>, args: Vec<Value>) -> Self {
        Self {
            path,
            args,
            returns: None,
        }
    }

    pub fn with_returns(mut self, returns: Value) -> Self {
        self.returns = Some(returns);
        self
    }

    /// Structural identity: same path and equal arguments.
    pub fn matches(&self, other: &Call, serializer: &Serializer) -> bool {
        self.path == other.path && serializer.equal_all(&self.args, &other.args)
    }

    /// Human-readable form, e.g. `obj.counter.get("id1")`.
    pub fn describe(&self) -> String {
        let args = self
            .args
            .iter()
            .map(|arg| arg.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        format!("obj.{}({})", self.path.join("."), args)
    }
}

/// The recorded call trace of one test, in call order.
pub type Snapshot = Vec<Call>;

/// Error type rollback hooks may return.
pub type HookError = Box<dyn std::error::Error>;

type Hook = Box<dyn FnOnce() -> Result<(), HookError>>;

/// Side effects to undo around a recording run.
///
/// Only used when the test records; pure replay never runs either hook.
#[derive(Default)]
pub struct Rollback {
    pub(crate) setup: Option<Hook>,
    pub(crate) teardown: Option<Hook>,
}

impl Rollback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn setup(mut self, hook: impl FnOnce() -> Result<(), HookError> + 'static) -> Self {
        self.setup = Some(Box::new(hook));
        self
    }

    pub fn teardown(mut self, hook: impl FnOnce() -> Result<(), HookError> + 'static) -> Self {
        self.teardown = Some(Box::new(hook));
        self
    }

    pub(crate) fn run_setup(&mut self) -> ProxyResult<()> {
        match self.setup.take() {
            Some(setup) => setup().map_err(|e| ProxyError::Rollback {
                message: format!("setup: {}", e),
            }),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Rollback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rollback")
            .field("setup", &self.setup.is_some())
            .field("teardown", &self.teardown.is_some())
            .finish()
    }
}
