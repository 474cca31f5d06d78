//! The test-runner boundary.
//!
//! The engine only needs four things from the running test: who it is, which
//! update mode applies, a way to compare rendered text against a file, and a
//! place to register work for the end of the test. [`CurrentTestAdapter`]
//! names those; [`TestContext`] implements them for ordinary `#[test]`
//! functions.
//!
//! ```no_run
//! use proxy_snapshots::TestContext;
//!
//! let cx = TestContext::current(file!()).unwrap();
//! // ... acquire proxies with `&cx` and exercise them ...
//! cx.finish().unwrap();
//! ```

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use similar::TextDiff;
use tracing::{error, info, warn};

use crate::entities::{CurrentTest, UpdateMode};
use crate::errors::{ProxyError, ProxyResult};

/// Environment variable selecting the update mode (`none`, `new` or `all`).
pub const UPDATE_ENV: &str = "PROXY_SNAPSHOTS_UPDATE";

/// Work deferred to the end of the test. Hooks receive the adapter they were
/// registered on.
pub type TeardownHook = Box<dyn FnOnce(&dyn CurrentTestAdapter) -> ProxyResult<()>>;

/// What the proxy engine needs from the test runner.
pub trait CurrentTestAdapter {
    /// Identity of the running test.
    fn current_test(&self) -> ProxyResult<CurrentTest>;

    fn update_mode(&self) -> UpdateMode;

    /// Compare `contents` against the file at `path`, writing it when the
    /// update mode allows.
    fn expect_to_match_snapshot(&self, contents: &str, path: &Path) -> ProxyResult<()>;

    /// Register a hook; hooks run in reverse registration order.
    fn run_on_teardown(&self, hook: TeardownHook);
}

/// Update mode from [`UPDATE_ENV`]; `none` on CI, `new` otherwise.
pub fn update_mode_from_env() -> UpdateMode {
    if let Ok(value) = std::env::var(UPDATE_ENV) {
        match value.parse() {
            Ok(mode) => return mode,
            Err(e) => warn!("ignoring {}: {}", UPDATE_ENV, e),
        }
    }
    if std::env::var_os("CI").is_some() {
        UpdateMode::None
    } else {
        UpdateMode::New
    }
}

/// [`CurrentTestAdapter`] for a single `#[test]` function.
///
/// Call [`TestContext::finish`] at the end of the test to run teardown hooks
/// and surface their errors. A context dropped without `finish` still runs
/// them; if the test is already panicking, failures are only logged.
pub struct TestContext {
    path: PathBuf,
    name: String,
    update_mode: UpdateMode,
    hooks: RefCell<Vec<TeardownHook>>,
}

impl TestContext {
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            update_mode: update_mode_from_env(),
            hooks: RefCell::new(Vec::new()),
        }
    }

    /// Context for the test running on this thread, defined in `file`
    /// (pass `file!()`).
    ///
    /// The name is the last `::` segment of the test thread's name; `file`
    /// is resolved against the current directory and its ancestors.
    pub fn current(file: &str) -> ProxyResult<Self> {
        let thread = std::thread::current();
        let name = thread
            .name()
            .filter(|name| *name != "main")
            .and_then(|name| name.rsplit("::").next())
            .ok_or_else(|| ProxyError::Harness {
                message: "test name is not available on this thread; use TestContext::new"
                    .to_string(),
            })?;
        Ok(Self::new(resolve_test_file(file)?, name))
    }

    /// Register a teardown hook.
    pub fn on_teardown(
        &self,
        hook: impl FnOnce(&dyn CurrentTestAdapter) -> ProxyResult<()> + 'static,
    ) {
        self.run_on_teardown(Box::new(hook));
    }

    pub fn with_update_mode(mut self, update_mode: UpdateMode) -> Self {
        self.update_mode = update_mode;
        self
    }

    /// Run teardown hooks, newest first. Every hook runs; the first error is
    /// returned.
    pub fn finish(self) -> ProxyResult<()> {
        self.run_hooks()
    }

    fn run_hooks(&self) -> ProxyResult<()> {
        let mut first_error = None;
        loop {
            let hook = self.hooks.borrow_mut().pop();
            let hook = match hook {
                Some(hook) => hook,
                None => break,
            };
            if let Err(e) = hook(self) {
                if first_error.is_none() {
                    first_error = Some(e);
                } else {
                    error!("teardown hook failed: {}", e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn write_snapshot(&self, contents: &str, path: &Path) -> ProxyResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ProxyError::io(parent, e))?;
        }
        fs::write(path, contents).map_err(|e| ProxyError::io(path, e))
    }
}

impl CurrentTestAdapter for TestContext {
    fn current_test(&self) -> ProxyResult<CurrentTest> {
        Ok(CurrentTest {
            path: self.path.clone(),
            name: self.name.clone(),
            update_mode: self.update_mode,
        })
    }

    fn update_mode(&self) -> UpdateMode {
        self.update_mode
    }

    fn expect_to_match_snapshot(&self, contents: &str, path: &Path) -> ProxyResult<()> {
        let existing = if path.exists() {
            Some(fs::read_to_string(path).map_err(|e| ProxyError::io(path, e))?)
        } else {
            None
        };

        match (existing, self.update_mode) {
            (Some(existing), _) if existing == contents => Ok(()),
            (None, UpdateMode::New | UpdateMode::All) => {
                self.write_snapshot(contents, path)?;
                info!(path = %path.display(), "wrote snapshot");
                Ok(())
            }
            (Some(_), UpdateMode::All) => {
                self.write_snapshot(contents, path)?;
                info!(path = %path.display(), "updated snapshot");
                Ok(())
            }
            (existing, _) => Err(ProxyError::SnapshotAssertion {
                path: path.to_path_buf(),
                diff: TextDiff::from_lines(existing.as_deref().unwrap_or(""), contents)
                    .unified_diff()
                    .context_radius(3)
                    .header("recorded", "current")
                    .to_string(),
            }),
        }
    }

    fn run_on_teardown(&self, hook: TeardownHook) {
        self.hooks.borrow_mut().push(hook);
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if self.hooks.borrow().is_empty() {
            return;
        }
        if let Err(e) = self.run_hooks() {
            if std::thread::panicking() {
                error!("teardown failed while unwinding: {}", e);
            } else {
                panic!("{}", e);
            }
        }
    }
}

fn resolve_test_file(file: &str) -> ProxyResult<PathBuf> {
    let file = Path::new(file);
    if file.is_absolute() {
        return Ok(file.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| ProxyError::io(".", e))?;
    cwd.ancestors()
        .map(|dir| dir.join(file))
        .find(|candidate| candidate.exists())
        .ok_or_else(|| ProxyError::Harness {
            message: format!("cannot locate test file {}", file.display()),
        })
}
