use std::cell::RefCell;
use std::path::{Path, PathBuf};

use proxy_snapshots::{ProxyConfig, TestContext, UpdateMode};
use serde_json::Value as Json;
use tempfile::TempDir;

use crate::storage::{InMemoryKeyValueStorage, KeyValueStorage};
use crate::testing::AppProxySnapshots;
use crate::CounterResult;

/// A scratch project root with the application's proxy snapshots.
pub(crate) struct Project {
    pub dir: TempDir,
    pub app: AppProxySnapshots,
}

impl Project {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = ProxyConfig::standard().with_project_root(dir.path());
        Self {
            app: AppProxySnapshots::with_config(config),
            dir,
        }
    }

    pub fn context(&self, test_file: &str, name: &str, update_mode: UpdateMode) -> TestContext {
        TestContext::new(test_file, name).with_update_mode(update_mode)
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }
}

/// In-memory storage that logs every access.
#[derive(Default)]
pub(crate) struct LoggedStorage {
    inner: InMemoryKeyValueStorage,
    pub log: RefCell<Vec<String>>,
}

impl LoggedStorage {
    pub fn log(&self) -> Vec<String> {
        self.log.borrow().clone()
    }
}

impl KeyValueStorage for LoggedStorage {
    fn get(&self, key: &str) -> CounterResult<Option<Json>> {
        self.log.borrow_mut().push(format!("get {}", key));
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: Json) -> CounterResult<()> {
        self.log.borrow_mut().push(format!("set {} {}", key, value));
        self.inner.set(key, value)
    }
}

pub(crate) fn crate_file(relative: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(relative)
}
