use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use tempfile::TempDir;

use crate::{
    Node, ProxyConfig, ProxyError, ProxySnapshots, Serializer, SnapshotStore, SymbolImport,
    TestContext, UpdateMode, Value,
};

pub(crate) const TEST_FILE: &str = "tests/storage.rs";

pub(crate) fn services_tag() -> SymbolImport {
    SymbolImport::new("Services", "src/services.rs")
}

/// A project directory with a proxy-snapshots setup rooted in it.
pub(crate) struct Project {
    pub dir: TempDir,
    pub snapshots: ProxySnapshots,
}

impl Project {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let serializer = Serializer::builder(SymbolImport::new("modules", "src/testing.rs")).build();
        let config = ProxyConfig::standard().with_project_root(dir.path());
        let store = SnapshotStore::new(Arc::new(serializer), config);
        Self {
            dir,
            snapshots: ProxySnapshots::new(Arc::new(store)),
        }
    }

    pub fn context(&self, name: &str, update_mode: UpdateMode) -> TestContext {
        TestContext::new(TEST_FILE, name).with_update_mode(update_mode)
    }

    pub fn snapshot_path(&self, name: &str) -> PathBuf {
        self.dir
            .path()
            .join("tests/__proxy-snapshots")
            .join(format!("storage-Services-{}.ts", name))
    }
}

/// An in-memory key-value service that logs every real invocation.
#[derive(Clone, Default)]
pub(crate) struct Storage {
    pub entries: Rc<RefCell<BTreeMap<String, Value>>>,
    pub invocations: Rc<RefCell<Vec<String>>>,
}

impl Storage {
    pub fn with(entries: &[(&str, Value)]) -> Self {
        let storage = Self::default();
        for (key, value) in entries {
            storage
                .entries
                .borrow_mut()
                .insert(key.to_string(), value.clone());
        }
        storage
    }

    /// `{storage: {get, set}}`
    pub fn services(&self) -> Rc<Node> {
        let get = self.clone();
        let set = self.clone();
        Rc::new(
            Node::new().child(
                "storage",
                Node::new()
                    .method("get", move |args: Vec<Value>| {
                        let key = key_arg(&args)?;
                        get.invocations.borrow_mut().push(format!("get {}", key));
                        Ok(get.entries.borrow().get(&key).cloned().unwrap_or(Value::Undefined))
                    })
                    .method("set", move |args: Vec<Value>| {
                        let key = key_arg(&args)?;
                        set.invocations.borrow_mut().push(format!("set {}", key));
                        let value = args.get(1).cloned().unwrap_or(Value::Undefined);
                        set.entries.borrow_mut().insert(key, value);
                        Ok(Value::Undefined)
                    }),
            ),
        )
    }

    pub fn invocations(&self) -> Vec<String> {
        self.invocations.borrow().clone()
    }
}

fn key_arg(args: &[Value]) -> Result<String, ProxyError> {
    args.first()
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ProxyError::Method {
            path: "storage".to_string(),
            message: "expected a string key".to_string(),
        })
}
