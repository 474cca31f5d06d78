//! Record/replay snapshots for tests that talk to real services.
//!
//! A test wraps an object graph (repositories, service clients, a composition
//! root) in a proxy. The first run records every method call with its
//! arguments and result into a generated source file beside the test. Later
//! runs replay results from that file without touching the real objects, and
//! fail fast when the test makes a call the snapshot does not predict.
//!
//! ## Building blocks
//!
//! - [`Serializer`] - turns [`Value`]s into source text and compares them
//!   structurally, through an ordered list of [`TypeHandler`]s
//! - [`SnapshotStore`] - snapshot file paths, loading and rendering
//! - [`ProxySnapshots`] - wraps an [`Object`] for the running test and
//!   decides per call whether to replay, record or fail
//! - [`CurrentTestAdapter`] / [`TestContext`] - the test-runner boundary:
//!   identity, update mode, file assertions and teardown hooks
//! - [`fixtures`] and [`cli`] - fixture files generated from live data
//!
//! ## Example
//!
//! ```no_run
//! use std::rc::Rc;
//! use std::sync::Arc;
//!
//! use proxy_snapshots::{
//!     Node, ProxyConfig, ProxyOptions, ProxySnapshots, Serializer, SnapshotStore, SymbolImport,
//!     TestContext, Value,
//! };
//!
//! let serializer = Serializer::builder(SymbolImport::new("modules", "src/testing.rs")).build();
//! let store = SnapshotStore::new(Arc::new(serializer), ProxyConfig::standard());
//! let snapshots = ProxySnapshots::new(Arc::new(store));
//!
//! let cx = TestContext::current(file!()).unwrap();
//! let storage = Node::new().child(
//!     "storage",
//!     Node::new().method("get", |_args: Vec<Value>| Ok(Value::from("stored"))),
//! );
//! let proxy = snapshots
//!     .acquire(
//!         &cx,
//!         Rc::new(storage),
//!         ProxyOptions::new(SymbolImport::new("Services", "src/services.rs")),
//!     )
//!     .unwrap();
//! let value = proxy.object("storage").unwrap().call("get", vec!["key".into()]).unwrap();
//! assert_eq!(value, Value::from("stored"));
//! cx.finish().unwrap();
//! ```

mod config;
mod entities;
mod errors;
mod formatter;
mod modules;
mod source;
mod value;

pub mod accessor;
pub mod cli;
pub mod fixtures;
pub mod harness;
pub mod proxy;
pub mod serializer;
pub mod store;

pub use config::{ProxyConfig, CONFIG_FILE};
pub use entities::{
    Call, CurrentTest, HookError, Rollback, Snapshot, SymbolImport, UpdateMode,
};
pub use errors::{ProxyError, ProxyResult, SnapshotMismatch};
pub use fixtures::{generate, load_fixtures, FixturesFile, FixturesRepository};
pub use formatter::{format_source, FormatOptions};
pub use harness::{update_mode_from_env, CurrentTestAdapter, TeardownHook, TestContext, UPDATE_ENV};
pub use modules::{ExportedSymbol, FnModule, Module, Modules};
pub use proxy::{Accessed, Member, Method, Node, Object, Proxy, ProxyMethod, ProxyOptions, ProxySnapshots};
pub use serializer::{SerializeContext, Serializer, SerializerBuilder, TypeHandler};
pub use source::SourceModule;
pub use store::{Expectation, SnapshotStore};
pub use value::{Instance, Key, Symbol, Value};

#[cfg(test)]
mod tests {
    mod configured;
    mod recording;
    mod replay;
    mod rollback;
    mod support;
}
