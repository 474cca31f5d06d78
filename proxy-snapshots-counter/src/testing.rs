//! Test wiring: the application serializer, and composition roots whose
//! lower layers are proxied for the running test.
//!
//! Generated snapshot and fixture files import the modules bundle from this
//! file (`import { modules as _modules } from ".../testing"`).

use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use proxy_snapshots::{
    CurrentTestAdapter, Proxy, ProxyConfig, ProxyOptions, ProxySnapshots, ProxyResult, Rollback,
    Serializer, SerializerBuilder, SnapshotStore, SymbolImport, Value,
};
use serde_json::Value as Json;

use crate::composition_root::{
    get_composition_root, get_repositories, CompositionRoot, Repositories, Services,
};
use crate::counter::{Async, Counter, Record};
use crate::errors::CounterResult;
use crate::handlers::{AsyncHandler, StructHandler};
use crate::repository::CounterRepository;
use crate::storage::{json_to_value, value_to_json, KeyValueStorage};

/// Source file the type tags below refer to.
const COMPOSITION_ROOT: &str = "src/composition_root.rs";

pub fn modules_import() -> SymbolImport {
    SymbolImport::new("modules", "src/testing.rs")
}

pub fn services_type() -> SymbolImport {
    SymbolImport::new("Services", COMPOSITION_ROOT)
}

pub fn repositories_type() -> SymbolImport {
    SymbolImport::new("Repositories", COMPOSITION_ROOT)
}

pub fn composition_root_type() -> SymbolImport {
    SymbolImport::new("CompositionRoot", COMPOSITION_ROOT)
}

fn app_serializer_builder() -> SerializerBuilder {
    Serializer::builder(modules_import())
        .handler(AsyncHandler)
        .handler(StructHandler::new().record::<Counter>())
}

/// Domain handlers first, then the built-in ones.
pub fn app_serializer() -> Serializer {
    app_serializer_builder().build()
}

/// [`app_serializer`] with the project's `modules_ref` applied.
pub fn configured_serializer(config: &ProxyConfig) -> Serializer {
    app_serializer_builder().configured(config).build()
}

/// Proxy snapshots configured for this crate.
#[derive(Debug, Clone)]
pub struct AppProxySnapshots {
    snapshots: ProxySnapshots,
}

impl AppProxySnapshots {
    /// Snapshots for a project rooted at `root`, reading `proxy-snapshots.toml`
    /// from it when present.
    pub fn new(root: &Path) -> ProxyResult<Self> {
        let config = ProxyConfig::from_project_root(root)?;
        Ok(Self::with_config(config))
    }

    pub fn with_config(config: ProxyConfig) -> Self {
        let store = SnapshotStore::new(Arc::new(configured_serializer(&config)), config);
        Self {
            snapshots: ProxySnapshots::new(Arc::new(store)),
        }
    }

    /// Snapshots for this crate's own sources.
    pub fn for_crate() -> ProxyResult<Self> {
        Self::new(Path::new(env!("CARGO_MANIFEST_DIR")))
    }

    pub fn snapshots(&self) -> &ProxySnapshots {
        &self.snapshots
    }

    pub fn serializer(&self) -> &Arc<Serializer> {
        self.snapshots.store().serializer()
    }

    /// Repositories over proxied services.
    pub fn repositories_with_proxied_services(
        &self,
        cx: &dyn CurrentTestAdapter,
        services: &Services,
        rollback: Option<Rollback>,
    ) -> ProxyResult<Repositories> {
        let mut options = ProxyOptions::new(services_type());
        options.rollback = rollback;
        let proxy = self
            .snapshots
            .acquire(cx, Rc::new(services.to_object()), options)?;
        let proxied = Services {
            storage: Rc::new(ProxiedStorage {
                storage: proxy.object("storage")?,
            }),
        };
        Ok(get_repositories(&proxied))
    }

    /// A composition root over proxied repositories.
    pub fn composition_root_with_proxied_repos(
        &self,
        cx: &dyn CurrentTestAdapter,
        repositories: &Repositories,
    ) -> ProxyResult<CompositionRoot> {
        let proxy = self.snapshots.acquire(
            cx,
            Rc::new(repositories.to_object()),
            ProxyOptions::new(repositories_type()),
        )?;
        let proxied = Repositories {
            counter: Rc::new(ProxiedCounterRepository {
                counter: proxy.object("counter")?,
            }),
        };
        Ok(get_composition_root(&proxied))
    }

    /// The composition root itself, proxied: `counters.get.execute(id)` and
    /// `counters.save.execute(counter)` return settled `Async` values.
    pub fn proxied_composition_root(
        &self,
        cx: &dyn CurrentTestAdapter,
        root: &CompositionRoot,
    ) -> ProxyResult<Proxy> {
        self.snapshots.acquire(
            cx,
            Rc::new(root.to_object()),
            ProxyOptions::new(composition_root_type()),
        )
    }
}

/// [`KeyValueStorage`] backed by a proxied `storage` object.
pub struct ProxiedStorage {
    storage: Proxy,
}

impl KeyValueStorage for ProxiedStorage {
    fn get(&self, key: &str) -> CounterResult<Option<Json>> {
        let value = self.storage.call("get", vec![Value::from(key)])?;
        value_to_json(&value)
    }

    fn set(&self, key: &str, value: Json) -> CounterResult<()> {
        self.storage
            .call("set", vec![Value::from(key), json_to_value(&value)])?;
        Ok(())
    }
}

/// [`CounterRepository`] backed by a proxied `counter` repository object.
pub struct ProxiedCounterRepository {
    counter: Proxy,
}

impl CounterRepository for ProxiedCounterRepository {
    fn get(&self, id: &str) -> CounterResult<Counter> {
        let settled = self.counter.call("get", vec![Value::from(id)])?;
        Async::from_value(&settled)?.into_result(Counter::from_value)
    }

    fn save(&self, counter: &Counter) -> CounterResult<Counter> {
        let settled = self.counter.call("save", vec![counter.to_value()])?;
        Async::from_value(&settled)?.into_result(Counter::from_value)
    }
}
