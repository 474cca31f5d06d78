//! A counter application wired for proxy snapshots.
//!
//! - [`Counter`] and the settled [`Async`] outcome are the domain values
//! - [`KeyValueStorage`] services back the [`CounterRepository`]
//! - [`handlers`] teach the serializer to write `_modules.Counter.create(...)`
//!   and `_modules.Async.success(...)`
//! - [`testing::AppProxySnapshots`] hands tests repositories and use cases
//!   whose lower layer is recorded and replayed
//! - the `counter-fixtures` binary regenerates `src/tests/fixtures.ts`

mod composition_root;
mod counter;
mod errors;
mod repository;
mod storage;
mod usecases;

pub mod fixtures;
pub mod handlers;
pub mod testing;

pub use composition_root::{
    get_app_composition_root, get_app_repositories, get_composition_root, get_repositories,
    get_services, CompositionRoot, Counters, Repositories, Services, STORAGE_ENV,
};
pub use counter::{Async, Counter, Record};
pub use errors::{CounterError, CounterResult};
pub use repository::{CounterRepository, CounterStorageRepository};
pub use storage::{
    json_to_value, value_to_json, InMemoryKeyValueStorage, JsonFileStorage, KeyValueStorage,
};
pub use usecases::{GetCounterUseCase, SaveCounterUseCase};
