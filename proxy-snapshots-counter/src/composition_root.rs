//! Wiring of services, repositories and use cases.
//!
//! Each layer can also be viewed as a [`Node`] so that tests can proxy it:
//! method arguments and results cross the proxy as [`Value`]s.

use std::path::PathBuf;
use std::rc::Rc;

use proxy_snapshots::{Node, ProxyError, ProxyResult, Value};

use crate::counter::{Async, Counter, Record};
use crate::errors::CounterError;
use crate::repository::{CounterRepository, CounterStorageRepository};
use crate::storage::{
    json_to_value, value_to_json, InMemoryKeyValueStorage, JsonFileStorage, KeyValueStorage,
};
use crate::usecases::{GetCounterUseCase, SaveCounterUseCase};

/// Environment variable naming a JSON file to use as storage.
pub const STORAGE_ENV: &str = "COUNTER_STORAGE";

pub struct Services {
    pub storage: Rc<dyn KeyValueStorage>,
}

pub struct Repositories {
    pub counter: Rc<dyn CounterRepository>,
}

pub struct Counters {
    pub get: GetCounterUseCase,
    pub save: SaveCounterUseCase,
}

pub struct CompositionRoot {
    pub counters: Counters,
}

pub fn get_services() -> Services {
    let storage: Rc<dyn KeyValueStorage> = match std::env::var_os(STORAGE_ENV) {
        Some(path) => Rc::new(JsonFileStorage::new(PathBuf::from(path))),
        None => Rc::new(InMemoryKeyValueStorage::new()),
    };
    Services { storage }
}

pub fn get_repositories(services: &Services) -> Repositories {
    Repositories {
        counter: Rc::new(CounterStorageRepository::new(services.storage.clone())),
    }
}

pub fn get_composition_root(repositories: &Repositories) -> CompositionRoot {
    CompositionRoot {
        counters: Counters {
            get: GetCounterUseCase::new(repositories.counter.clone()),
            save: SaveCounterUseCase::new(repositories.counter.clone()),
        },
    }
}

pub fn get_app_repositories() -> Repositories {
    get_repositories(&get_services())
}

pub fn get_app_composition_root() -> CompositionRoot {
    get_composition_root(&get_app_repositories())
}

fn method_error(path: &str, e: CounterError) -> ProxyError {
    ProxyError::Method {
        path: path.to_string(),
        message: e.to_string(),
    }
}

fn string_arg(path: &str, args: &[Value], idx: usize) -> ProxyResult<String> {
    args.get(idx)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            let message = format!("argument {} must be a string", idx);
            method_error(path, CounterError::invalid("argument", message))
        })
}

fn counter_arg(path: &str, args: &[Value]) -> ProxyResult<Counter> {
    let arg = args.first().cloned().unwrap_or(Value::Undefined);
    Counter::from_value(&arg).map_err(|e| method_error(path, e))
}

impl Services {
    /// `{storage: {get, set}}`
    pub fn to_object(&self) -> Node {
        let get = self.storage.clone();
        let set = self.storage.clone();
        Node::new().child(
            "storage",
            Node::new()
                .method("get", move |args: Vec<Value>| {
                    let key = string_arg("storage.get", &args, 0)?;
                    let stored = get.get(&key).map_err(|e| method_error("storage.get", e))?;
                    Ok(stored.as_ref().map_or(Value::Undefined, json_to_value))
                })
                .method("set", move |args: Vec<Value>| {
                    let key = string_arg("storage.set", &args, 0)?;
                    let value = args.get(1).cloned().unwrap_or(Value::Undefined);
                    let json = value_to_json(&value)
                        .map_err(|e| method_error("storage.set", e))?
                        .unwrap_or(serde_json::Value::Null);
                    set.set(&key, json).map_err(|e| method_error("storage.set", e))?;
                    Ok(Value::Undefined)
                }),
        )
    }
}

impl Repositories {
    /// `{counter: {get, save}}`; results are settled [`Async`] values.
    pub fn to_object(&self) -> Node {
        let get = self.counter.clone();
        let save = self.counter.clone();
        Node::new().child(
            "counter",
            Node::new()
                .method("get", move |args: Vec<Value>| {
                    let id = string_arg("counter.get", &args, 0)?;
                    Ok(Async::from_result(get.get(&id)).to_value())
                })
                .method("save", move |args: Vec<Value>| {
                    let counter = counter_arg("counter.save", &args)?;
                    Ok(Async::from_result(save.save(&counter)).to_value())
                }),
        )
    }
}

impl CompositionRoot {
    /// `{counters: {get: {execute}, save: {execute}}}`
    pub fn to_object(&self) -> Node {
        let get = self.counters.get.clone();
        let save = self.counters.save.clone();
        Node::new().child(
            "counters",
            Node::new()
                .child(
                    "get",
                    Node::new().method("execute", move |args: Vec<Value>| {
                        let id = string_arg("counters.get.execute", &args, 0)?;
                        Ok(Async::from_result(get.execute(&id)).to_value())
                    }),
                )
                .child(
                    "save",
                    Node::new().method("execute", move |args: Vec<Value>| {
                        let counter = counter_arg("counters.save.execute", &args)?;
                        Ok(Async::from_result(save.execute(&counter)).to_value())
                    }),
                ),
        )
    }
}
