//! Key-value storage services.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use proxy_snapshots::Value;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use tracing::debug;

use crate::errors::{CounterError, CounterResult};

pub trait KeyValueStorage {
    fn get(&self, key: &str) -> CounterResult<Option<Json>>;
    fn set(&self, key: &str, value: Json) -> CounterResult<()>;
}

/// Storage kept in memory as serialized JSON strings.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStorage {
    cache: RefCell<BTreeMap<String, String>>,
}

impl InMemoryKeyValueStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for InMemoryKeyValueStorage {
    fn get(&self, key: &str) -> CounterResult<Option<Json>> {
        match self.cache.borrow().get(key) {
            Some(text) => Ok(Some(serde_json::from_str(text)?)),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: Json) -> CounterResult<()> {
        let text = serde_json::to_string(&value)?;
        self.cache.borrow_mut().insert(key.to_string(), text);
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StorageFile {
    #[serde(default)]
    entries: BTreeMap<String, Json>,
}

/// Storage persisted to a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read(&self) -> CounterResult<StorageFile> {
        if !self.path.exists() {
            return Ok(StorageFile::default());
        }
        let text = fs::read_to_string(&self.path).map_err(|source| CounterError::Storage {
            path: self.path.clone(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }
}

impl KeyValueStorage for JsonFileStorage {
    fn get(&self, key: &str) -> CounterResult<Option<Json>> {
        Ok(self.read()?.entries.remove(key))
    }

    fn set(&self, key: &str, value: Json) -> CounterResult<()> {
        let mut file = self.read()?;
        file.entries.insert(key.to_string(), value);
        let text = serde_json::to_string_pretty(&file)?;
        fs::write(&self.path, text).map_err(|source| CounterError::Storage {
            path: self.path.clone(),
            source,
        })?;
        debug!(path = %self.path.display(), key, "stored value");
        Ok(())
    }
}

/// Stored JSON as a proxy value.
pub fn json_to_value(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        Json::String(s) => Value::String(s.clone()),
        Json::Array(items) => Value::Array(items.iter().map(json_to_value).collect()),
        Json::Object(map) => Value::object(map.iter().map(|(k, v)| (k.as_str(), json_to_value(v)))),
    }
}

/// A proxy value as storable JSON. `undefined` means "absent".
pub fn value_to_json(value: &Value) -> CounterResult<Option<Json>> {
    let json = match value {
        Value::Undefined => return Ok(None),
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => Json::from(*n as i64),
        Value::Number(n) => serde_json::Number::from_f64(*n)
            .map(Json::Number)
            .ok_or_else(|| CounterError::invalid("json", format!("{} is not finite", n)))?,
        Value::String(s) => Json::String(s.clone()),
        Value::Array(items) => Json::Array(
            items
                .iter()
                .map(|item| Ok(value_to_json(item)?.unwrap_or(Json::Null)))
                .collect::<CounterResult<Vec<_>>>()?,
        ),
        Value::Object(pairs) => {
            let mut map = serde_json::Map::new();
            for (key, item) in pairs {
                if let Some(item) = value_to_json(item)? {
                    map.insert(key.to_string(), item);
                }
            }
            Json::Object(map)
        }
        other => {
            return Err(CounterError::invalid(
                "json",
                format!("{} cannot be stored", other.kind()),
            ))
        }
    };
    Ok(Some(json))
}
