use std::rc::Rc;

use serde_json::Value as Json;

use crate::counter::Counter;
use crate::errors::CounterResult;
use crate::storage::KeyValueStorage;

pub trait CounterRepository {
    fn get(&self, id: &str) -> CounterResult<Counter>;
    fn save(&self, counter: &Counter) -> CounterResult<Counter>;
}

/// Counters stored as plain numbers under `counter-<id>`.
pub struct CounterStorageRepository {
    storage: Rc<dyn KeyValueStorage>,
}

impl CounterStorageRepository {
    pub fn new(storage: Rc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    fn key(id: &str) -> String {
        format!("counter-{}", id)
    }
}

impl CounterRepository for CounterStorageRepository {
    fn get(&self, id: &str) -> CounterResult<Counter> {
        let value = match self.storage.get(&Self::key(id))? {
            Some(Json::Number(n)) => n.as_i64().unwrap_or(0),
            Some(Json::String(s)) => s.parse().unwrap_or(0),
            _ => 0,
        };
        Ok(Counter::new(id, value))
    }

    fn save(&self, counter: &Counter) -> CounterResult<Counter> {
        self.storage
            .set(&Self::key(&counter.id), Json::from(counter.value))?;
        Ok(counter.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryKeyValueStorage;
    use serde_json::json;

    #[test]
    fn test_missing_counter_starts_at_zero() {
        let repository = CounterStorageRepository::new(Rc::new(InMemoryKeyValueStorage::new()));
        assert_eq!(repository.get("1").unwrap(), Counter::new("1", 0));
    }

    #[test]
    fn test_save_then_get() {
        let storage = Rc::new(InMemoryKeyValueStorage::new());
        let repository = CounterStorageRepository::new(storage.clone());
        repository.save(&Counter::new("1", 4)).unwrap();
        assert_eq!(storage.get("counter-1").unwrap(), Some(json!(4)));
        assert_eq!(repository.get("1").unwrap(), Counter::new("1", 4));
    }
}
