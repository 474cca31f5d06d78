//! Domain entities.

use std::convert::TryFrom;

use proxy_snapshots::{Instance, Value};
use serde::{Deserialize, Serialize};

use crate::errors::{CounterError, CounterResult};

/// An immutable record that can be rebuilt from its attributes.
///
/// Records travel through proxies as [`Value::Instance`]s of class
/// [`Record::CLASS`], and generated source rebuilds them with
/// `_modules.<CLASS>.create({...})`.
pub trait Record: Sized {
    const CLASS: &'static str;

    fn attributes(&self) -> Value;

    fn from_attributes(attributes: &Value) -> CounterResult<Self>;

    fn to_value(&self) -> Value {
        Value::instance(Self::CLASS, self.attributes())
    }

    fn from_value(value: &Value) -> CounterResult<Self> {
        match value.as_instance() {
            Some(instance) if instance.class() == Self::CLASS => {
                Self::from_attributes(instance.attributes())
            }
            _ => Err(CounterError::invalid(
                Self::CLASS,
                format!("expected a {} record, got {}", Self::CLASS, value),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    pub id: String,
    pub value: i64,
}

impl Counter {
    pub fn new(id: impl Into<String>, value: i64) -> Self {
        Self {
            id: id.into(),
            value,
        }
    }

    pub fn add(&self, value: i64) -> Counter {
        Counter {
            value: self.value + value,
            ..self.clone()
        }
    }
}

impl Record for Counter {
    const CLASS: &'static str = "Counter";

    fn attributes(&self) -> Value {
        Value::object([
            ("id", Value::from(self.id.as_str())),
            ("value", Value::from(self.value)),
        ])
    }

    fn from_attributes(attributes: &Value) -> CounterResult<Self> {
        let id = attributes
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| CounterError::invalid("Counter", "missing string id"))?;
        let value = attributes
            .get("value")
            .and_then(Value::as_f64)
            .filter(|n| n.fract() == 0.0)
            .ok_or_else(|| CounterError::invalid("Counter", "missing integer value"))?;
        Ok(Counter::new(id, value as i64))
    }
}

impl From<&Counter> for Value {
    fn from(counter: &Counter) -> Self {
        counter.to_value()
    }
}

impl From<Counter> for Value {
    fn from(counter: Counter) -> Self {
        counter.to_value()
    }
}

impl TryFrom<&Value> for Counter {
    type Error = CounterError;

    fn try_from(value: &Value) -> CounterResult<Self> {
        Counter::from_value(value)
    }
}

/// The settled outcome of an asynchronous operation.
///
/// Repository methods are recorded with their outcome, so a failed `get` is
/// replayed as the same failure rather than aborting the recording.
#[derive(Debug, Clone, PartialEq)]
pub enum Async {
    Success(Value),
    Error(String),
}

impl Async {
    pub const CLASS: &'static str = "Async";

    pub fn from_result<T>(result: CounterResult<T>) -> Self
    where
        T: Into<Value>,
    {
        match result {
            Ok(value) => Async::Success(value.into()),
            Err(e) => Async::Error(e.to_string()),
        }
    }

    pub fn to_value(&self) -> Value {
        let attributes = match self {
            Async::Success(value) => Value::object([("success", value.clone())]),
            Async::Error(message) => Value::object([("error", Value::from(message.as_str()))]),
        };
        Value::instance(Self::CLASS, attributes)
    }

    pub fn from_value(value: &Value) -> CounterResult<Self> {
        let instance = value
            .as_instance()
            .filter(|instance| instance.class() == Self::CLASS)
            .ok_or_else(|| CounterError::invalid("Async", format!("got {}", value)))?;
        Self::from_instance(instance)
    }

    pub(crate) fn from_instance(instance: &Instance) -> CounterResult<Self> {
        let attributes = instance.attributes();
        if let Some(value) = attributes.get("success") {
            return Ok(Async::Success(value.clone()));
        }
        match attributes.get("error").and_then(Value::as_str) {
            Some(message) => Ok(Async::Error(message.to_string())),
            None => Err(CounterError::invalid("Async", "neither success nor error")),
        }
    }

    /// Back to a result, reading the success value with `read`.
    pub fn into_result<T>(self, read: impl FnOnce(&Value) -> CounterResult<T>) -> CounterResult<T> {
        match self {
            Async::Success(value) => read(&value),
            Async::Error(message) => Err(CounterError::Failed(message)),
        }
    }
}
