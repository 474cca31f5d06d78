//! Built-in type handlers.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{multiset_equal, SerializeContext, Serializer, TypeHandler};
use crate::errors::{ProxyError, ProxyResult};
use crate::value::{format_number, Key, Symbol, Value};

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("valid identifier regex"));

/// The built-in handlers, in the order they are consulted.
pub fn base_handlers() -> Vec<Box<dyn TypeHandler>> {
    vec![
        Box::new(NullHandler),
        Box::new(UndefinedHandler),
        Box::new(BooleanHandler),
        Box::new(NumberHandler),
        Box::new(StringHandler),
        Box::new(SymbolHandler),
        Box::new(ArrayHandler),
        Box::new(ObjectHandler),
        Box::new(DateHandler),
        Box::new(PromiseHandler),
        Box::new(SetHandler),
        Box::new(MapHandler),
    ]
}

/// JSON string literal, which is also a valid source string literal.
pub(crate) fn string_literal(s: &str) -> ProxyResult<String> {
    serde_json::to_string(s).map_err(|e| ProxyError::Serialization {
        value: format!("{:?} ({})", s, e),
    })
}

fn join(items: &[Value], cx: &SerializeContext<'_>) -> ProxyResult<String> {
    let parts = items
        .iter()
        .map(|item| cx.serialize(item))
        .collect::<ProxyResult<Vec<_>>>()?;
    Ok(parts.join(", "))
}

pub struct NullHandler;

impl TypeHandler for NullHandler {
    fn name(&self) -> &str {
        "null"
    }

    fn matches(&self, value: &Value) -> bool {
        matches!(value, Value::Null)
    }

    fn equal(&self, _a: &Value, _b: &Value, _serializer: &Serializer) -> bool {
        true
    }

    fn serialize(&self, _value: &Value, _cx: &SerializeContext<'_>) -> ProxyResult<String> {
        Ok("null".to_string())
    }
}

pub struct UndefinedHandler;

impl TypeHandler for UndefinedHandler {
    fn name(&self) -> &str {
        "undefined"
    }

    fn matches(&self, value: &Value) -> bool {
        value.is_undefined()
    }

    fn equal(&self, _a: &Value, _b: &Value, _serializer: &Serializer) -> bool {
        true
    }

    fn serialize(&self, _value: &Value, _cx: &SerializeContext<'_>) -> ProxyResult<String> {
        Ok("undefined".to_string())
    }
}

pub struct BooleanHandler;

impl TypeHandler for BooleanHandler {
    fn name(&self) -> &str {
        "boolean"
    }

    fn matches(&self, value: &Value) -> bool {
        matches!(value, Value::Bool(_))
    }

    fn equal(&self, a: &Value, b: &Value, _serializer: &Serializer) -> bool {
        a.as_bool() == b.as_bool()
    }

    fn serialize(&self, value: &Value, _cx: &SerializeContext<'_>) -> ProxyResult<String> {
        Ok(value.as_bool().unwrap_or_default().to_string())
    }
}

pub struct NumberHandler;

impl TypeHandler for NumberHandler {
    fn name(&self) -> &str {
        "number"
    }

    fn matches(&self, value: &Value) -> bool {
        matches!(value, Value::Number(_))
    }

    fn equal(&self, a: &Value, b: &Value, _serializer: &Serializer) -> bool {
        match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    fn serialize(&self, value: &Value, _cx: &SerializeContext<'_>) -> ProxyResult<String> {
        Ok(format_number(value.as_f64().unwrap_or(f64::NAN)))
    }
}

pub struct StringHandler;

impl TypeHandler for StringHandler {
    fn name(&self) -> &str {
        "string"
    }

    fn matches(&self, value: &Value) -> bool {
        matches!(value, Value::String(_))
    }

    fn equal(&self, a: &Value, b: &Value, _serializer: &Serializer) -> bool {
        a.as_str() == b.as_str()
    }

    fn serialize(&self, value: &Value, _cx: &SerializeContext<'_>) -> ProxyResult<String> {
        string_literal(value.as_str().unwrap_or_default())
    }
}

/// Registered symbols only; anonymous symbols have no source form.
pub struct SymbolHandler;

impl TypeHandler for SymbolHandler {
    fn name(&self) -> &str {
        "symbol"
    }

    fn matches(&self, value: &Value) -> bool {
        matches!(value, Value::Symbol(Symbol::Registered(_)))
    }

    fn equal(&self, a: &Value, b: &Value, _serializer: &Serializer) -> bool {
        a == b
    }

    fn serialize(&self, value: &Value, _cx: &SerializeContext<'_>) -> ProxyResult<String> {
        match value {
            Value::Symbol(Symbol::Registered(description)) => {
                Ok(format!("Symbol.for({})", string_literal(description)?))
            }
            other => Err(ProxyError::Serialization {
                value: other.to_string(),
            }),
        }
    }
}

pub struct ArrayHandler;

impl TypeHandler for ArrayHandler {
    fn name(&self) -> &str {
        "array"
    }

    fn matches(&self, value: &Value) -> bool {
        matches!(value, Value::Array(_))
    }

    fn equal(&self, a: &Value, b: &Value, serializer: &Serializer) -> bool {
        match (a, b) {
            (Value::Array(a), Value::Array(b)) => serializer.equal_all(a, b),
            _ => false,
        }
    }

    fn serialize(&self, value: &Value, cx: &SerializeContext<'_>) -> ProxyResult<String> {
        Ok(format!("[{}]", join(value.as_array().unwrap_or_default(), cx)?))
    }
}

pub struct ObjectHandler;

impl ObjectHandler {
    fn key(key: &Key) -> ProxyResult<String> {
        match key {
            Key::String(s) if IDENTIFIER.is_match(s) => Ok(s.clone()),
            Key::String(s) => string_literal(s),
            Key::Symbol(Symbol::Registered(description)) => {
                Ok(format!("[Symbol.for({})]", string_literal(description)?))
            }
            Key::Symbol(symbol) => Err(ProxyError::UnsupportedKey {
                key: symbol.to_string(),
            }),
        }
    }
}

impl TypeHandler for ObjectHandler {
    fn name(&self) -> &str {
        "object"
    }

    fn matches(&self, value: &Value) -> bool {
        matches!(value, Value::Object(_))
    }

    fn equal(&self, a: &Value, b: &Value, serializer: &Serializer) -> bool {
        match (a, b) {
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(key, value)| {
                        b.iter()
                            .find(|(other, _)| other == key)
                            .map_or(false, |(_, other)| serializer.equal(value, other))
                    })
            }
            _ => false,
        }
    }

    fn serialize(&self, value: &Value, cx: &SerializeContext<'_>) -> ProxyResult<String> {
        let pairs = match value {
            Value::Object(pairs) => pairs,
            other => {
                return Err(ProxyError::Serialization {
                    value: other.to_string(),
                })
            }
        };
        let fields = pairs
            .iter()
            .map(|(key, value)| Ok(format!("{}: {}", Self::key(key)?, cx.serialize(value)?)))
            .collect::<ProxyResult<Vec<_>>>()?;
        Ok(format!("{{{}}}", fields.join(", ")))
    }
}

pub struct DateHandler;

impl TypeHandler for DateHandler {
    fn name(&self) -> &str {
        "date"
    }

    fn matches(&self, value: &Value) -> bool {
        matches!(value, Value::Date(_))
    }

    fn equal(&self, a: &Value, b: &Value, _serializer: &Serializer) -> bool {
        a == b
    }

    fn serialize(&self, value: &Value, _cx: &SerializeContext<'_>) -> ProxyResult<String> {
        match value {
            Value::Date(ms) => Ok(format!("new Date({})", ms)),
            other => Err(ProxyError::Serialization {
                value: other.to_string(),
            }),
        }
    }
}

/// Settled promises; two promises are equal when their values are.
pub struct PromiseHandler;

impl TypeHandler for PromiseHandler {
    fn name(&self) -> &str {
        "promise"
    }

    fn matches(&self, value: &Value) -> bool {
        matches!(value, Value::Promise(_))
    }

    fn equal(&self, a: &Value, b: &Value, serializer: &Serializer) -> bool {
        match (a, b) {
            (Value::Promise(a), Value::Promise(b)) => serializer.equal(a, b),
            _ => false,
        }
    }

    fn serialize(&self, value: &Value, cx: &SerializeContext<'_>) -> ProxyResult<String> {
        match value {
            Value::Promise(inner) => Ok(format!("Promise.resolve({})", cx.serialize(inner)?)),
            other => Err(ProxyError::Serialization {
                value: other.to_string(),
            }),
        }
    }
}

pub struct SetHandler;

impl TypeHandler for SetHandler {
    fn name(&self) -> &str {
        "set"
    }

    fn matches(&self, value: &Value) -> bool {
        matches!(value, Value::Set(_))
    }

    fn equal(&self, a: &Value, b: &Value, serializer: &Serializer) -> bool {
        match (a, b) {
            (Value::Set(a), Value::Set(b)) => multiset_equal(a, b, |x, y| serializer.equal(x, y)),
            _ => false,
        }
    }

    fn serialize(&self, value: &Value, cx: &SerializeContext<'_>) -> ProxyResult<String> {
        match value {
            Value::Set(items) => Ok(format!("new Set([{}])", join(items, cx)?)),
            other => Err(ProxyError::Serialization {
                value: other.to_string(),
            }),
        }
    }
}

pub struct MapHandler;

impl TypeHandler for MapHandler {
    fn name(&self) -> &str {
        "map"
    }

    fn matches(&self, value: &Value) -> bool {
        matches!(value, Value::Map(_))
    }

    fn equal(&self, a: &Value, b: &Value, serializer: &Serializer) -> bool {
        match (a, b) {
            (Value::Map(a), Value::Map(b)) => multiset_equal(a, b, |(k1, v1), (k2, v2)| {
                serializer.equal(k1, k2) && serializer.equal(v1, v2)
            }),
            _ => false,
        }
    }

    fn serialize(&self, value: &Value, cx: &SerializeContext<'_>) -> ProxyResult<String> {
        let pairs = match value {
            Value::Map(pairs) => pairs,
            other => {
                return Err(ProxyError::Serialization {
                    value: other.to_string(),
                })
            }
        };
        let entries = pairs
            .iter()
            .map(|(k, v)| Ok(format!("[{}, {}]", cx.serialize(k)?, cx.serialize(v)?)))
            .collect::<ProxyResult<Vec<_>>>()?;
        Ok(format!("new Map([{}])", entries.join(", ")))
    }
}
