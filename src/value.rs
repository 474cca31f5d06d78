//! Dynamic values passed through proxied calls.
//!
//! Every argument and return value that crosses a proxy is expressed as a
//! [`Value`]. The variants mirror what generated snapshot source can
//! describe, plus [`Instance`] for domain types that consumer handlers know
//! how to rebuild.

use std::fmt;

/// A runtime value that can be recorded into a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Undefined,
    Bool(bool),
    Number(f64),
    String(String),
    Symbol(Symbol),
    Array(Vec<Value>),
    /// Plain object with keys in insertion order.
    Object(Vec<(Key, Value)>),
    /// Milliseconds since the Unix epoch.
    Date(i64),
    /// A settled asynchronous value.
    Promise(Box<Value>),
    Set(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Instance(Instance),
}

/// A symbol value.
///
/// Registered symbols carry the description they were registered under and
/// can be rebuilt with `Symbol.for`. Anonymous symbols cannot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Symbol {
    Registered(String),
    Anonymous(Option<String>),
}

/// A plain-object key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    String(String),
    Symbol(Symbol),
}

/// A domain value: the class it belongs to and its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    class: String,
    attributes: Box<Value>,
}

impl Instance {
    pub fn new(class: impl Into<String>, attributes: Value) -> Self {
        Self {
            class: class.into(),
            attributes: Box::new(attributes),
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn attributes(&self) -> &Value {
        &self.attributes
    }

    pub fn into_attributes(self) -> Value {
        *self.attributes
    }
}

impl Value {
    /// Build a plain object from string-keyed pairs.
    pub fn object<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Object(
            pairs
                .into_iter()
                .map(|(k, v)| (Key::String(k.into()), v))
                .collect(),
        )
    }

    pub fn instance(class: impl Into<String>, attributes: Value) -> Self {
        Value::Instance(Instance::new(class, attributes))
    }

    pub fn promise(value: Value) -> Self {
        Value::Promise(Box::new(value))
    }

    pub fn symbol_for(description: impl Into<String>) -> Self {
        Value::Symbol(Symbol::Registered(description.into()))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    /// Look up a string key on a plain object.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(pairs) => pairs.iter().find_map(|(k, v)| match k {
                Key::String(s) if s == key => Some(v),
                _ => None,
            }),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Undefined => "undefined",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Date(_) => "date",
            Value::Promise(_) => "promise",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
            Value::Instance(_) => "instance",
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Registered(description) => write!(f, "Symbol({})", description),
            Symbol::Anonymous(Some(description)) => write!(f, "Symbol({})", description),
            Symbol::Anonymous(None) => write!(f, "Symbol()"),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::String(s) => write!(f, "{}", s),
            Key::Symbol(symbol) => write!(f, "[{}]", symbol),
        }
    }
}

/// Compact, human-oriented rendering used in error and log messages.
///
/// This is not the serialized form; see [`crate::Serializer`] for that.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Undefined => write!(f, "undefined"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Symbol(symbol) => write!(f, "{}", symbol),
            Value::Array(values) => {
                write!(f, "[")?;
                write_list(f, values)?;
                write!(f, "]")
            }
            Value::Object(pairs) => {
                write!(f, "{{")?;
                for (idx, (key, value)) in pairs.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Date(ms) => write!(f, "Date({})", ms),
            Value::Promise(inner) => write!(f, "Promise({})", inner),
            Value::Set(values) => {
                write!(f, "Set(")?;
                write_list(f, values)?;
                write!(f, ")")
            }
            Value::Map(pairs) => {
                write!(f, "Map(")?;
                for (idx, (key, value)) in pairs.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} => {}", key, value)?;
                }
                write!(f, ")")
            }
            Value::Instance(instance) => {
                write!(f, "{} {}", instance.class, instance.attributes)
            }
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, values: &[Value]) -> fmt::Result {
    for (idx, value) in values.iter().enumerate() {
        if idx > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", value)?;
    }
    Ok(())
}

/// Format a number the way `Number.prototype.toString` does for the values
/// snapshots contain.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if n == 0.0 {
        // -0 prints as 0
        "0".to_string()
    } else {
        format!("{}", n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Instance> for Value {
    fn from(instance: Instance) -> Self {
        Value::Instance(instance)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::Array(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Undefined, Into::into)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Undefined
    }
}
