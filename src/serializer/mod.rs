//! Value serialization into source text, and structural equality.
//!
//! A [`Serializer`] holds an ordered list of [`TypeHandler`]s. For any value
//! the first handler whose [`TypeHandler::matches`] accepts it decides how it
//! is written and compared. Consumer handlers are registered ahead of the
//! built-in ones, so a domain handler always wins over the generic object
//! handler.
//!
//! ## Example
//!
//! ```
//! use proxy_snapshots::{Serializer, SymbolImport, Value};
//!
//! let serializer = Serializer::builder(SymbolImport::new("modules", "tests/modules.rs")).build();
//! let value = Value::object([("id", Value::from("1")), ("tags", Value::from(vec!["a"]))]);
//! assert_eq!(serializer.serialize(&value).unwrap(), r#"{id: "1", tags: ["a"]}"#);
//! ```

mod handlers;

pub use handlers::{
    base_handlers, ArrayHandler, BooleanHandler, DateHandler, MapHandler, NullHandler,
    NumberHandler, ObjectHandler, PromiseHandler, SetHandler, StringHandler, SymbolHandler,
    UndefinedHandler,
};

use std::collections::BTreeMap;
use std::fmt;

use crate::config::ProxyConfig;
use crate::entities::SymbolImport;
use crate::errors::{ProxyError, ProxyResult};
use crate::modules::{ExportedSymbol, Modules};
use crate::value::Value;

/// Match, compare and serialize one category of values.
pub trait TypeHandler: Send + Sync {
    /// Short name for diagnostics.
    fn name(&self) -> &str;

    /// Whether this handler is responsible for `value`.
    fn matches(&self, value: &Value) -> bool;

    /// Structural equality of two values this handler matches.
    fn equal(&self, a: &Value, b: &Value, serializer: &Serializer) -> bool;

    /// Source text that evaluates back to a value equal to `value`.
    fn serialize(&self, value: &Value, cx: &SerializeContext<'_>) -> ProxyResult<String>;

    /// Modules generated code needs in order to rebuild this handler's values.
    fn exported_symbols(&self) -> Vec<ExportedSymbol> {
        Vec::new()
    }
}

/// What a handler sees while serializing: the serializer for nested values,
/// and the source references of the modules it exported.
pub struct SerializeContext<'a> {
    serializer: &'a Serializer,
    module_refs: &'a BTreeMap<String, String>,
}

impl<'a> SerializeContext<'a> {
    /// Serialize a nested value.
    pub fn serialize(&self, value: &Value) -> ProxyResult<String> {
        self.serializer.serialize(value)
    }

    pub fn serializer(&self) -> &Serializer {
        self.serializer
    }

    /// Source expression for an exported module, e.g. `_modules.Counter`.
    pub fn module_ref(&self, name: &str) -> Option<&str> {
        self.module_refs.get(name).map(String::as_str)
    }
}

struct Registered {
    handler: Box<dyn TypeHandler>,
    module_refs: BTreeMap<String, String>,
}

/// Ordered registry of type handlers plus the modules bundle they export.
pub struct Serializer {
    handlers: Vec<Registered>,
    modules: Modules,
    modules_import: SymbolImport,
    modules_ref: String,
}

impl Serializer {
    /// Start building a serializer whose modules bundle is importable from
    /// `modules_import`.
    pub fn builder(modules_import: SymbolImport) -> SerializerBuilder {
        SerializerBuilder {
            handlers: Vec::new(),
            modules_import,
            modules_ref: "_modules".to_string(),
        }
    }

    /// Serialize a value into source text.
    pub fn serialize(&self, value: &Value) -> ProxyResult<String> {
        let registered = self
            .handlers
            .iter()
            .find(|r| r.handler.matches(value))
            .ok_or_else(|| ProxyError::Serialization {
                value: value.to_string(),
            })?;
        let cx = SerializeContext {
            serializer: self,
            module_refs: &registered.module_refs,
        };
        registered.handler.serialize(value, &cx)
    }

    /// Structural equality. Values no single handler accepts are unequal.
    pub fn equal(&self, a: &Value, b: &Value) -> bool {
        self.handlers
            .iter()
            .find(|r| r.handler.matches(a) && r.handler.matches(b))
            .map_or(false, |r| r.handler.equal(a, b, self))
    }

    /// Pairwise equality of two value lists.
    pub fn equal_all(&self, a: &[Value], b: &[Value]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| self.equal(x, y))
    }

    /// Name of the handler that would serialize `value`.
    pub fn handler_for(&self, value: &Value) -> Option<&str> {
        self.handlers
            .iter()
            .find(|r| r.handler.matches(value))
            .map(|r| r.handler.name())
    }

    pub fn modules(&self) -> &Modules {
        &self.modules
    }

    /// Where generated files import the modules bundle from.
    pub fn modules_import(&self) -> &SymbolImport {
        &self.modules_import
    }

    /// Local alias of the modules bundle in generated files.
    pub fn modules_ref(&self) -> &str {
        &self.modules_ref
    }
}

impl fmt::Debug for Serializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Serializer")
            .field(
                "handlers",
                &self.handlers.iter().map(|r| r.handler.name()).collect::<Vec<_>>(),
            )
            .field("modules", &self.modules)
            .field("modules_ref", &self.modules_ref)
            .finish()
    }
}

/// Builder for [`Serializer`].
pub struct SerializerBuilder {
    handlers: Vec<Box<dyn TypeHandler>>,
    modules_import: SymbolImport,
    modules_ref: String,
}

impl SerializerBuilder {
    /// Register a consumer handler. Handlers are tried in registration order,
    /// all of them before the built-in handlers.
    pub fn handler(mut self, handler: impl TypeHandler + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    /// Override the `_modules` alias used in generated files.
    pub fn modules_ref(mut self, modules_ref: impl Into<String>) -> Self {
        self.modules_ref = modules_ref.into();
        self
    }

    /// Apply the project settings that shape serialized output.
    pub fn configured(self, config: &ProxyConfig) -> Self {
        self.modules_ref(config.modules_ref.clone())
    }

    pub fn build(self) -> Serializer {
        let SerializerBuilder {
            mut handlers,
            modules_import,
            modules_ref,
        } = self;
        handlers.extend(base_handlers());

        let mut modules = Modules::new();
        let handlers = handlers
            .into_iter()
            .map(|handler| {
                let mut module_refs = BTreeMap::new();
                for symbol in handler.exported_symbols() {
                    module_refs.insert(symbol.name.clone(), format!("{}.{}", modules_ref, symbol.name));
                    modules.insert(symbol);
                }
                Registered {
                    handler,
                    module_refs,
                }
            })
            .collect();

        Serializer {
            handlers,
            modules,
            modules_import,
            modules_ref,
        }
    }
}

/// Multiset equality: every element on the left is paired with a distinct
/// equal element on the right.
pub(crate) fn multiset_equal<T>(left: &[T], right: &[T], eq: impl Fn(&T, &T) -> bool) -> bool {
    if left.len() != right.len() {
        return false;
    }
    let mut used = vec![false; right.len()];
    left.iter().all(|l| {
        let found = right
            .iter()
            .enumerate()
            .position(|(idx, r)| !used[idx] && eq(l, r));
        match found {
            Some(idx) => {
                used[idx] = true;
                true
            }
            None => false,
        }
    })
}
