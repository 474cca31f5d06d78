//! The modules bundle referenced from generated code.
//!
//! Type handlers that rebuild domain values through constructors export a
//! [`Module`] under a name. Generated source refers to it as
//! `_modules.<Name>.<function>(...)`, and the source evaluator resolves
//! those calls against the merged [`Modules`] bundle.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::{ProxyError, ProxyResult};
use crate::value::Value;

/// A named constructor module (e.g. a domain class with a `create` function).
pub trait Module: Send + Sync {
    /// Invoke one of the module's functions with evaluated arguments.
    fn call(&self, function: &str, args: Vec<Value>) -> ProxyResult<Value>;
}

type ModuleFn = Box<dyn Fn(Vec<Value>) -> ProxyResult<Value> + Send + Sync>;

/// A [`Module`] assembled from closures.
pub struct FnModule {
    name: String,
    functions: BTreeMap<String, ModuleFn>,
}

impl FnModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: BTreeMap::new(),
        }
    }

    pub fn function(
        mut self,
        name: impl Into<String>,
        f: impl Fn(Vec<Value>) -> ProxyResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.functions.insert(name.into(), Box::new(f));
        self
    }
}

impl Module for FnModule {
    fn call(&self, function: &str, args: Vec<Value>) -> ProxyResult<Value> {
        let f = self.functions.get(function).ok_or_else(|| ProxyError::Module {
            module: self.name.clone(),
            message: format!("unknown function '{}'", function),
        })?;
        f(args)
    }
}

/// A module exported by a type handler.
#[derive(Clone)]
pub struct ExportedSymbol {
    pub name: String,
    pub module: Arc<dyn Module>,
}

impl ExportedSymbol {
    pub fn new(name: impl Into<String>, module: impl Module + 'static) -> Self {
        Self {
            name: name.into(),
            module: Arc::new(module),
        }
    }
}

/// All modules exported by a serializer's handlers, by name.
#[derive(Clone, Default)]
pub struct Modules {
    entries: BTreeMap<String, Arc<dyn Module>>,
}

impl Modules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a symbol; a later export with the same name replaces an earlier one.
    pub fn insert(&mut self, symbol: ExportedSymbol) {
        self.entries.insert(symbol.name, symbol.module);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Module>> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Call `<module>.<function>(args)`.
    pub fn call(&self, module: &str, function: &str, args: Vec<Value>) -> ProxyResult<Value> {
        let target = self.get(module).ok_or_else(|| ProxyError::Module {
            module: module.to_string(),
            message: "not exported by any serializer".to_string(),
        })?;
        target.call(function, args)
    }
}

impl fmt::Debug for Modules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}

impl FromIterator<ExportedSymbol> for Modules {
    fn from_iter<I: IntoIterator<Item = ExportedSymbol>>(iter: I) -> Self {
        let mut modules = Modules::new();
        for symbol in iter {
            modules.insert(symbol);
        }
        modules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point_module() -> FnModule {
        FnModule::new("Point").function("create", |mut args| {
            let attributes = args.pop().unwrap_or(Value::Undefined);
            Ok(Value::instance("Point", attributes))
        })
    }

    #[test]
    fn test_call_exported_function() {
        let modules: Modules = vec![ExportedSymbol::new("Point", point_module())]
            .into_iter()
            .collect();
        let value = modules
            .call("Point", "create", vec![Value::from(1)])
            .unwrap();
        assert_eq!(value, Value::instance("Point", Value::from(1)));
    }

    #[test]
    fn test_unknown_module_and_function() {
        let modules: Modules = vec![ExportedSymbol::new("Point", point_module())]
            .into_iter()
            .collect();
        assert!(matches!(
            modules.call("Line", "create", vec![]),
            Err(ProxyError::Module { .. })
        ));
        let err = modules.call("Point", "build", vec![]).unwrap_err();
        assert!(err.to_string().contains("unknown function 'build'"));
    }
}
