//! Type handlers for the domain: records are rebuilt through their
//! constructors and settled `Async` values through `success`/`error`.

use proxy_snapshots::{
    ExportedSymbol, FnModule, ProxyError, ProxyResult, SerializeContext, Serializer, TypeHandler,
    Value,
};

use crate::counter::{Async, Record};
use crate::errors::CounterResult;

#[derive(Clone, Copy)]
struct RecordType {
    class: &'static str,
    create: fn(&Value) -> CounterResult<Value>,
}

fn create_record<R: Record>(attributes: &Value) -> CounterResult<Value> {
    Ok(R::from_attributes(attributes)?.to_value())
}

fn module_error(module: &str, message: impl ToString) -> ProxyError {
    ProxyError::Module {
        module: module.to_string(),
        message: message.to_string(),
    }
}

/// Serializes [`Record`]s as `_modules.<Class>.create({...})`.
#[derive(Default)]
pub struct StructHandler {
    records: Vec<RecordType>,
}

impl StructHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record<R: Record>(mut self) -> Self {
        self.records.push(RecordType {
            class: R::CLASS,
            create: create_record::<R>,
        });
        self
    }

    fn is_record(&self, class: &str) -> bool {
        self.records.iter().any(|record| record.class == class)
    }
}

impl TypeHandler for StructHandler {
    fn name(&self) -> &str {
        "struct"
    }

    fn matches(&self, value: &Value) -> bool {
        value
            .as_instance()
            .map_or(false, |instance| self.is_record(instance.class()))
    }

    fn equal(&self, a: &Value, b: &Value, serializer: &Serializer) -> bool {
        match (a.as_instance(), b.as_instance()) {
            (Some(a), Some(b)) => {
                a.class() == b.class() && serializer.equal(a.attributes(), b.attributes())
            }
            _ => false,
        }
    }

    fn serialize(&self, value: &Value, cx: &SerializeContext<'_>) -> ProxyResult<String> {
        let instance = value.as_instance().ok_or_else(|| ProxyError::Serialization {
            value: value.to_string(),
        })?;
        let class_ref = cx
            .module_ref(instance.class())
            .ok_or_else(|| module_error(instance.class(), "record type not registered"))?;
        Ok(format!(
            "{}.create({})",
            class_ref,
            cx.serialize(instance.attributes())?
        ))
    }

    fn exported_symbols(&self) -> Vec<ExportedSymbol> {
        self.records
            .iter()
            .map(|record| {
                let RecordType { class, create } = *record;
                let module = FnModule::new(class).function("create", move |args: Vec<Value>| {
                    let attributes = args.into_iter().next().unwrap_or(Value::Undefined);
                    create(&attributes).map_err(|e| module_error(class, e))
                });
                ExportedSymbol::new(class, module)
            })
            .collect()
    }
}

/// Serializes settled [`Async`] values as `_modules.Async.success(...)` or
/// `_modules.Async.error("...")`.
pub struct AsyncHandler;

impl TypeHandler for AsyncHandler {
    fn name(&self) -> &str {
        "async"
    }

    fn matches(&self, value: &Value) -> bool {
        value
            .as_instance()
            .map_or(false, |instance| instance.class() == Async::CLASS)
    }

    fn equal(&self, a: &Value, b: &Value, serializer: &Serializer) -> bool {
        match (Async::from_value(a), Async::from_value(b)) {
            (Ok(Async::Success(a)), Ok(Async::Success(b))) => serializer.equal(&a, &b),
            (Ok(Async::Error(a)), Ok(Async::Error(b))) => a == b,
            _ => false,
        }
    }

    fn serialize(&self, value: &Value, cx: &SerializeContext<'_>) -> ProxyResult<String> {
        let async_ref = cx
            .module_ref(Async::CLASS)
            .ok_or_else(|| module_error(Async::CLASS, "not registered"))?;
        match Async::from_value(value).map_err(|e| module_error(Async::CLASS, e))? {
            Async::Success(inner) => Ok(format!("{}.success({})", async_ref, cx.serialize(&inner)?)),
            Async::Error(message) => Ok(format!(
                "{}.error({})",
                async_ref,
                cx.serialize(&Value::from(message))?
            )),
        }
    }

    fn exported_symbols(&self) -> Vec<ExportedSymbol> {
        let module = FnModule::new(Async::CLASS)
            .function("success", |args: Vec<Value>| {
                let value = args.into_iter().next().unwrap_or(Value::Undefined);
                Ok(Async::Success(value).to_value())
            })
            .function("error", |args: Vec<Value>| {
                let message = args
                    .first()
                    .and_then(Value::as_str)
                    .ok_or_else(|| module_error(Async::CLASS, "error expects a message"))?;
                Ok(Async::Error(message.to_string()).to_value())
            });
        vec![ExportedSymbol::new(Async::CLASS, module)]
    }
}
