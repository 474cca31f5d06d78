//! Reading generated source back into values.
//!
//! Snapshot and fixture files are written as small source modules. Loading
//! one means parsing it with [`SourceModule::parse`] and evaluating its
//! default export against a [`Serializer`]'s modules bundle, so
//! `_modules.Counter.create({...})` rebuilds a real domain value.

mod eval;
mod lexer;
mod parser;

pub(crate) use lexer::{tokenize, Token, TokenKind};

use std::path::Path;

use tracing::debug;

use crate::accessor;
use crate::entities::{Call, Snapshot};
use crate::errors::{ProxyError, ProxyResult};
use crate::serializer::Serializer;
use crate::value::Value;
use eval::Env;
use parser::{Expr, Program, PropKey};

/// A parsed snapshot or fixtures module.
#[derive(Debug, Clone)]
pub struct SourceModule {
    program: Program,
}

impl SourceModule {
    pub fn parse(text: &str) -> ProxyResult<Self> {
        Ok(Self {
            program: parser::parse(text)?,
        })
    }

    pub fn read(path: &Path) -> ProxyResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ProxyError::io(path, e))?;
        debug!(path = %path.display(), "parsing source module");
        Self::parse(&text)
    }

    /// Module paths this module imports from, in order.
    pub fn import_paths(&self) -> Vec<&str> {
        self.program.imports().map(|i| i.from.as_str()).collect()
    }

    fn env<'a>(&'a self, serializer: &'a Serializer) -> Env<'a> {
        Env::new(
            &self.program,
            serializer.modules(),
            &serializer.modules_import().name,
            serializer.modules_ref(),
        )
    }

    /// Evaluate the default export.
    pub fn default_value(&self, serializer: &Serializer) -> ProxyResult<Value> {
        self.env(serializer).eval(self.program.default_export()?)
    }

    /// Read the default export as a list of call descriptors.
    pub fn snapshot(&self, serializer: &Serializer) -> ProxyResult<Snapshot> {
        let env = self.env(serializer);
        let entries = match self.program.default_export()? {
            Expr::Array(entries) => entries,
            _ => return Err(ProxyError::eval("snapshot must export an array of calls")),
        };
        entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                read_call(&env, entry).map_err(|e| ProxyError::eval(format!("entry {}: {}", idx, e)))
            })
            .collect()
    }
}

fn read_call(env: &Env<'_>, entry: &Expr) -> ProxyResult<Call> {
    let fields = match entry {
        Expr::Object(fields) => fields,
        _ => return Err(ProxyError::eval("call descriptor must be an object")),
    };
    let field = |name: &str| {
        fields.iter().find_map(|(key, value)| match key {
            PropKey::Ident(k) | PropKey::Str(k) if k == name => Some(value),
            _ => None,
        })
    };

    match field("type") {
        Some(Expr::Str(kind)) if kind == "call" => {}
        _ => return Err(ProxyError::eval("descriptor type must be \"call\"")),
    }
    let path = match field("fn") {
        Some(Expr::Arrow(source)) => accessor::decode(source)?,
        _ => return Err(ProxyError::eval("descriptor fn must be an accessor function")),
    };
    let args = match field("args").map(|args| env.eval(args)).transpose()? {
        Some(Value::Array(args)) => args,
        None => Vec::new(),
        Some(other) => {
            return Err(ProxyError::eval(format!(
                "descriptor args must be an array, got {}",
                other.kind()
            )))
        }
    };
    let returns = match field("returns") {
        Some(expr) => env.eval(expr)?,
        None => Value::Undefined,
    };
    Ok(Call::new(path, args).with_returns(returns))
}
