//! Evaluation of parsed expressions into [`Value`]s.

use std::cell::RefCell;

use super::parser::{Expr, Program, PropKey};
use crate::errors::{ProxyError, ProxyResult};
use crate::modules::Modules;
use crate::value::{Key, Symbol, Value};

/// Largest distance from the epoch a date can represent, in milliseconds.
const MAX_TIME: f64 = 8.64e15;

/// Evaluation scope of one parsed module.
pub(crate) struct Env<'a> {
    program: &'a Program,
    modules: &'a Modules,
    modules_alias: String,
    resolving: RefCell<Vec<String>>,
}

impl<'a> Env<'a> {
    /// `modules_name` is the export the modules bundle is imported under;
    /// its local alias is taken from the module's imports, falling back to
    /// `default_alias`.
    pub fn new(
        program: &'a Program,
        modules: &'a Modules,
        modules_name: &str,
        default_alias: &str,
    ) -> Self {
        let modules_alias = program
            .imports()
            .flat_map(|import| import.names.iter())
            .find(|(exported, _)| exported == modules_name)
            .map_or_else(|| default_alias.to_string(), |(_, local)| local.clone());
        Self {
            program,
            modules,
            modules_alias,
            resolving: RefCell::new(Vec::new()),
        }
    }

    pub fn eval(&self, expr: &Expr) -> ProxyResult<Value> {
        match expr {
            Expr::Null => Ok(Value::Null),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Num(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::String(s.clone())),
            Expr::Ident(name) => self.ident(name),
            Expr::Neg(inner) => match self.eval(inner)? {
                Value::Number(n) => Ok(Value::Number(-n)),
                other => Err(ProxyError::eval(format!("cannot negate {}", other.kind()))),
            },
            Expr::Array(items) => Ok(Value::Array(self.eval_all(items)?)),
            Expr::Object(fields) => {
                let pairs = fields
                    .iter()
                    .map(|(key, value)| Ok((self.key(key)?, self.eval(value)?)))
                    .collect::<ProxyResult<Vec<_>>>()?;
                Ok(Value::Object(pairs))
            }
            Expr::Call(callee, args) => self.call(callee, self.eval_all(args)?),
            Expr::New(callee, args) => self.construct(callee, self.eval_all(args)?),
            Expr::Member(_, name) => Err(ProxyError::eval(format!(
                "member '{}' used outside a call",
                name
            ))),
            Expr::Arrow(source) => Err(ProxyError::eval(format!(
                "function '{}' is not a value",
                source
            ))),
        }
    }

    fn eval_all(&self, exprs: &[Expr]) -> ProxyResult<Vec<Value>> {
        exprs.iter().map(|expr| self.eval(expr)).collect()
    }

    fn ident(&self, name: &str) -> ProxyResult<Value> {
        match name {
            "undefined" => return Ok(Value::Undefined),
            "NaN" => return Ok(Value::Number(f64::NAN)),
            "Infinity" => return Ok(Value::Number(f64::INFINITY)),
            _ => {}
        }
        let expr = self
            .program
            .binding(name)
            .ok_or_else(|| ProxyError::eval(format!("'{}' is not defined", name)))?;
        if self.resolving.borrow().iter().any(|n| n == name) {
            return Err(ProxyError::eval(format!("'{}' refers to itself", name)));
        }
        self.resolving.borrow_mut().push(name.to_string());
        let value = self.eval(expr);
        self.resolving.borrow_mut().pop();
        value
    }

    fn key(&self, key: &PropKey) -> ProxyResult<Key> {
        match key {
            PropKey::Ident(name) | PropKey::Str(name) => Ok(Key::String(name.clone())),
            PropKey::Computed(expr) => match self.eval(expr)? {
                Value::String(s) => Ok(Key::String(s)),
                Value::Symbol(symbol) => Ok(Key::Symbol(symbol)),
                other => Err(ProxyError::eval(format!(
                    "computed key must be a string or symbol, got {}",
                    other.kind()
                ))),
            },
        }
    }

    fn call(&self, callee: &Expr, mut args: Vec<Value>) -> ProxyResult<Value> {
        let (target, function) = match callee {
            Expr::Member(target, function) => (target.as_ref(), function.as_str()),
            _ => return Err(ProxyError::eval("only member calls are supported")),
        };
        match (target, function) {
            (Expr::Ident(global), "resolve") if global == "Promise" => {
                let value = if args.is_empty() {
                    Value::Undefined
                } else {
                    args.swap_remove(0)
                };
                Ok(Value::promise(value))
            }
            (Expr::Ident(global), "for") if global == "Symbol" => match args.first() {
                Some(Value::String(description)) => Ok(Value::symbol_for(description.clone())),
                _ => Err(ProxyError::eval("Symbol.for expects a string")),
            },
            (Expr::Member(alias, module), function) => match alias.as_ref() {
                Expr::Ident(alias) if *alias == self.modules_alias => {
                    self.modules.call(module, function, args)
                }
                _ => Err(ProxyError::eval(format!(
                    "unknown call target for '{}'",
                    function
                ))),
            },
            (_, function) => Err(ProxyError::eval(format!(
                "unknown call target for '{}'",
                function
            ))),
        }
    }

    fn construct(&self, callee: &Expr, args: Vec<Value>) -> ProxyResult<Value> {
        let class = match callee {
            Expr::Ident(class) => class.as_str(),
            _ => return Err(ProxyError::eval("unsupported constructor")),
        };
        let mut args = args.into_iter();
        match (class, args.next()) {
            ("Date", Some(Value::Number(ms))) if ms.is_finite() && ms.abs() <= MAX_TIME => {
                Ok(Value::Date(ms.trunc() as i64))
            }
            ("Date", _) => Err(ProxyError::eval(
                "Date expects finite milliseconds since the epoch",
            )),
            ("Set", None) => Ok(Value::Set(Vec::new())),
            ("Set", Some(Value::Array(items))) => Ok(Value::Set(items)),
            ("Map", None) => Ok(Value::Map(Vec::new())),
            ("Map", Some(Value::Array(entries))) => entries
                .into_iter()
                .map(|entry| match entry {
                    Value::Array(pair) if pair.len() == 2 => {
                        let mut pair = pair.into_iter();
                        match (pair.next(), pair.next()) {
                            (Some(k), Some(v)) => Ok((k, v)),
                            _ => Err(ProxyError::eval("Map entries must be [key, value] pairs")),
                        }
                    }
                    _ => Err(ProxyError::eval("Map entries must be [key, value] pairs")),
                })
                .collect::<ProxyResult<Vec<_>>>()
                .map(Value::Map),
            (class, _) => Err(ProxyError::eval(format!("cannot construct '{}'", class))),
        }
    }
}
