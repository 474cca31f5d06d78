//! Object graphs the engine can wrap.
//!
//! Rust has no runtime property lookup, so a proxied target describes its
//! members through [`Object`]: nested aggregates, callable methods, and plain
//! values. [`Node`] assembles such a graph from closures.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::errors::ProxyResult;
use crate::value::Value;

/// A member reached by name.
pub enum Member<'a> {
    /// A nested aggregate (e.g. `repositories.counter`).
    Object(&'a dyn Object),
    Method(&'a dyn Method),
    /// Anything else, returned as is.
    Value(Value),
}

impl fmt::Debug for Member<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Object(_) => write!(f, "Member::Object"),
            Member::Method(_) => write!(f, "Member::Method"),
            Member::Value(value) => write!(f, "Member::Value({})", value),
        }
    }
}

/// An object whose members can be looked up by name.
pub trait Object {
    fn member(&self, name: &str) -> Option<Member<'_>>;
}

/// A callable member.
pub trait Method {
    fn invoke(&self, args: Vec<Value>) -> ProxyResult<Value>;
}

impl<F> Method for F
where
    F: Fn(Vec<Value>) -> ProxyResult<Value>,
{
    fn invoke(&self, args: Vec<Value>) -> ProxyResult<Value> {
        self(args)
    }
}

impl<T: Object + ?Sized> Object for Rc<T> {
    fn member(&self, name: &str) -> Option<Member<'_>> {
        (**self).member(name)
    }
}

impl<T: Object + ?Sized> Object for Box<T> {
    fn member(&self, name: &str) -> Option<Member<'_>> {
        (**self).member(name)
    }
}

enum Entry {
    Object(Box<dyn Object>),
    Method(Box<dyn Method>),
    Value(Value),
}

/// An [`Object`] built from named children, methods and values.
///
/// ```
/// use proxy_snapshots::{Node, Value};
///
/// let services = Node::new().child(
///     "storage",
///     Node::new().method("get", |_args: Vec<Value>| Ok(Value::Undefined)),
/// );
/// # let _ = services;
/// ```
#[derive(Default)]
pub struct Node {
    members: BTreeMap<String, Entry>,
}

impl Node {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child(mut self, name: impl Into<String>, object: impl Object + 'static) -> Self {
        self.members
            .insert(name.into(), Entry::Object(Box::new(object)));
        self
    }

    pub fn method(
        mut self,
        name: impl Into<String>,
        method: impl Fn(Vec<Value>) -> ProxyResult<Value> + 'static,
    ) -> Self {
        self.members
            .insert(name.into(), Entry::Method(Box::new(method)));
        self
    }

    pub fn value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.members.insert(name.into(), Entry::Value(value.into()));
        self
    }
}

impl Object for Node {
    fn member(&self, name: &str) -> Option<Member<'_>> {
        self.members.get(name).map(|entry| match entry {
            Entry::Object(object) => Member::Object(&**object),
            Entry::Method(method) => Member::Method(&**method),
            Entry::Value(value) => Member::Value(value.clone()),
        })
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.members.keys()).finish()
    }
}
