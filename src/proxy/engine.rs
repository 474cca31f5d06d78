//! Per-acquisition recording and replay.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use tracing::{debug, warn};

use super::object::{Member, Object};
use crate::entities::{Call, CurrentTest, Rollback, Snapshot, SymbolImport, UpdateMode};
use crate::errors::{ProxyError, ProxyResult, SnapshotMismatch};
use crate::harness::CurrentTestAdapter;
use crate::serializer::Serializer;
use crate::store::SnapshotStore;
use crate::value::Value;

/// What to do with one intercepted call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Decision {
    /// Return the recorded result without invoking the real method.
    Replay(Value),
    /// Invoke the real method and record the result.
    Record,
    /// Fail; `expected` describes the recorded call at the same index.
    Mismatch { expected: Option<String> },
}

/// Decide how to handle `call`, the `index`-th call of this acquisition.
///
/// | mode | no snapshot | recorded call matches | otherwise |
/// |------|-------------|-----------------------|-----------|
/// | none | mismatch    | replay                | mismatch  |
/// | new  | record      | replay                | mismatch  |
/// | all  | record      | record                | record    |
pub(crate) fn decide(
    mode: UpdateMode,
    snapshot: Option<&[Call]>,
    index: usize,
    call: &Call,
    serializer: &Serializer,
) -> Decision {
    let recorded = snapshot.and_then(|s| s.get(index));
    if mode != UpdateMode::All {
        if let Some(recorded) = recorded.filter(|r| r.matches(call, serializer)) {
            return Decision::Replay(recorded.returns.clone().unwrap_or(Value::Undefined));
        }
    }
    match (mode, snapshot) {
        (UpdateMode::All, _) | (UpdateMode::New, None) => Decision::Record,
        _ => Decision::Mismatch {
            expected: recorded.map(Call::describe),
        },
    }
}

/// State owned by one acquisition: the loaded snapshot and the calls made.
struct Session {
    test: CurrentTest,
    type_tag: SymbolImport,
    store: Arc<SnapshotStore>,
    snapshot: Option<Snapshot>,
    calls: Vec<Call>,
}

impl Session {
    fn finalize(&self, adapter: &dyn CurrentTestAdapter) -> ProxyResult<()> {
        let expectation = self.store.render_expectation(
            &self.test,
            &self.type_tag,
            self.snapshot.as_ref(),
            &self.calls,
        )?;
        adapter.expect_to_match_snapshot(&expectation.contents, &expectation.path)
    }
}

/// Options for [`ProxySnapshots::acquire`].
#[derive(Debug)]
pub struct ProxyOptions {
    /// Declared type of the proxied object; names the snapshot file and is
    /// imported by it.
    pub type_tag: SymbolImport,
    pub rollback: Option<Rollback>,
}

impl ProxyOptions {
    pub fn new(type_tag: SymbolImport) -> Self {
        Self {
            type_tag,
            rollback: None,
        }
    }

    pub fn rollback(mut self, rollback: Rollback) -> Self {
        self.rollback = Some(rollback);
        self
    }
}

/// Entry point: wraps object graphs for the running test.
#[derive(Debug, Clone)]
pub struct ProxySnapshots {
    store: Arc<SnapshotStore>,
}

impl ProxySnapshots {
    pub fn new(store: Arc<SnapshotStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Wrap `target` for the test `adapter` is running.
    ///
    /// Loads the snapshot once, registers finalization on teardown, and when
    /// the test records, runs the rollback setup and registers its teardown
    /// so that it runs before finalization.
    pub fn acquire(
        &self,
        adapter: &dyn CurrentTestAdapter,
        target: Rc<dyn Object>,
        options: ProxyOptions,
    ) -> ProxyResult<Proxy> {
        let mut test = adapter.current_test()?;
        test.update_mode = adapter.update_mode();
        let snapshot = self.store.get(&test, &options.type_tag)?;
        let recording = test.records(snapshot.is_some());
        debug!(
            test = %test.name,
            type_tag = %options.type_tag.name,
            mode = %test.update_mode,
            recording,
            "acquired proxy"
        );

        let session = Rc::new(RefCell::new(Session {
            test,
            type_tag: options.type_tag,
            store: self.store.clone(),
            snapshot,
            calls: Vec::new(),
        }));

        let finalizing = session.clone();
        adapter.run_on_teardown(Box::new(move |adapter: &dyn CurrentTestAdapter| {
            let result = finalizing.borrow().finalize(adapter);
            result
        }));

        if recording {
            if let Some(mut rollback) = options.rollback {
                rollback.run_setup()?;
                if let Some(teardown) = rollback.teardown.take() {
                    adapter.run_on_teardown(Box::new(move |_: &dyn CurrentTestAdapter| {
                        teardown().map_err(|e| ProxyError::Rollback {
                            message: format!("teardown: {}", e),
                        })
                    }));
                }
            }
        }

        Ok(Proxy {
            root: target,
            path: Vec::new(),
            session,
        })
    }
}

/// A proxied object (the root or a nested aggregate).
#[derive(Clone)]
pub struct Proxy {
    root: Rc<dyn Object>,
    path: Vec<String>,
    session: Rc<RefCell<Session>>,
}

/// The result of accessing a member through a [`Proxy`].
pub enum Accessed {
    Object(Proxy),
    Method(ProxyMethod),
    Value(Value),
}

impl Proxy {
    /// Path from the proxied root to this object.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Access a member: aggregates come back wrapped, methods intercepted,
    /// anything else as a plain value.
    pub fn get(&self, name: &str) -> ProxyResult<Accessed> {
        let object = resolve(&*self.root, &self.path)?;
        let path = self.child_path(name);
        match object.member(name) {
            Some(Member::Object(_)) => Ok(Accessed::Object(Proxy {
                root: self.root.clone(),
                path,
                session: self.session.clone(),
            })),
            Some(Member::Method(_)) => Ok(Accessed::Method(ProxyMethod {
                root: self.root.clone(),
                path,
                session: self.session.clone(),
            })),
            Some(Member::Value(value)) => Ok(Accessed::Value(value)),
            None => Err(ProxyError::MissingMember {
                path: path.join("."),
                message: "no such member".to_string(),
            }),
        }
    }

    /// A nested aggregate.
    pub fn object(&self, name: &str) -> ProxyResult<Proxy> {
        match self.get(name)? {
            Accessed::Object(proxy) => Ok(proxy),
            _ => Err(self.wrong_kind(name, "an object")),
        }
    }

    /// An intercepted method.
    pub fn method(&self, name: &str) -> ProxyResult<ProxyMethod> {
        match self.get(name)? {
            Accessed::Method(method) => Ok(method),
            _ => Err(self.wrong_kind(name, "a method")),
        }
    }

    /// A plain member value.
    pub fn value(&self, name: &str) -> ProxyResult<Value> {
        match self.get(name)? {
            Accessed::Value(value) => Ok(value),
            _ => Err(self.wrong_kind(name, "a value")),
        }
    }

    /// Shorthand for `self.method(name)?.call(args)`.
    pub fn call(&self, name: &str, args: Vec<Value>) -> ProxyResult<Value> {
        self.method(name)?.call(args)
    }

    /// Calls made through this acquisition so far.
    pub fn calls(&self) -> Vec<Call> {
        self.session.borrow().calls.clone()
    }

    fn child_path(&self, name: &str) -> Vec<String> {
        let mut path = self.path.clone();
        path.push(name.to_string());
        path
    }

    fn wrong_kind(&self, name: &str, expected: &str) -> ProxyError {
        ProxyError::MissingMember {
            path: self.child_path(name).join("."),
            message: format!("not {}", expected),
        }
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy").field("path", &self.path).finish()
    }
}

/// An intercepted method of a proxied object.
#[derive(Clone)]
pub struct ProxyMethod {
    root: Rc<dyn Object>,
    path: Vec<String>,
    session: Rc<RefCell<Session>>,
}

impl ProxyMethod {
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Replay, record or reject this call according to the update mode and
    /// the snapshot entry at the current position.
    pub fn call(&self, args: Vec<Value>) -> ProxyResult<Value> {
        let call = Call::new(self.path.clone(), args);
        let (decision, index) = {
            let session = self.session.borrow();
            let index = session.calls.len();
            let decision = decide(
                session.test.update_mode,
                session.snapshot.as_deref(),
                index,
                &call,
                session.store.serializer(),
            );
            (decision, index)
        };

        match decision {
            Decision::Replay(returns) => {
                debug!(index, call = %call.describe(), "replaying call");
                self.session
                    .borrow_mut()
                    .calls
                    .push(call.with_returns(returns.clone()));
                Ok(returns)
            }
            Decision::Record => {
                debug!(index, call = %call.describe(), "recording call");
                // the session is not borrowed while the real method runs
                let returns = self.invoke(call.args.clone())?;
                self.session
                    .borrow_mut()
                    .calls
                    .push(call.with_returns(returns.clone()));
                Ok(returns)
            }
            Decision::Mismatch { expected } => {
                let mismatch = SnapshotMismatch {
                    index,
                    actual: call.describe(),
                    expected,
                };
                warn!("{}", mismatch);
                let mut session = self.session.borrow_mut();
                let remaining = session
                    .snapshot
                    .as_ref()
                    .and_then(|s| s.get(index..))
                    .map(<[Call]>::to_vec)
                    .unwrap_or_default();
                session.calls.push(call);
                session.calls.extend(remaining);
                Err(mismatch.into())
            }
        }
    }

    fn invoke(&self, args: Vec<Value>) -> ProxyResult<Value> {
        let (name, parent) = match self.path.split_last() {
            Some(split) => split,
            None => {
                return Err(ProxyError::MissingMember {
                    path: String::new(),
                    message: "empty method path".to_string(),
                })
            }
        };
        let object = resolve(&*self.root, parent)?;
        match object.member(name) {
            Some(Member::Method(method)) => method.invoke(args),
            _ => Err(ProxyError::MissingMember {
                path: self.path.join("."),
                message: "not a method".to_string(),
            }),
        }
    }
}

impl fmt::Debug for ProxyMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyMethod")
            .field("path", &self.path)
            .finish()
    }
}

fn resolve<'a>(root: &'a dyn Object, path: &[String]) -> ProxyResult<&'a dyn Object> {
    let mut current = root;
    for (idx, name) in path.iter().enumerate() {
        current = match current.member(name) {
            Some(Member::Object(object)) => object,
            Some(_) => {
                return Err(ProxyError::MissingMember {
                    path: path[..=idx].join("."),
                    message: "not an object".to_string(),
                })
            }
            None => {
                return Err(ProxyError::MissingMember {
                    path: path[..=idx].join("."),
                    message: "no such member".to_string(),
                })
            }
        };
    }
    Ok(current)
}
