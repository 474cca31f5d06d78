//! The record/replay proxy engine.
//!
//! [`ProxySnapshots::acquire`] wraps an [`Object`] graph for the running
//! test. Every method reached through the returned [`Proxy`] is intercepted:
//! depending on the update mode and the loaded snapshot, a call is replayed
//! from the snapshot, recorded by invoking the real method, or rejected with
//! a [`SnapshotMismatch`](crate::SnapshotMismatch). At teardown the calls made
//! are rendered and checked against the snapshot file.

mod engine;
mod object;

pub use engine::{Accessed, Proxy, ProxyMethod, ProxyOptions, ProxySnapshots};
pub use object::{Member, Method, Node, Object};
