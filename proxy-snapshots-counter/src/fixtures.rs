//! Fixtures generated from live repositories.

use proxy_snapshots::Value;

use crate::composition_root::Repositories;
use crate::counter::Record;
use crate::errors::CounterResult;

/// Default location of the generated fixtures, relative to the crate root.
pub const FIXTURES_FILE: &str = "src/tests/fixtures.ts";

/// `{counter: {id1, id2}}` read from `repositories`.
pub fn build_fixtures(repositories: &Repositories) -> CounterResult<Value> {
    let id1 = repositories.counter.get("1")?;
    let id2 = repositories.counter.get("2")?;
    Ok(Value::object([(
        "counter",
        Value::object([("id1", id1.to_value()), ("id2", id2.to_value())]),
    )]))
}
