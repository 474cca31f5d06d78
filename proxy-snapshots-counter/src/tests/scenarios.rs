use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use proxy_snapshots::{
    format_source, generate, load_fixtures, FixturesFile, ProxyConfig, ProxyError, UpdateMode,
    Value, CONFIG_FILE,
};

use super::support::{LoggedStorage, Project};
use crate::testing::{app_serializer, configured_serializer, AppProxySnapshots};
use crate::{
    get_composition_root, get_repositories, Async, Counter, CounterError, InMemoryKeyValueStorage,
    Record, Repositories, Services,
};

const TEST_FILE: &str = "src/tests/usecases.rs";

/// Record `get("id1") -> Counter { id: "id1", value: 0 }` for `name`.
fn write_get_snapshot(project: &Project, name: &str) {
    let source = r#"import { Repositories } from "../../composition_root";
import { modules as _modules } from "../../testing";

export default function get() { return [{type: "call", fn: (obj: Repositories) => obj.counter.get, args: ["id1"], returns: _modules.Async.success(_modules.Counter.create({id: "id1", value: 0}))}]; }
"#;
    let path = project.path(&format!(
        "src/tests/__proxy-snapshots/usecases-Repositories-{}.ts",
        name
    ));
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let formatted = format_source(source, &ProxyConfig::standard().format).unwrap();
    fs::write(path, formatted).unwrap();
}

fn real_repositories(storage: &Rc<LoggedStorage>) -> Repositories {
    get_repositories(&Services {
        storage: storage.clone(),
    })
}

#[test]
fn recorded_counter_is_replayed_without_touching_storage() {
    let project = Project::new();
    write_get_snapshot(&project, "returns_counter_by_id");

    let storage = Rc::new(LoggedStorage::default());
    let cx = project.context(TEST_FILE, "returns_counter_by_id", UpdateMode::None);
    let root = project
        .app
        .composition_root_with_proxied_repos(&cx, &real_repositories(&storage))
        .unwrap();

    let counter = root.counters.get.execute("id1").unwrap();
    assert_eq!(counter, Counter::new("id1", 0));
    assert!(storage.log().is_empty());
    cx.finish().unwrap();
}

#[test]
fn unrecorded_id_fails_at_index_zero() {
    let project = Project::new();
    write_get_snapshot(&project, "asks_for_another_id");

    let storage = Rc::new(LoggedStorage::default());
    let cx = project.context(TEST_FILE, "asks_for_another_id", UpdateMode::None);
    let root = project
        .app
        .composition_root_with_proxied_repos(&cx, &real_repositories(&storage))
        .unwrap();

    match root.counters.get.execute("id2") {
        Err(CounterError::Proxy(ProxyError::SnapshotMismatch(mismatch))) => {
            assert_eq!(mismatch.index, 0);
            assert_eq!(mismatch.actual, r#"obj.counter.get("id2")"#);
        }
        other => panic!("expected a snapshot mismatch, got {:?}", other),
    }
    assert!(storage.log().is_empty());
    assert!(matches!(
        cx.finish(),
        Err(ProxyError::SnapshotAssertion { .. })
    ));
}

#[test]
fn generated_fixtures_rebuild_records() {
    let project = Project::new();
    let serializer = Arc::new(app_serializer());
    let file = FixturesFile::new(
        serializer.clone(),
        ProxyConfig::standard().with_project_root(project.dir.path()),
    );
    let path = project.path("src/tests/fixtures.ts");

    let repositories = get_repositories(&Services {
        storage: Rc::new(InMemoryKeyValueStorage::new()),
    });
    let produced = generate(
        &path,
        || {
            let counter = repositories.counter.get("1")?;
            Ok(Value::object([(
                "counter",
                Value::object([("id1", counter.to_value())]),
            )]))
        },
        &file,
    )
    .unwrap();

    let contents = fs::read_to_string(&path).unwrap();
    assert!(contents.starts_with("import { modules as _modules } from \"../testing\";\n"));
    assert!(contents.contains(r#"id1: _modules.Counter.create({ id: "1", value: 0 })"#));
    assert!(contents.ends_with("export default fixtures;\n"));

    let loaded = load_fixtures(&path, &serializer).unwrap();
    assert!(serializer.equal(&loaded, &produced));
    let id1 = loaded
        .get("counter")
        .and_then(|counters| counters.get("id1"))
        .unwrap();
    assert!(id1.as_instance().is_some());
    assert_eq!(Counter::from_value(id1).unwrap(), Counter::new("1", 0));
}

#[test]
fn proxied_use_cases_record_settled_results() {
    let project = Project::new();
    let storage = Rc::new(LoggedStorage::default());
    let root = get_composition_root(&real_repositories(&storage));

    let cx = project.context(TEST_FILE, "use_cases", UpdateMode::New);
    let proxy = project.app.proxied_composition_root(&cx, &root).unwrap();
    let settled = proxy
        .object("counters")
        .unwrap()
        .object("get")
        .unwrap()
        .call("execute", vec!["3".into()])
        .unwrap();
    cx.finish().unwrap();

    assert_eq!(
        Async::from_value(&settled).unwrap(),
        Async::Success(Counter::new("3", 0).to_value())
    );
    let snapshot = fs::read_to_string(
        project.path("src/tests/__proxy-snapshots/usecases-CompositionRoot-use_cases.ts"),
    )
    .unwrap();
    assert!(snapshot.contains(
        r#"returns: _modules.Async.success(_modules.Counter.create({ id: "3", value: 0 }))"#
    ));
    assert_eq!(storage.log(), vec!["get counter-3"]);
}

#[test]
fn configured_modules_ref_reaches_generated_files() {
    let project = Project::new();
    fs::write(project.path(CONFIG_FILE), "modules_ref = \"$m\"\n").unwrap();
    let app = AppProxySnapshots::new(project.dir.path()).unwrap();
    let storage = Rc::new(LoggedStorage::default());
    let root = get_composition_root(&real_repositories(&storage));

    for mode in [UpdateMode::New, UpdateMode::None] {
        let cx = project.context(TEST_FILE, "aliased", mode);
        let settled = app
            .proxied_composition_root(&cx, &root)
            .unwrap()
            .object("counters")
            .unwrap()
            .object("get")
            .unwrap()
            .call("execute", vec!["3".into()])
            .unwrap();
        cx.finish().unwrap();
        assert_eq!(
            Async::from_value(&settled).unwrap(),
            Async::Success(Counter::new("3", 0).to_value())
        );
    }
    // recorded once, replayed through the aliased import
    assert_eq!(storage.log(), vec!["get counter-3"]);

    let snapshot = fs::read_to_string(
        project.path("src/tests/__proxy-snapshots/usecases-CompositionRoot-aliased.ts"),
    )
    .unwrap();
    assert!(snapshot.contains("import { modules as $m } from \"../../testing\";\n"));
    assert!(snapshot
        .contains(r#"returns: $m.Async.success($m.Counter.create({ id: "3", value: 0 }))"#));

    let config = ProxyConfig::from_project_root(project.dir.path()).unwrap();
    let file = FixturesFile::new(Arc::new(configured_serializer(&config)), config);
    let rendered = file
        .render(
            Path::new("src/tests/fixtures.ts"),
            &Value::object([("id1", Counter::new("1", 0).to_value())]),
        )
        .unwrap();
    assert!(rendered.starts_with("import { modules as $m } from \"../testing\";\n"));
    assert!(rendered.contains(r#"id1: $m.Counter.create({ id: "1", value: 0 })"#));
    assert!(!rendered.contains("_modules"));
}
