use std::fs;

use super::support::{services_tag, Project, Storage};
use crate::{CurrentTestAdapter, ProxyError, ProxyOptions, UpdateMode, Value};

#[test]
fn all_mode_rerecords_over_existing_snapshot() {
    let project = Project::new();
    for (mode, stored) in [(UpdateMode::New, 1), (UpdateMode::All, 2)] {
        let storage = Storage::with(&[("counter-1", Value::from(stored))]);
        let cx = project.context("rerecord", mode);
        let proxy = project
            .snapshots
            .acquire(&cx, storage.services(), ProxyOptions::new(services_tag()))
            .unwrap();
        let value = proxy
            .object("storage")
            .unwrap()
            .call("get", vec![Value::from("counter-1")])
            .unwrap();
        cx.finish().unwrap();

        assert_eq!(value, Value::from(stored));
        assert_eq!(storage.invocations(), vec!["get counter-1"]);
    }

    let contents = fs::read_to_string(project.snapshot_path("rerecord")).unwrap();
    assert!(contents.contains("returns: 2"));
}

#[test]
fn calls_are_recorded_in_order() {
    let project = Project::new();
    let storage = Storage::default();
    let cx = project.context("sequence", UpdateMode::New);
    let proxy = project
        .snapshots
        .acquire(&cx, storage.services(), ProxyOptions::new(services_tag()))
        .unwrap();
    let kv = proxy.object("storage").unwrap();
    kv.call("set", vec![Value::from("counter-1"), Value::from(5)])
        .unwrap();
    assert_eq!(
        kv.call("get", vec![Value::from("counter-1")]).unwrap(),
        Value::from(5)
    );
    assert_eq!(
        kv.call("get", vec![Value::from("counter-2")]).unwrap(),
        Value::Undefined
    );
    cx.finish().unwrap();

    let loaded = project
        .snapshots
        .store()
        .get(
            &project.context("sequence", UpdateMode::None).current_test().unwrap(),
            &services_tag(),
        )
        .unwrap()
        .unwrap();
    let described = loaded.iter().map(|call| call.describe()).collect::<Vec<_>>();
    assert_eq!(
        described,
        vec![
            "obj.storage.set(\"counter-1\", 5)",
            "obj.storage.get(\"counter-1\")",
            "obj.storage.get(\"counter-2\")",
        ]
    );
    assert_eq!(loaded[1].returns, Some(Value::from(5)));
    assert_eq!(loaded[2].returns, Some(Value::Undefined));
}

#[test]
fn repeated_recordings_are_identical() {
    let record = || {
        let project = Project::new();
        let storage = Storage::with(&[("counter-1", Value::from(3))]);
        let cx = project.context("repeatable", UpdateMode::New);
        let proxy = project
            .snapshots
            .acquire(&cx, storage.services(), ProxyOptions::new(services_tag()))
            .unwrap();
        let kv = proxy.object("storage").unwrap();
        kv.call("set", vec![Value::from("counter-2"), Value::object([("n", Value::from(1))])])
            .unwrap();
        kv.call("get", vec![Value::from("counter-1")]).unwrap();
        kv.call("get", vec![Value::from("counter-2")]).unwrap();
        cx.finish().unwrap();
        fs::read_to_string(project.snapshot_path("repeatable")).unwrap()
    };

    let first = record();
    let second = record();
    assert_eq!(first, second);
    assert!(first.contains("returns: { n: 1 }"));
}

#[test]
fn unused_proxy_writes_empty_stub() {
    let project = Project::new();
    let cx = project.context("unused", UpdateMode::New);
    project
        .snapshots
        .acquire(&cx, Storage::default().services(), ProxyOptions::new(services_tag()))
        .unwrap();
    cx.finish().unwrap();

    assert_eq!(
        fs::read_to_string(project.snapshot_path("unused")).unwrap(),
        "export default function get() {\n    return [];\n}\n"
    );
}

#[test]
fn corrupt_snapshot_is_replaced_by_a_fresh_recording() {
    let project = Project::new();
    let path = project.snapshot_path("self_heal");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "export default function get() { return [{type: \"call\", fn: ").unwrap();

    let storage = Storage::with(&[("counter-1", Value::from(7))]);
    let cx = project.context("self_heal", UpdateMode::New);
    let proxy = project
        .snapshots
        .acquire(&cx, storage.services(), ProxyOptions::new(services_tag()))
        .unwrap();
    assert!(!path.exists());

    let value = proxy
        .object("storage")
        .unwrap()
        .call("get", vec![Value::from("counter-1")])
        .unwrap();
    cx.finish().unwrap();

    assert_eq!(value, Value::from(7));
    assert_eq!(storage.invocations(), vec!["get counter-1"]);
    assert!(fs::read_to_string(&path).unwrap().contains("returns: 7"));
}

#[test]
fn failing_method_is_not_recorded() {
    let project = Project::new();
    let storage = Storage::default();
    let cx = project.context("method_error", UpdateMode::New);
    let proxy = project
        .snapshots
        .acquire(&cx, storage.services(), ProxyOptions::new(services_tag()))
        .unwrap();
    let err = proxy
        .object("storage")
        .unwrap()
        .call("get", vec![Value::from(1)])
        .unwrap_err();
    assert!(matches!(err, ProxyError::Method { .. }));
    assert!(proxy.calls().is_empty());
    cx.finish().unwrap();
}
