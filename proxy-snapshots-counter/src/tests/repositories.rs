use std::cell::RefCell;
use std::fs;
use std::rc::Rc;

use proxy_snapshots::{load_fixtures, Rollback, UpdateMode};
use serde_json::json;

use super::support::{crate_file, LoggedStorage, Project};
use crate::testing::app_serializer;
use crate::{Counter, KeyValueStorage, Record, Services};

const TEST_FILE: &str = "src/tests/counter_repository.rs";

fn services(storage: &Rc<LoggedStorage>) -> Services {
    Services {
        storage: storage.clone(),
    }
}

#[test]
fn get_records_storage_then_replays_it() {
    let project = Project::new();

    let storage = Rc::new(LoggedStorage::default());
    let cx = project.context(TEST_FILE, "get", UpdateMode::New);
    let repositories = project
        .app
        .repositories_with_proxied_services(&cx, &services(&storage), None)
        .unwrap();
    assert_eq!(repositories.counter.get("id1").unwrap(), Counter::new("id1", 0));
    cx.finish().unwrap();
    assert_eq!(storage.log(), vec!["get counter-id1"]);

    let snapshot = fs::read_to_string(
        project.path("src/tests/__proxy-snapshots/counter_repository-Services-get.ts"),
    )
    .unwrap();
    insta::assert_snapshot!(snapshot, @r###"
    import { Services } from "../../composition_root";
    import { modules as _modules } from "../../testing";

    export default function get() {
        return [
            {
                type: "call",
                fn: (obj: Services) => obj.storage.get,
                args: ["counter-id1"],
                returns: undefined,
            },
        ];
    }
    "###);

    // a stored value would change the result, but replay never reads it
    let storage = Rc::new(LoggedStorage::default());
    storage.set("counter-id1", json!(5)).unwrap();
    storage.log.borrow_mut().clear();
    let cx = project.context(TEST_FILE, "get", UpdateMode::None);
    let repositories = project
        .app
        .repositories_with_proxied_services(&cx, &services(&storage), None)
        .unwrap();
    assert_eq!(repositories.counter.get("id1").unwrap(), Counter::new("id1", 0));
    cx.finish().unwrap();
    assert!(storage.log().is_empty());
}

#[test]
fn save_records_and_rolls_back() {
    let project = Project::new();
    let fixtures = load_fixtures(&crate_file("src/tests/fixtures.ts"), &app_serializer()).unwrap();
    let counter = fixtures
        .get("counter")
        .and_then(|counters| counters.get("id1"))
        .map(Counter::from_value)
        .unwrap()
        .unwrap();

    let storage = Rc::new(LoggedStorage::default());
    let events = Rc::new(RefCell::new(Vec::new()));
    let rollback = {
        let setup_events = events.clone();
        let teardown_events = events.clone();
        let teardown_storage = storage.clone();
        Rollback::new()
            .setup(move || {
                setup_events.borrow_mut().push("setup");
                Ok(())
            })
            .teardown(move || {
                teardown_events.borrow_mut().push("teardown");
                teardown_storage.set("counter-1", json!(null))?;
                Ok(())
            })
    };

    let cx = project.context(TEST_FILE, "save", UpdateMode::New);
    let repositories = project
        .app
        .repositories_with_proxied_services(&cx, &services(&storage), Some(rollback))
        .unwrap();
    assert_eq!(*events.borrow(), vec!["setup"]);
    assert_eq!(repositories.counter.save(&counter).unwrap(), counter);
    cx.finish().unwrap();

    assert_eq!(*events.borrow(), vec!["setup", "teardown"]);
    assert_eq!(storage.log(), vec!["set counter-1 0", "set counter-1 null"]);
    let snapshot = fs::read_to_string(
        project.path("src/tests/__proxy-snapshots/counter_repository-Services-save.ts"),
    )
    .unwrap();
    assert!(snapshot.contains(r#"args: ["counter-1", 0]"#));

    // replaying runs neither the real storage nor the rollback
    let storage = Rc::new(LoggedStorage::default());
    let cx = project.context(TEST_FILE, "save", UpdateMode::New);
    let rollback = Rollback::new().setup(|| Err("must not run".into()));
    let repositories = project
        .app
        .repositories_with_proxied_services(&cx, &services(&storage), Some(rollback))
        .unwrap();
    repositories.counter.save(&counter).unwrap();
    cx.finish().unwrap();
    assert!(storage.log().is_empty());
}
