use std::cell::RefCell;
use std::rc::Rc;

use super::support::{services_tag, Project, Storage};
use crate::{ProxyError, ProxyOptions, Rollback, UpdateMode, Value};

type Log = Rc<RefCell<Vec<String>>>;

/// A rollback that logs its hooks, and whether the snapshot file existed when
/// teardown ran.
fn logging_rollback(log: &Log, snapshot: std::path::PathBuf) -> Rollback {
    let setup_log = log.clone();
    let teardown_log = log.clone();
    Rollback::new()
        .setup(move || {
            setup_log.borrow_mut().push("setup".to_string());
            Ok(())
        })
        .teardown(move || {
            teardown_log
                .borrow_mut()
                .push(format!("teardown (snapshot written: {})", snapshot.exists()));
            Ok(())
        })
}

fn run(project: &Project, name: &str, mode: UpdateMode, log: &Log) -> Result<(), ProxyError> {
    let storage = Storage::with(&[("counter-1", Value::from(1))]);
    let cx = project.context(name, mode);
    let options = ProxyOptions::new(services_tag())
        .rollback(logging_rollback(log, project.snapshot_path(name)));
    let proxy = project.snapshots.acquire(&cx, storage.services(), options)?;
    log.borrow_mut().push("acquired".to_string());
    proxy
        .object("storage")?
        .call("get", vec![Value::from("counter-1")])?;
    cx.finish()
}

#[test]
fn recording_runs_setup_and_teardown_before_finalization() {
    let project = Project::new();
    let log = Log::default();
    run(&project, "rollback", UpdateMode::New, &log).unwrap();
    assert_eq!(
        *log.borrow(),
        vec![
            "setup",
            "acquired",
            "teardown (snapshot written: false)"
        ]
    );
    assert!(project.snapshot_path("rollback").exists());
}

#[test]
fn replay_runs_no_rollback_hooks() {
    let project = Project::new();
    run(&project, "replay_rollback", UpdateMode::New, &Log::default()).unwrap();

    let log = Log::default();
    run(&project, "replay_rollback", UpdateMode::New, &log).unwrap();
    assert_eq!(*log.borrow(), vec!["acquired"]);
}

#[test]
fn all_mode_always_rolls_back() {
    let project = Project::new();
    run(&project, "rerecord_rollback", UpdateMode::New, &Log::default()).unwrap();

    let log = Log::default();
    run(&project, "rerecord_rollback", UpdateMode::All, &log).unwrap();
    assert_eq!(
        *log.borrow(),
        vec![
            "setup",
            "acquired",
            "teardown (snapshot written: true)"
        ]
    );
}

#[test]
fn failing_setup_aborts_acquisition() {
    let project = Project::new();
    let cx = project.context("setup_fails", UpdateMode::New);
    let options = ProxyOptions::new(services_tag())
        .rollback(Rollback::new().setup(|| Err("database unavailable".into())));
    let err = project
        .snapshots
        .acquire(&cx, Storage::default().services(), options)
        .unwrap_err();
    assert!(matches!(err, ProxyError::Rollback { ref message } if message.contains("database unavailable")));
    // finalization was registered before the rollback ran
    cx.finish().unwrap();
}
