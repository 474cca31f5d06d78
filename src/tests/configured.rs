use std::fs;
use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use super::support::services_tag;
use crate::{
    load_fixtures, Call, CurrentTest, FixturesFile, FixturesRepository, ProxyConfig, Serializer,
    SnapshotStore, SymbolImport, UpdateMode, Value, CONFIG_FILE,
};

/// A project whose `proxy-snapshots.toml` renames the modules alias.
fn aliased_project() -> (TempDir, ProxyConfig, Arc<Serializer>) {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(CONFIG_FILE), "modules_ref = \"$m\"\n").unwrap();
    let config = ProxyConfig::from_project_root(dir.path()).unwrap();
    let serializer = Serializer::builder(SymbolImport::new("modules", "src/testing.rs"))
        .configured(&config)
        .build();
    (dir, config, Arc::new(serializer))
}

#[test]
fn snapshot_imports_configured_alias() {
    let (dir, config, serializer) = aliased_project();
    assert_eq!(config.modules_ref, "$m");
    let store = SnapshotStore::new(serializer, config);
    let test = CurrentTest {
        path: dir.path().join("tests/storage.rs"),
        name: "aliased".to_string(),
        update_mode: UpdateMode::New,
    };
    let calls = vec![
        Call::new(vec!["storage".into(), "get".into()], vec![Value::from("k")])
            .with_returns(Value::from(1)),
    ];

    let expectation = store
        .render_expectation(&test, &services_tag(), None, &calls)
        .unwrap();
    assert!(expectation
        .contents
        .contains("import { modules as $m } from \"../../src/testing\";\n"));
    assert!(!expectation.contents.contains("_modules"));

    fs::create_dir_all(expectation.path.parent().unwrap()).unwrap();
    fs::write(&expectation.path, &expectation.contents).unwrap();
    assert_eq!(store.get(&test, &services_tag()).unwrap(), Some(calls));
}

#[test]
fn fixtures_import_configured_alias() {
    let (dir, config, serializer) = aliased_project();
    let file = FixturesFile::new(serializer.clone(), config);
    let fixtures = Value::object([("count", Value::from(1))]);
    file.save(Path::new("src/tests/fixtures.ts"), &fixtures)
        .unwrap();

    let path = dir.path().join("src/tests/fixtures.ts");
    let contents = fs::read_to_string(&path).unwrap();
    assert_eq!(
        contents,
        "import { modules as $m } from \"../testing\";\n\n\
         const fixtures = { count: 1 };\n\n\
         export default fixtures;\n"
    );
    assert_eq!(load_fixtures(&path, &serializer).unwrap(), fixtures);
}
