//! Project save/load integration tests.

use attacca::prelude::*;
use attacca::Project;

#[path = "../helpers/mod.rs"]
mod helpers;
use helpers::*;

fn temp_project_path(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join("attacca-integration");
    std::fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}

#[test]
fn test_save_load_restores_plugins_and_parameters() {
    let (engine, _handle) = test_engine();
    let gain = add_internal(&engine, "gain");
    engine.set_parameter(gain, 0, 0.5).unwrap();
    add_internal(&engine, "midi-through");

    let path = temp_project_path("roundtrip.json");
    engine.save_project(&path).unwrap();

    engine.remove_all_plugins().unwrap();
    engine.idle();
    assert_eq!(engine.plugin_count(), 0);

    engine.load_project(&path).unwrap();
    let ids = engine.plugin_ids();
    assert_eq!(ids.len(), 2);
    assert_eq!(engine.plugin_name(ids[0]).unwrap(), "Gain");
    assert_eq!(engine.plugin_name(ids[1]).unwrap(), "MIDI Through");
    assert_eq!(engine.get_parameter(ids[0], 0).unwrap(), 0.5);

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_reload_produces_identical_state_hash() {
    let (engine, _handle) = test_engine();
    let gain = add_internal(&engine, "gain");
    engine.set_parameter(gain, 0, 2.0).unwrap();
    engine.set_parameter(gain, 2, 0.0).unwrap();
    add_internal(&engine, "audio-pass");

    let path = temp_project_path("state-hash.json");
    engine.save_project(&path).unwrap();
    let first = engine.snapshot_project().unwrap().to_json().unwrap();

    engine.remove_all_plugins().unwrap();
    engine.idle();
    engine.load_project(&path).unwrap();

    let second = engine.snapshot_project().unwrap().to_json().unwrap();
    assert_eq!(first, second, "reloading the same project is idempotent");

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_project_restores_connections() {
    let (engine, _handle) = test_engine_with(ProcessMode::Patchbay);
    let through = add_internal(&engine, "midi-through");
    engine
        .patchbay_connect(PortRef::event(SYSTEM_PLUGIN, 0), PortRef::event(through, 0))
        .unwrap();
    engine
        .patchbay_connect(PortRef::event(through, 0), PortRef::event(SYSTEM_PLUGIN, 0))
        .unwrap();

    let saved = engine.snapshot_project().unwrap();
    assert_eq!(saved.connections.len(), 2);

    engine.remove_all_plugins().unwrap();
    engine.idle();
    assert!(engine.patchbay_connections().is_empty());

    engine.load_project_state(&saved).unwrap();
    let connections = engine.patchbay_connections();
    assert_eq!(connections.len(), 2);
    let new_id = engine.plugin_ids()[0];
    assert!(connections
        .iter()
        .any(|c| c.source.plugin == SYSTEM_PLUGIN && c.sink.plugin == new_id));
}

#[test]
fn test_corrupt_project_file_is_rejected() {
    let (engine, _handle) = test_engine();
    let path = temp_project_path("corrupt.json");
    std::fs::write(&path, "{ definitely not a project").unwrap();

    let err = engine.load_project(&path).unwrap_err();
    assert!(matches!(err, Error::StateCorrupt(_)));

    let missing = temp_project_path("does-not-exist.json");
    let err = engine.load_project(&missing).unwrap_err();
    assert!(matches!(err, Error::Io(_)));

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_project_json_is_stable() {
    let (engine, _handle) = test_engine();
    add_internal(&engine, "gain");

    let project = engine.snapshot_project().unwrap();
    let json = project.to_json().unwrap();
    let reparsed = Project::from_json(&json).unwrap();
    assert_eq!(reparsed, project);
    assert!(json.contains("\"label\": \"gain\""));
}
