//! Engine lifecycle integration tests.

use attacca::prelude::*;

#[path = "../helpers/mod.rs"]
mod helpers;
use helpers::*;

#[test]
fn test_engine_reports_driver_config() {
    let (engine, _handle) = test_engine();
    assert!(engine.is_running());
    assert_eq!(engine.sample_rate(), 48000.0);
    assert_eq!(engine.buffer_size(), 256);
    engine.close().unwrap();
    assert!(!engine.is_running());
}

#[test]
fn test_sequential_engines() {
    for _ in 0..3 {
        let (engine, _handle) = test_engine();
        assert!(engine.is_running());
        // Dropping the engine closes it.
    }
}

#[test]
fn test_add_then_remove_restores_registry() {
    let (engine, _handle) = test_engine();
    add_internal(&engine, "gain");
    let before = engine.snapshot_project().unwrap();

    let id = add_internal(&engine, "midi-through");
    engine.remove_plugin(id).unwrap();
    engine.idle();

    let after = engine.snapshot_project().unwrap();
    assert_eq!(
        before.to_json().unwrap(),
        after.to_json().unwrap(),
        "registry should be restored after add+remove"
    );
}

#[test]
fn test_unique_name_generation() {
    let (engine, _handle) = test_engine();
    add_internal(&engine, "gain");
    add_internal(&engine, "gain");
    add_internal(&engine, "gain");

    let names: Vec<String> = engine
        .plugin_ids()
        .into_iter()
        .map(|id| engine.plugin_name(id).unwrap())
        .collect();
    assert_eq!(names, vec!["Gain", "Gain (2)", "Gain (3)"]);
    assert_eq!(engine.get_unique_plugin_name("Gain"), "Gain (4)");
    assert_eq!(engine.get_unique_plugin_name("Fresh"), "Fresh");
}

#[test]
fn test_clone_round_trips_state() {
    let (engine, _handle) = test_engine();
    let id = add_internal(&engine, "gain");
    engine.set_parameter(id, 0, 2.5).unwrap();
    engine.set_parameter(id, 1, 0.0).unwrap();

    let clone = engine.clone_plugin(id).unwrap();
    let count = engine.parameter_count(id).unwrap();
    for index in 0..count {
        assert_eq!(
            engine.get_parameter(clone, index).unwrap(),
            engine.get_parameter(id, index).unwrap(),
            "parameter {index} should round-trip through clone"
        );
    }
}

#[test]
fn test_switch_swaps_audio_roles() {
    let (engine, handle) = test_engine();
    let a = add_internal(&engine, "gain");
    let b = add_internal(&engine, "gain");
    engine.set_parameter(a, 0, 0.5).unwrap();
    engine.set_parameter(b, 0, 2.0).unwrap();

    let (before, _) = run_block(&handle, &dc_block(1.0), &[]);

    engine.switch_plugins(a, b).unwrap();
    let (after, _) = run_block(&handle, &dc_block(1.0), &[]);

    // Gain is commutative across the chain, so output is identical with
    // the roles of a and b swapped.
    assert!(signals_approx_equal(&before[0], &after[0], 1e-6));
    // The parameters really did trade places.
    assert_eq!(engine.get_parameter(a, 0).unwrap(), 2.0);
    assert_eq!(engine.get_parameter(b, 0).unwrap(), 0.5);
}

#[test]
fn test_callbacks_report_plugin_lifecycle() {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    let (engine, _handle) = test_engine();
    let added = Arc::new(AtomicU32::new(0));
    let removed = Arc::new(AtomicU32::new(0));
    let (added_sink, removed_sink) = (added.clone(), removed.clone());
    engine.set_callback(Some(Box::new(move |opcode, _, _, _, _, _| {
        match opcode {
            attacca::CallbackOpcode::PluginAdded => {
                added_sink.fetch_add(1, Ordering::Relaxed);
            }
            attacca::CallbackOpcode::PluginRemoved => {
                removed_sink.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    })));

    let id = add_internal(&engine, "gain");
    engine.remove_plugin(id).unwrap();

    assert_eq!(added.load(Ordering::Relaxed), 1);
    assert_eq!(removed.load(Ordering::Relaxed), 1);
}

#[test]
fn test_last_error_tracks_failures() {
    let (engine, _handle) = test_engine();
    let err = engine.remove_plugin(42).unwrap_err();
    assert!(matches!(err, Error::SlotEmpty(42)));
    assert_eq!(engine.last_error(), "No plugin with id 42");
}
