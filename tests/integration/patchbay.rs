//! Patchbay-mode integration tests.

use attacca::prelude::*;

#[path = "../helpers/mod.rs"]
mod helpers;
use helpers::*;

/// Wire stereo capture -> a -> b -> playback.
fn wire_chain(engine: &Engine, a: PluginId, b: PluginId) -> Vec<ConnectionId> {
    let mut ids = Vec::new();
    for channel in 0..2 {
        ids.push(
            engine
                .patchbay_connect(PortRef::audio(SYSTEM_PLUGIN, channel), PortRef::audio(a, channel))
                .unwrap(),
        );
        ids.push(
            engine
                .patchbay_connect(PortRef::audio(a, channel), PortRef::audio(b, channel))
                .unwrap(),
        );
        ids.push(
            engine
                .patchbay_connect(PortRef::audio(b, channel), PortRef::audio(SYSTEM_PLUGIN, channel))
                .unwrap(),
        );
    }
    ids
}

#[test]
fn test_chain_processes_in_connection_order() {
    let (engine, handle) = test_engine_with(ProcessMode::Patchbay);
    let a = add_internal(&engine, "gain");
    let b = add_internal(&engine, "audio-pass");
    engine.set_parameter(a, 0, 0.5).unwrap();
    wire_chain(&engine, a, b);

    let (output, _) = run_block(&handle, &dc_block(1.0), &[]);
    assert_dc(&output[0], 0.5, "gain then pass");
    assert_dc(&output[1], 0.5, "gain then pass right");
}

#[test]
fn test_switch_keeps_connections_on_plugins() {
    let (engine, handle) = test_engine_with(ProcessMode::Patchbay);
    let a = add_internal(&engine, "gain");
    let b = add_internal(&engine, "audio-pass");
    engine.set_parameter(a, 0, 0.25).unwrap();
    wire_chain(&engine, a, b);

    let (before, _) = run_block(&handle, &dc_block(1.0), &[]);
    assert_dc(&before[0], 0.25, "pre-switch chain");

    engine.switch_plugins(a, b).unwrap();

    // Connections now reference the new positions; the graph still runs
    // and produces the same signal.
    let (after, _) = run_block(&handle, &dc_block(1.0), &[]);
    assert_dc(&after[0], 0.25, "post-switch chain");

    let connections = engine.patchbay_connections();
    // The gain lives at b's old id now; capture still feeds it.
    assert!(connections
        .iter()
        .any(|c| c.source.plugin == SYSTEM_PLUGIN && c.sink.plugin == b));
}

#[test]
fn test_disconnect_silences_path() {
    let (engine, handle) = test_engine_with(ProcessMode::Patchbay);
    let a = add_internal(&engine, "audio-pass");

    let into = engine
        .patchbay_connect(PortRef::audio(SYSTEM_PLUGIN, 0), PortRef::audio(a, 0))
        .unwrap();
    engine
        .patchbay_connect(PortRef::audio(a, 0), PortRef::audio(SYSTEM_PLUGIN, 0))
        .unwrap();

    let (output, _) = run_block(&handle, &dc_block(0.9), &[]);
    assert_dc(&output[0], 0.9, "connected path");

    engine.patchbay_disconnect(into).unwrap();
    let (output, _) = run_block(&handle, &dc_block(0.9), &[]);
    assert_dc(&output[0], 0.0, "input disconnected");
}

#[test]
fn test_summing_at_a_sink() {
    let (engine, handle) = test_engine_with(ProcessMode::Patchbay);
    let a = add_internal(&engine, "audio-pass");
    let b = add_internal(&engine, "audio-pass");

    for id in [a, b] {
        engine
            .patchbay_connect(PortRef::audio(SYSTEM_PLUGIN, 0), PortRef::audio(id, 0))
            .unwrap();
        engine
            .patchbay_connect(PortRef::audio(id, 0), PortRef::audio(SYSTEM_PLUGIN, 0))
            .unwrap();
    }

    let (output, _) = run_block(&handle, &dc_block(0.25), &[]);
    // Two parallel paths into the same playback port sum.
    assert_dc(&output[0], 0.5, "parallel paths sum");
}

#[test]
fn test_cycle_rejection() {
    let (engine, _handle) = test_engine_with(ProcessMode::Patchbay);
    let a = add_internal(&engine, "audio-pass");
    let b = add_internal(&engine, "audio-pass");

    engine
        .patchbay_connect(PortRef::audio(a, 0), PortRef::audio(b, 0))
        .unwrap();
    let err = engine
        .patchbay_connect(PortRef::audio(b, 0), PortRef::audio(a, 0))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn test_events_cross_the_patchbay() {
    let (engine, handle) = test_engine_with(ProcessMode::Patchbay);
    let through = add_internal(&engine, "midi-through");

    engine
        .patchbay_connect(PortRef::event(SYSTEM_PLUGIN, 0), PortRef::event(through, 0))
        .unwrap();
    engine
        .patchbay_connect(PortRef::event(through, 0), PortRef::event(SYSTEM_PLUGIN, 0))
        .unwrap();

    let events = [note_on(0, 0, 60, 100), note_off(128, 0, 60)];
    let (_, midi_out) = run_block(&handle, &silent_block(), &events);
    assert_eq!(midi_out, events.to_vec());
}

#[test]
fn test_rack_mode_rejects_patchbay_ops() {
    let (engine, _handle) = test_engine();
    let err = engine
        .patchbay_connect(
            PortRef::audio(SYSTEM_PLUGIN, 0),
            PortRef::audio(SYSTEM_PLUGIN, 0),
        )
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedOperation(_)));
}
