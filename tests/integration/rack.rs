//! Rack-mode processing integration tests.

#[path = "../helpers/mod.rs"]
mod helpers;
use helpers::*;

#[test]
fn test_midi_through_round_trip_same_block() {
    let (engine, handle) = test_engine();
    add_internal(&engine, "midi-through");

    let events = [note_on(0, 0, 60, 100), note_off(128, 0, 60)];
    let (_, midi_out) = run_block(&handle, &silent_block(), &events);
    assert_eq!(midi_out, events.to_vec());
}

#[test]
fn test_gain_dc_signal_and_peaks() {
    let (engine, handle) = test_engine();
    let id = add_internal(&engine, "gain");
    engine.set_parameter(id, 0, 0.5).unwrap();

    // Silence first: everything quiet.
    let (output, _) = run_block(&handle, &silent_block(), &[]);
    assert_dc(&output[0], 0.0, "silence in, silence out");
    assert_eq!(engine.plugin_peaks(id).unwrap(), [0.0, 0.0, 0.0, 0.0]);

    // A 1.0 DC block comes out at 0.5 with matching peaks.
    let (output, _) = run_block(&handle, &dc_block(1.0), &[]);
    assert_dc(&output[0], 0.5, "half gain on DC");
    assert_dc(&output[1], 0.5, "half gain on DC right");
    assert_eq!(engine.plugin_peaks(id).unwrap(), [1.0, 1.0, 0.5, 0.5]);
    assert_eq!(engine.peaks(), [1.0, 1.0, 0.5, 0.5]);
}

#[test]
fn test_chain_runs_in_slot_order() {
    let (engine, handle) = test_engine();
    let first = add_internal(&engine, "gain");
    let second = add_internal(&engine, "gain");
    engine.set_parameter(first, 0, 0.5).unwrap();
    engine.set_parameter(second, 0, 0.5).unwrap();

    let (output, _) = run_block(&handle, &dc_block(1.0), &[]);
    assert_dc(&output[0], 0.25, "two half-gains in series");

    // The second slot's input peak proves it ran after the first.
    assert_eq!(engine.plugin_peaks(second).unwrap(), [0.5, 0.5, 0.25, 0.25]);
}

#[test]
fn test_empty_rack_is_passthrough() {
    let (_engine, handle) = test_engine();
    let input = dc_block(0.8);
    let (output, _) = run_block(&handle, &input, &[]);
    assert!(signals_approx_equal(&output[0], &input[0], 1e-6));
    assert!(signals_approx_equal(&output[1], &input[1], 1e-6));
}

#[test]
fn test_events_keep_block_order_through_rack() {
    let (engine, handle) = test_engine();
    add_internal(&engine, "midi-through");

    let events = [
        note_on(0, 0, 60, 100),
        note_on(10, 0, 64, 100),
        note_on(10, 0, 67, 100),
        note_off(255, 0, 60),
    ];
    let (_, midi_out) = run_block(&handle, &silent_block(), &events);

    let times: Vec<u32> = midi_out.iter().map(|e| e.time).collect();
    assert_eq!(times, vec![0, 10, 10, 255]);
    // Ties keep insertion order.
    assert_eq!(midi_out[1].as_midi().unwrap().bytes()[1], 64);
    assert_eq!(midi_out[2].as_midi().unwrap().bytes()[1], 67);
}

#[test]
fn test_removed_plugin_drops_out_of_chain() {
    let (engine, handle) = test_engine();
    let id = add_internal(&engine, "gain");
    engine.set_parameter(id, 0, 0.5).unwrap();

    let (output, _) = run_block(&handle, &dc_block(1.0), &[]);
    assert_dc(&output[0], 0.5, "gain active");

    engine.remove_plugin(id).unwrap();
    engine.idle();

    let (output, _) = run_block(&handle, &dc_block(1.0), &[]);
    assert_dc(&output[0], 1.0, "chain is passthrough again");
}
