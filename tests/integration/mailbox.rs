//! Control-event mailbox integration tests.

use attacca::prelude::*;

#[path = "../helpers/mod.rs"]
mod helpers;
use helpers::*;

#[test]
fn test_burst_hits_backpressure_then_drains() {
    let (engine, handle) = test_engine();
    let id = add_internal(&engine, "gain");

    // The ring holds 1024 records; a 2048 burst fills it exactly once.
    let mut accepted = 0usize;
    let mut rejected = Vec::new();
    for step in 0..2048u32 {
        let value = (step % 1000) as f32 / 1000.0;
        match engine.submit_control_event(id, EngineEvent::parameter(0, 0, 0, value)) {
            Ok(()) => accepted += 1,
            Err(Error::Backpressure) => rejected.push(value),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(accepted, 1024);
    assert_eq!(rejected.len(), 1024);

    // One cycle drains the ring; the retry at idle granularity succeeds.
    run_silent_blocks(&handle, 1);
    engine.idle();
    for value in rejected {
        engine
            .submit_control_event(id, EngineEvent::parameter(0, 0, 0, value))
            .unwrap();
    }
    run_silent_blocks(&handle, 1);

    // The last submitted value won: normalised 1023/1000 is clamped, so
    // recompute what the final event carried.
    let last = (2047 % 1000) as f32 / 1000.0;
    let expected = 4.0 * last;
    let current = engine.get_parameter(id, 0).unwrap();
    assert!(
        (current - expected).abs() < 1e-5,
        "expected {expected}, got {current}"
    );
}

#[test]
fn test_events_observed_in_submission_order() {
    let (engine, handle) = test_engine();
    let id = add_internal(&engine, "gain");

    // Same frame, increasing values: FIFO order means the last one sticks.
    for step in 1..=8u16 {
        let value = f32::from(step) / 8.0;
        engine
            .submit_control_event(id, EngineEvent::parameter(0, 0, 0, value))
            .unwrap();
    }
    run_silent_blocks(&handle, 1);
    assert_eq!(engine.get_parameter(id, 0).unwrap(), 4.0);
}

#[test]
fn test_events_only_reach_their_target() {
    let (engine, handle) = test_engine();
    let a = add_internal(&engine, "gain");
    let b = add_internal(&engine, "gain");

    engine
        .submit_control_event(a, EngineEvent::parameter(0, 0, 0, 0.0))
        .unwrap();
    run_silent_blocks(&handle, 1);

    assert_eq!(engine.get_parameter(a, 0).unwrap(), 0.0);
    assert_eq!(engine.get_parameter(b, 0).unwrap(), 1.0);
}

#[test]
fn test_channel_mode_events_are_broadcast() {
    let (engine, handle) = test_engine();
    add_internal(&engine, "midi-through");

    // All-notes-off is a control event, not MIDI, so the through box must
    // consume it without echoing.
    engine
        .submit_control_event(attacca::NO_PLUGIN_ID, EngineEvent::all_notes_off(0, 0))
        .unwrap();
    let (_, midi_out) = run_block(&handle, &silent_block(), &[]);
    assert!(midi_out.is_empty());
}
