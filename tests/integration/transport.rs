//! Transport integration tests.

use attacca::prelude::*;
use attacca::TimeInfo;

#[path = "../helpers/mod.rs"]
mod helpers;
use helpers::*;

#[test]
fn test_transport_starts_stopped() {
    let (engine, _handle) = test_engine();
    assert!(!engine.transport().is_playing());
    assert_eq!(engine.transport().frame(), 0);
}

#[test]
fn test_frame_advances_only_while_playing() {
    let (engine, handle) = test_engine();

    run_silent_blocks(&handle, 4);
    assert_eq!(engine.transport().frame(), 0);

    engine.transport_play();
    run_silent_blocks(&handle, 4);
    assert_eq!(engine.transport().frame(), 4 * 256);

    engine.transport_pause();
    run_silent_blocks(&handle, 4);
    assert_eq!(engine.transport().frame(), 4 * 256);
}

#[test]
fn test_relocate_keeps_play_state() {
    let (engine, handle) = test_engine();
    engine.transport_play();
    run_silent_blocks(&handle, 2);

    engine.transport_relocate(48_000);
    assert!(engine.transport().is_playing());
    run_silent_blocks(&handle, 1);
    assert_eq!(engine.transport().frame(), 48_000 + 256);
}

#[test]
fn test_musical_position_after_ten_seconds() {
    // 480000 frames at 48 kHz, 120 bpm, 4/4, 960 ticks/beat.
    let (engine, handle) = test_engine();
    engine.transport().set_bpm(120.0);
    engine.transport().set_time_signature(4.0, 4.0);
    engine.transport().set_ticks_per_beat(960.0);

    engine.transport_play();
    let blocks = 480_000 / TEST_BUFFER_SIZE as usize;
    run_silent_blocks(&handle, blocks);
    assert_eq!(engine.transport().frame(), 480_000);

    let bbt = engine.transport().derive_bbt(engine.transport().frame());
    assert_eq!(bbt.bar, 6);
    assert_eq!(bbt.beat, 1);
    assert_eq!(bbt.tick, 0);
}

#[test]
fn test_plugins_see_block_time_info() {
    let (engine, handle) = test_engine();
    let host = engine.host_services();

    engine.transport_play();
    run_silent_blocks(&handle, 3);

    // The published snapshot describes the top of the last cycle.
    let info = host.time_info();
    assert!(info.playing);
    assert_eq!(info.frame, 2 * 256);
    let bbt = info.bbt.expect("internal transport always derives BBT");
    assert_eq!(bbt.beats_per_minute, 120.0);
}

#[test]
fn test_backend_transport_is_mirrored() {
    let (engine, handle) = test_engine_with(ProcessMode::ContinuousRack);
    engine.close().unwrap();
    drop(engine);

    // Re-build in backend transport mode on a fresh driver.
    let (driver, handle2) = NullDriver::create(48000.0, 256);
    let engine = EngineBuilder::new()
        .transport_mode(TransportMode::Jack)
        .sample_rate(48000)
        .buffer_size(256)
        .driver(Box::new(driver))
        .build()
        .unwrap();
    drop(handle);

    handle2.set_time_info(Some(TimeInfo {
        playing: true,
        frame: 96_000,
        usecs: 2_000_000,
        bbt: None,
    }));
    let input = silent_block();
    let mut output = silent_block();
    let mut midi_out = Vec::new();
    handle2
        .run_block(&input, &mut output, &[], &mut midi_out, 256)
        .unwrap();

    assert!(engine.transport().is_playing());
    assert_eq!(engine.transport().frame(), 96_000);
}
