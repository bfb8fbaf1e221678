//! Test helpers and fixtures for the integration suite.
//!
//! The engine runs on the null backend: every audio cycle is driven
//! explicitly through a [`NullDriverHandle`], which keeps tests
//! deterministic and hardware-free.

#![allow(dead_code)]

use attacca::prelude::*;

/// Default test sample rate.
pub const TEST_SAMPLE_RATE: u32 = 48000;

/// Standard buffer size for deterministic cycles.
pub const TEST_BUFFER_SIZE: u32 = 256;

/// Engine in rack mode on the null backend.
pub fn test_engine() -> (Engine, NullDriverHandle) {
    test_engine_with(ProcessMode::ContinuousRack)
}

/// Engine in the given process mode on the null backend.
pub fn test_engine_with(mode: ProcessMode) -> (Engine, NullDriverHandle) {
    let (driver, handle) = NullDriver::create(f64::from(TEST_SAMPLE_RATE), TEST_BUFFER_SIZE);
    let engine = EngineBuilder::new()
        .process_mode(mode)
        .sample_rate(TEST_SAMPLE_RATE)
        .buffer_size(TEST_BUFFER_SIZE)
        .client_name("attacca-test")
        .driver(Box::new(driver))
        .build()
        .expect("failed to create test engine");
    (engine, handle)
}

/// Stereo buffers holding one block of the given DC value.
pub fn dc_block(value: f32) -> Vec<Vec<f32>> {
    vec![vec![value; TEST_BUFFER_SIZE as usize]; 2]
}

/// Stereo silence for one block.
pub fn silent_block() -> Vec<Vec<f32>> {
    dc_block(0.0)
}

/// Run one cycle of stereo audio plus events through the engine.
pub fn run_block(
    handle: &NullDriverHandle,
    audio_in: &[Vec<f32>],
    midi_in: &[EngineEvent],
) -> (Vec<Vec<f32>>, Vec<EngineEvent>) {
    let mut audio_out = silent_block();
    let mut midi_out = Vec::with_capacity(512);
    handle
        .run_block(audio_in, &mut audio_out, midi_in, &mut midi_out, TEST_BUFFER_SIZE)
        .expect("audio cycle failed");
    (audio_out, midi_out)
}

/// Run `count` silent cycles.
pub fn run_silent_blocks(handle: &NullDriverHandle, count: usize) {
    let input = silent_block();
    for _ in 0..count {
        run_block(handle, &input, &[]);
    }
}

/// A note-on MIDI event.
pub fn note_on(time: u32, channel: u8, note: u8, velocity: u8) -> EngineEvent {
    EngineEvent::midi(time, channel, 0, &[0x90, note, velocity]).unwrap()
}

/// A note-off MIDI event.
pub fn note_off(time: u32, channel: u8, note: u8) -> EngineEvent {
    EngineEvent::midi(time, channel, 0, &[0x80, note, 0]).unwrap()
}

/// Peak amplitude of a signal.
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0_f32, f32::max)
}

/// Check two signals match within tolerance.
pub fn signals_approx_equal(a: &[f32], b: &[f32], tolerance: f32) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() <= tolerance)
}

/// Assert every sample equals `expected` within 1e-6.
pub fn assert_dc(samples: &[f32], expected: f32, context: &str) {
    for (index, &sample) in samples.iter().enumerate() {
        assert!(
            (sample - expected).abs() < 1e-6,
            "{context}: sample {index} is {sample}, expected {expected}"
        );
    }
}

/// Add an internal plugin by label, panicking on failure.
pub fn add_internal(engine: &Engine, label: &str) -> PluginId {
    engine
        .add_plugin(BinaryType::Native, PluginType::Internal, None, None, label)
        .unwrap_or_else(|e| panic!("failed to add internal plugin {label}: {e}"))
}
