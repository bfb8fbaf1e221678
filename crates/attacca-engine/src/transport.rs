//! Transport state and musical position derivation.
//!
//! Control-thread operations store into atomics; the audio thread folds them
//! in at the top of each cycle and produces the block's [`TimeInfo`]. In
//! backend transport mode the backend's time info is authoritative and the
//! engine mirrors it.

use crate::config::TransportMode;
use crate::lockfree::{AtomicDouble, AtomicFlag, AtomicFloat};
use attacca_plugin::{TimeInfo, TimeInfoBbt};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

const MODE_INTERNAL: u8 = 0;
const MODE_BACKEND: u8 = 1;

/// Play state, frame counter and tempo grid.
pub struct Transport {
    playing: AtomicFlag,
    frame: AtomicU64,
    seek_target: AtomicU64,
    seek_pending: AtomicFlag,
    mode: AtomicU8,

    bpm: AtomicDouble,
    beats_per_bar: AtomicFloat,
    beat_type: AtomicFloat,
    ticks_per_beat: AtomicDouble,
    sample_rate: AtomicDouble,
}

impl Transport {
    pub fn new(sample_rate: f64, mode: TransportMode) -> Self {
        Self {
            playing: AtomicFlag::new(false),
            frame: AtomicU64::new(0),
            seek_target: AtomicU64::new(0),
            seek_pending: AtomicFlag::new(false),
            mode: AtomicU8::new(match mode {
                TransportMode::Internal => MODE_INTERNAL,
                TransportMode::Jack => MODE_BACKEND,
            }),
            bpm: AtomicDouble::new(120.0),
            beats_per_bar: AtomicFloat::new(4.0),
            beat_type: AtomicFloat::new(4.0),
            ticks_per_beat: AtomicDouble::new(960.0),
            sample_rate: AtomicDouble::new(sample_rate),
        }
    }

    pub fn play(&self) {
        self.playing.set(true);
    }

    pub fn pause(&self) {
        self.playing.set(false);
    }

    /// Move the play head. Play state is unchanged; the new position takes
    /// effect at the next cycle.
    pub fn relocate(&self, frame: u64) {
        self.seek_target.store(frame, Ordering::Release);
        self.seek_pending.set(true);
    }

    pub fn is_playing(&self) -> bool {
        self.playing.get()
    }

    /// Current frame position, including a not-yet-applied relocate.
    pub fn frame(&self) -> u64 {
        if self.seek_pending.get() {
            self.seek_target.load(Ordering::Acquire)
        } else {
            self.frame.load(Ordering::Acquire)
        }
    }

    pub fn mode(&self) -> TransportMode {
        if self.mode.load(Ordering::Acquire) == MODE_BACKEND {
            TransportMode::Jack
        } else {
            TransportMode::Internal
        }
    }

    pub fn set_mode(&self, mode: TransportMode) {
        let raw = match mode {
            TransportMode::Internal => MODE_INTERNAL,
            TransportMode::Jack => MODE_BACKEND,
        };
        self.mode.store(raw, Ordering::Release);
    }

    pub fn set_sample_rate(&self, rate: f64) {
        self.sample_rate.set(rate);
    }

    pub fn bpm(&self) -> f64 {
        self.bpm.get()
    }

    pub fn set_bpm(&self, bpm: f64) {
        self.bpm.set(bpm.clamp(20.0, 999.0));
    }

    pub fn set_time_signature(&self, beats_per_bar: f32, beat_type: f32) {
        self.beats_per_bar.set(beats_per_bar);
        self.beat_type.set(beat_type);
    }

    pub fn set_ticks_per_beat(&self, ticks: f64) {
        self.ticks_per_beat.set(ticks);
    }

    /// Produce the transport snapshot for one cycle.
    ///
    /// Audio thread only. Applies a pending relocate, or mirrors the backend
    /// when it owns the clock and reported time for this block.
    pub fn begin_block(&self, backend: Option<&TimeInfo>) -> TimeInfo {
        if let Some(info) = backend {
            if self.mode.load(Ordering::Relaxed) == MODE_BACKEND {
                self.playing.set(info.playing);
                self.frame.store(info.frame, Ordering::Release);
                self.seek_pending.set(false);
                return *info;
            }
        }

        if self.seek_pending.swap(false) {
            self.frame
                .store(self.seek_target.load(Ordering::Acquire), Ordering::Release);
        }

        let frame = self.frame.load(Ordering::Relaxed);
        let sample_rate = self.sample_rate.get();
        let usecs = if sample_rate > 0.0 {
            (frame as f64 / sample_rate * 1_000_000.0) as u64
        } else {
            0
        };

        TimeInfo {
            playing: self.playing.get(),
            frame,
            usecs,
            bbt: Some(self.derive_bbt(frame)),
        }
    }

    /// Advance the internal clock after a cycle of `frames` samples.
    ///
    /// Audio thread only. A no-op when stopped or when the backend owns the
    /// clock.
    pub fn end_block(&self, frames: u32) {
        if self.mode.load(Ordering::Relaxed) == MODE_INTERNAL && self.playing.get() {
            self.frame.fetch_add(u64::from(frames), Ordering::AcqRel);
        }
    }

    /// Bar/beat/tick for an absolute frame position.
    pub fn derive_bbt(&self, frame: u64) -> TimeInfoBbt {
        let bpm = self.bpm.get();
        let beats_per_bar = f64::from(self.beats_per_bar.get());
        let beat_type = self.beat_type.get();
        let ticks_per_beat = self.ticks_per_beat.get();
        let sample_rate = self.sample_rate.get();

        let beats_total = if sample_rate > 0.0 {
            frame as f64 * bpm / (60.0 * sample_rate)
        } else {
            0.0
        };
        let bar = (beats_total / beats_per_bar).floor() as i32 + 1;
        let beat_in_bar = beats_total.rem_euclid(beats_per_bar);
        let beat = beat_in_bar.floor() as i32 + 1;
        let tick = (beats_total.fract() * ticks_per_beat).floor() as i32;
        let bar_start_tick = f64::from(bar - 1) * beats_per_bar * ticks_per_beat;

        TimeInfoBbt {
            bar,
            beat,
            tick,
            bar_start_tick,
            beats_per_bar: beats_per_bar as f32,
            beat_type,
            ticks_per_beat,
            beats_per_minute: bpm,
        }
    }
}
