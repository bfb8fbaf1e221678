//! Lock-free primitives shared between the control and audio threads.

use atomic_float::{AtomicF32, AtomicF64};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Cache-line aligned atomic f32.
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicFloat {
    value: AtomicF32,
}

impl AtomicFloat {
    pub fn new(value: f32) -> Self {
        Self {
            value: AtomicF32::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> f32 {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn get_relaxed(&self) -> f32 {
        self.value.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set(&self, value: f32) {
        self.value.store(value, Ordering::Release);
    }

    #[inline]
    pub fn set_relaxed(&self, value: f32) {
        self.value.store(value, Ordering::Relaxed);
    }
}

impl Default for AtomicFloat {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Cache-line aligned atomic f64.
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicDouble {
    value: AtomicF64,
}

impl AtomicDouble {
    pub fn new(value: f64) -> Self {
        Self {
            value: AtomicF64::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> f64 {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: f64) {
        self.value.store(value, Ordering::Release);
    }
}

impl Default for AtomicDouble {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Cache-line aligned atomic bool.
#[derive(Debug)]
#[repr(align(64))]
pub struct AtomicFlag {
    value: AtomicBool,
}

impl AtomicFlag {
    pub fn new(value: bool) -> Self {
        Self {
            value: AtomicBool::new(value),
        }
    }

    #[inline]
    pub fn get(&self) -> bool {
        self.value.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: bool) {
        self.value.store(value, Ordering::Release);
    }

    #[inline]
    pub fn swap(&self, value: bool) -> bool {
        self.value.swap(value, Ordering::AcqRel)
    }
}

impl Default for AtomicFlag {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Four-channel peak meter: [in-left, in-right, out-left, out-right].
///
/// The audio thread stores with relaxed ordering, the control thread reads
/// the same way; a peak display tolerates tearing between channels.
#[derive(Debug, Default)]
pub struct PeakMeter {
    peaks: [AtomicFloat; 4],
}

impl PeakMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan a channel's block and store its absolute peak.
    ///
    /// Non-finite samples keep the previous value; returns `false` so the
    /// caller can quarantine the producer.
    pub fn update_channel(&self, channel: usize, samples: &[f32]) -> bool {
        let mut peak = 0.0f32;
        for &sample in samples {
            if !sample.is_finite() {
                return false;
            }
            let mag = sample.abs();
            if mag > peak {
                peak = mag;
            }
        }
        self.peaks[channel].set_relaxed(peak);
        true
    }

    pub fn set(&self, channel: usize, value: f32) {
        self.peaks[channel].set_relaxed(value);
    }

    pub fn get(&self, channel: usize) -> f32 {
        self.peaks[channel].get_relaxed()
    }

    pub fn input(&self) -> (f32, f32) {
        (self.get(0), self.get(1))
    }

    pub fn output(&self) -> (f32, f32) {
        (self.get(2), self.get(3))
    }

    pub fn clear(&self) {
        for peak in &self.peaks {
            peak.set_relaxed(0.0);
        }
    }
}

/// Monotonic cycle counter bumped by the audio thread once per block.
///
/// The control thread uses it for snapshot reclamation: state retired at
/// generation `g` may be freed once the counter has passed `g`, proving the
/// audio thread has started a later cycle and no longer holds the old state.
#[derive(Debug, Default)]
pub struct Generation {
    counter: AtomicU64,
}

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::Acquire)
    }

    /// Called by the audio thread at the end of each cycle.
    #[inline]
    pub fn advance(&self) {
        self.counter.fetch_add(1, Ordering::AcqRel);
    }

    /// Whether the audio thread has moved past `generation`.
    #[inline]
    pub fn has_passed(&self, generation: u64) -> bool {
        self.current() > generation
    }
}
