//! Musical time information delivered to plugins each block.

/// Bar/beat/tick position within the song.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeInfoBbt {
    /// Current bar, starting at 1.
    pub bar: i32,
    /// Current beat within the bar, starting at 1.
    pub beat: i32,
    /// Current tick within the beat, starting at 0.
    pub tick: i32,
    pub bar_start_tick: f64,
    /// Time signature numerator.
    pub beats_per_bar: f32,
    /// Time signature denominator.
    pub beat_type: f32,
    pub ticks_per_beat: f64,
    pub beats_per_minute: f64,
}

impl Default for TimeInfoBbt {
    fn default() -> Self {
        Self {
            bar: 1,
            beat: 1,
            tick: 0,
            bar_start_tick: 0.0,
            beats_per_bar: 4.0,
            beat_type: 4.0,
            ticks_per_beat: 960.0,
            beats_per_minute: 120.0,
        }
    }
}

/// Transport snapshot for one audio block.
///
/// `bbt` is `None` when no musical position is available, for example while a
/// backend-authoritative transport has not reported one.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimeInfo {
    pub playing: bool,
    /// Absolute frame position at the start of the block.
    pub frame: u64,
    /// Microseconds since transport zero.
    pub usecs: u64,
    pub bbt: Option<TimeInfoBbt>,
}
