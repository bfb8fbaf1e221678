//! Events exchanged between the host engine and plugin instances.
//!
//! An [`EngineEvent`] is a frame-stamped message inside one audio block. Event
//! buffers are kept in non-decreasing `time` order, and `time` is always less
//! than the block length; an event on the block boundary belongs to the next
//! block.

use smallvec::SmallVec;

/// Maximum number of raw bytes carried by a single MIDI event.
pub const MAX_MIDI_BYTES: usize = 4;

/// Events produced by one plugin during a single `process` call.
pub type EventVec = SmallVec<[EngineEvent; 16]>;

/// The kind of a control event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEventKind {
    /// Parameter change. `value` is normalised to 0.0..=1.0.
    Parameter,
    /// MIDI bank select. `param` is the bank number.
    MidiBank,
    /// MIDI program change. `param` is the program number.
    MidiProgram,
    AllSoundOff,
    AllNotesOff,
}

/// A control event: parameter automation or channel-mode messages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlEvent {
    pub kind: ControlEventKind,
    /// Parameter id, MIDI bank or MIDI program, depending on `kind`.
    pub param: u16,
    /// Parameter value, normalised to 0.0..=1.0. Zero for non-parameter kinds.
    pub value: f32,
}

/// A raw MIDI event, channel bit stripped from the status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiData {
    /// Port offset, usually 0.
    pub port: u8,
    pub data: [u8; MAX_MIDI_BYTES],
    /// Number of bytes used, 1..=4.
    pub size: u8,
}

impl MidiData {
    /// Build from raw bytes. Returns `None` when `bytes` is empty or longer
    /// than [`MAX_MIDI_BYTES`].
    pub fn new(port: u8, bytes: &[u8]) -> Option<Self> {
        if bytes.is_empty() || bytes.len() > MAX_MIDI_BYTES {
            return None;
        }
        let mut data = [0u8; MAX_MIDI_BYTES];
        data[..bytes.len()].copy_from_slice(bytes);
        Some(Self {
            port,
            data,
            size: bytes.len() as u8,
        })
    }

    /// The used portion of the data bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.size as usize]
    }

    pub fn status(&self) -> u8 {
        self.data[0]
    }
}

/// Payload of an [`EngineEvent`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventPayload {
    Control(ControlEvent),
    Midi(MidiData),
}

/// A frame-stamped event within one audio block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineEvent {
    /// Frame offset within the current block. Always `< frames`.
    pub time: u32,
    /// MIDI channel 0..=15. Zero for non-MIDI control events.
    pub channel: u8,
    pub payload: EventPayload,
}

impl EngineEvent {
    pub fn parameter(time: u32, channel: u8, param: u16, value: f32) -> Self {
        Self {
            time,
            channel,
            payload: EventPayload::Control(ControlEvent {
                kind: ControlEventKind::Parameter,
                param,
                value: value.clamp(0.0, 1.0),
            }),
        }
    }

    pub fn midi_bank(time: u32, channel: u8, bank: u16) -> Self {
        Self {
            time,
            channel,
            payload: EventPayload::Control(ControlEvent {
                kind: ControlEventKind::MidiBank,
                param: bank,
                value: 0.0,
            }),
        }
    }

    pub fn midi_program(time: u32, channel: u8, program: u16) -> Self {
        Self {
            time,
            channel,
            payload: EventPayload::Control(ControlEvent {
                kind: ControlEventKind::MidiProgram,
                param: program,
                value: 0.0,
            }),
        }
    }

    pub fn all_sound_off(time: u32, channel: u8) -> Self {
        Self {
            time,
            channel,
            payload: EventPayload::Control(ControlEvent {
                kind: ControlEventKind::AllSoundOff,
                param: 0,
                value: 0.0,
            }),
        }
    }

    pub fn all_notes_off(time: u32, channel: u8) -> Self {
        Self {
            time,
            channel,
            payload: EventPayload::Control(ControlEvent {
                kind: ControlEventKind::AllNotesOff,
                param: 0,
                value: 0.0,
            }),
        }
    }

    /// Build a raw MIDI event. Returns `None` for empty or oversized data.
    pub fn midi(time: u32, channel: u8, port: u8, bytes: &[u8]) -> Option<Self> {
        Some(Self {
            time,
            channel,
            payload: EventPayload::Midi(MidiData::new(port, bytes)?),
        })
    }

    pub fn is_midi(&self) -> bool {
        matches!(self.payload, EventPayload::Midi(_))
    }

    pub fn as_control(&self) -> Option<&ControlEvent> {
        match &self.payload {
            EventPayload::Control(ctrl) => Some(ctrl),
            EventPayload::Midi(_) => None,
        }
    }

    pub fn as_midi(&self) -> Option<&MidiData> {
        match &self.payload {
            EventPayload::Midi(midi) => Some(midi),
            EventPayload::Control(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_value_is_clamped() {
        let ev = EngineEvent::parameter(0, 0, 7, 1.5);
        let ctrl = ev.as_control().unwrap();
        assert_eq!(ctrl.value, 1.0);

        let ev = EngineEvent::parameter(0, 0, 7, -0.5);
        assert_eq!(ev.as_control().unwrap().value, 0.0);
    }

    #[test]
    fn test_midi_data_bounds() {
        assert!(MidiData::new(0, &[]).is_none());
        assert!(MidiData::new(0, &[0x90, 60, 100, 0, 0]).is_none());

        let midi = MidiData::new(0, &[0x90, 60, 100]).unwrap();
        assert_eq!(midi.size, 3);
        assert_eq!(midi.bytes(), &[0x90, 60, 100]);
        assert_eq!(midi.status(), 0x90);
    }

    #[test]
    fn test_midi_event_constructor() {
        let ev = EngineEvent::midi(128, 2, 0, &[0x80, 60, 0]).unwrap();
        assert_eq!(ev.time, 128);
        assert_eq!(ev.channel, 2);
        assert!(ev.is_midi());
        assert_eq!(ev.as_midi().unwrap().bytes(), &[0x80, 60, 0]);
    }
}
