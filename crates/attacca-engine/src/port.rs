//! Ports and their buffers.
//!
//! A port owns exactly one buffer: audio and CV ports hold one float per
//! frame of the current block, event ports hold a bounded, time-ordered
//! event list. Kind and direction never change after construction.

use crate::error::{Error, Result};
use attacca_plugin::EngineEvent;

/// Default capacity of an event port buffer.
pub const EVENT_BUFFER_CAPACITY: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortKind {
    Audio,
    Cv,
    Event,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

/// Bounded, time-ordered event storage.
///
/// The backing vector is allocated once at capacity; pushes never grow it,
/// so the audio thread can write without allocating.
#[derive(Debug)]
pub struct EventBuffer {
    events: Vec<EngineEvent>,
    capacity: usize,
}

impl EventBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[EngineEvent] {
        &self.events
    }

    /// Append an event.
    ///
    /// Fails with [`Error::Backpressure`] when the buffer is full (the event
    /// is dropped, non-fatal) and with [`Error::InvalidArgument`] when the
    /// event would break the non-decreasing time order.
    pub fn push(&mut self, event: EngineEvent) -> Result<()> {
        if let Some(last) = self.events.last() {
            if event.time < last.time {
                return Err(Error::InvalidArgument(format!(
                    "event time {} before buffer tail {}",
                    event.time, last.time
                )));
            }
        }
        if self.events.len() >= self.capacity {
            return Err(Error::Backpressure);
        }
        self.events.push(event);
        Ok(())
    }
}

/// Storage backing one port.
#[derive(Debug)]
pub enum PortBuffer {
    Audio(Vec<f32>),
    Cv(Vec<f32>),
    Event(EventBuffer),
}

/// A single audio, CV or event port.
#[derive(Debug)]
pub struct Port {
    name: String,
    direction: PortDirection,
    buffer: PortBuffer,
}

impl Port {
    pub fn audio(name: impl Into<String>, direction: PortDirection, frames: u32) -> Self {
        Self {
            name: name.into(),
            direction,
            buffer: PortBuffer::Audio(vec![0.0; frames as usize]),
        }
    }

    pub fn cv(name: impl Into<String>, direction: PortDirection, frames: u32) -> Self {
        Self {
            name: name.into(),
            direction,
            buffer: PortBuffer::Cv(vec![0.0; frames as usize]),
        }
    }

    pub fn event(name: impl Into<String>, direction: PortDirection) -> Self {
        Self {
            name: name.into(),
            direction,
            buffer: PortBuffer::Event(EventBuffer::new(EVENT_BUFFER_CAPACITY)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn direction(&self) -> PortDirection {
        self.direction
    }

    pub fn kind(&self) -> PortKind {
        match &self.buffer {
            PortBuffer::Audio(_) => PortKind::Audio,
            PortBuffer::Cv(_) => PortKind::Cv,
            PortBuffer::Event(_) => PortKind::Event,
        }
    }

    /// Reset the buffer for a new cycle: zero samples, drop events.
    ///
    /// Called at the top of every audio cycle before any plugin reads.
    pub fn init_buffer(&mut self) {
        match &mut self.buffer {
            PortBuffer::Audio(samples) | PortBuffer::Cv(samples) => samples.fill(0.0),
            PortBuffer::Event(events) => events.clear(),
        }
    }

    /// Re-size sample storage for a new block length. Control thread only.
    pub fn set_block_size(&mut self, frames: u32) {
        if let PortBuffer::Audio(samples) | PortBuffer::Cv(samples) = &mut self.buffer {
            samples.resize(frames as usize, 0.0);
            samples.fill(0.0);
        }
    }

    pub fn audio_data(&self) -> Option<&[f32]> {
        match &self.buffer {
            PortBuffer::Audio(samples) | PortBuffer::Cv(samples) => Some(samples),
            PortBuffer::Event(_) => None,
        }
    }

    pub fn audio_data_mut(&mut self) -> Option<&mut [f32]> {
        match &mut self.buffer {
            PortBuffer::Audio(samples) | PortBuffer::Cv(samples) => Some(samples),
            PortBuffer::Event(_) => None,
        }
    }

    pub fn event_buffer(&self) -> Option<&EventBuffer> {
        match &self.buffer {
            PortBuffer::Event(events) => Some(events),
            _ => None,
        }
    }

    pub fn event_buffer_mut(&mut self) -> Option<&mut EventBuffer> {
        match &mut self.buffer {
            PortBuffer::Event(events) => Some(events),
            _ => None,
        }
    }

    /// Commit a CV port's local buffer into a backend stream at the given
    /// frame offset within the destination.
    pub fn write_cv(&self, dst: &mut [f32], frames: u32, time_offset: u32) -> Result<()> {
        let samples = match &self.buffer {
            PortBuffer::Cv(samples) => samples,
            _ => return Err(Error::UnsupportedOperation("write_cv on a non-CV port")),
        };
        let frames = frames as usize;
        let offset = time_offset as usize;
        if frames > samples.len() || offset + frames > dst.len() {
            return Err(Error::InvalidArgument(format!(
                "CV write of {frames} frames at offset {offset} exceeds destination"
            )));
        }
        dst[offset..offset + frames].copy_from_slice(&samples[..frames]);
        Ok(())
    }
}
