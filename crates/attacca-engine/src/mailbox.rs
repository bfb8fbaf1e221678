//! Mailboxes between the control thread and the audio thread.
//!
//! Control → RT: a single-producer/single-consumer ring of pre-allocated
//! event records, drained at the top of each cycle. RT → control: a
//! fixed-capacity queue of deferred callbacks whose string payloads are
//! indices into a control-side intern table, so the audio thread only ever
//! moves plain integers.

use crate::callback::CallbackOpcode;
use crate::error::{Error, Result};
use attacca_plugin::EngineEvent;
use crossbeam::queue::ArrayQueue;
use parking_lot::Mutex;
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

/// Default capacity of the control → RT event ring.
pub const CONTROL_RING_CAPACITY: usize = 1024;
/// Capacity of the RT → control deferred callback queue.
pub const DEFERRED_QUEUE_CAPACITY: usize = 512;
/// Maximum number of interned strings.
pub const STRING_TABLE_CAPACITY: usize = 256;
/// Sentinel for "no string payload".
pub const NO_STRING: u32 = u32::MAX;

/// One control-thread submission, addressed to a plugin slot.
#[derive(Debug, Clone, Copy)]
pub struct ControlEventRecord {
    pub plugin_id: u32,
    pub event: EngineEvent,
}

/// Control-thread side of the event mailbox.
pub struct ControlMailboxTx {
    producer: Mutex<HeapProd<ControlEventRecord>>,
}

impl ControlMailboxTx {
    /// Submit an event record.
    ///
    /// Returns [`Error::Backpressure`] when the ring is full; callers retry
    /// at `idle()` granularity.
    pub fn push(&self, record: ControlEventRecord) -> Result<()> {
        self.producer
            .lock()
            .try_push(record)
            .map_err(|_| Error::Backpressure)
    }
}

/// Audio-thread side of the event mailbox.
pub struct ControlMailboxRx {
    consumer: HeapCons<ControlEventRecord>,
}

impl ControlMailboxRx {
    /// Move every pending record into `scratch`, up to its spare capacity.
    ///
    /// `scratch` is pre-allocated by the caller; this never grows it.
    pub fn drain_into(&mut self, scratch: &mut Vec<ControlEventRecord>) {
        while scratch.len() < scratch.capacity() {
            match self.consumer.try_pop() {
                Some(record) => scratch.push(record),
                None => break,
            }
        }
    }

    pub fn pop(&mut self) -> Option<ControlEventRecord> {
        self.consumer.try_pop()
    }
}

/// Build the SPSC control mailbox pair.
pub fn control_mailbox(capacity: usize) -> (ControlMailboxTx, ControlMailboxRx) {
    let (producer, consumer) = HeapRb::<ControlEventRecord>::new(capacity).split();
    (
        ControlMailboxTx {
            producer: Mutex::new(producer),
        },
        ControlMailboxRx { consumer },
    )
}

/// A callback recorded on the audio thread, delivered at the next `idle()`.
#[derive(Debug, Clone, Copy)]
pub struct DeferredCallback {
    pub opcode: CallbackOpcode,
    pub plugin_id: u32,
    pub v1: i32,
    pub v2: i32,
    pub v3: f32,
    pub string_index: u32,
}

impl DeferredCallback {
    pub fn new(opcode: CallbackOpcode, plugin_id: u32) -> Self {
        Self {
            opcode,
            plugin_id,
            v1: 0,
            v2: 0,
            v3: 0.0,
            string_index: NO_STRING,
        }
    }

    pub fn values(mut self, v1: i32, v2: i32, v3: f32) -> Self {
        self.v1 = v1;
        self.v2 = v2;
        self.v3 = v3;
        self
    }

    pub fn string(mut self, index: u32) -> Self {
        self.string_index = index;
        self
    }
}

/// Fixed-capacity RT → control callback queue.
pub struct DeferredQueue {
    queue: ArrayQueue<DeferredCallback>,
}

impl DeferredQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity),
        }
    }

    /// Enqueue from the audio thread. Returns `false` when full; the
    /// callback is lost rather than blocking the cycle.
    pub fn push_rt(&self, callback: DeferredCallback) -> bool {
        self.queue.push(callback).is_ok()
    }

    pub fn pop(&self) -> Option<DeferredCallback> {
        self.queue.pop()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Control-side string intern table.
///
/// Strings are interned on the control thread (plugin names at add time,
/// fixed diagnostics at engine init); the audio thread references them by
/// index only.
pub struct StringTable {
    strings: Mutex<Vec<String>>,
}

impl Default for StringTable {
    fn default() -> Self {
        Self::new()
    }
}

impl StringTable {
    pub fn new() -> Self {
        Self {
            strings: Mutex::new(Vec::with_capacity(STRING_TABLE_CAPACITY)),
        }
    }

    /// Intern a string, deduplicating. Returns [`NO_STRING`] when the table
    /// is full; resolution then yields an empty string.
    pub fn intern(&self, text: &str) -> u32 {
        let mut strings = self.strings.lock();
        if let Some(index) = strings.iter().position(|s| s == text) {
            return index as u32;
        }
        if strings.len() >= STRING_TABLE_CAPACITY {
            return NO_STRING;
        }
        strings.push(text.to_owned());
        (strings.len() - 1) as u32
    }

    pub fn resolve(&self, index: u32) -> String {
        if index == NO_STRING {
            return String::new();
        }
        self.strings
            .lock()
            .get(index as usize)
            .cloned()
            .unwrap_or_default()
    }
}
