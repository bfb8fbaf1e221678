//! Continuous-rack processing: a fixed stereo chain in slot-id order.

use super::{BusEvent, EventMerger, EventSource, BROADCAST};
use crate::callback::CallbackOpcode;
use crate::driver::DriverBlock;
use crate::mailbox::{ControlEventRecord, DeferredCallback, DeferredQueue};
use crate::port::EVENT_BUFFER_CAPACITY;
use crate::registry::Snapshot;
use attacca_plugin::{EngineEvent, EventPayload, EventVec, ProcessContext, TimeInfo};

/// Shared event-bus capacity for one rack cycle.
const BUS_CAPACITY: usize = 4 * EVENT_BUFFER_CAPACITY;

/// Whether a bus entry is delivered to the given slot.
fn event_for_slot(entry: &BusEvent, slot_id: u32, channel_mask: u16) -> bool {
    if entry.target != BROADCAST && entry.target != slot_id {
        return false;
    }
    match entry.event.payload {
        EventPayload::Midi(_) => channel_mask & (1u16 << entry.event.channel.min(15)) != 0,
        EventPayload::Control(_) => true,
    }
}

/// Pre-allocated state for the rack pipeline. Audio thread only.
pub(crate) struct RackGraph {
    work_in: [Vec<f32>; 2],
    work_out: [Vec<f32>; 2],
    bus: EventMerger,
    bus_out: Vec<EngineEvent>,
    slot_events: Vec<EngineEvent>,
    produced: EventVec,
}

impl RackGraph {
    pub fn new(buffer_size: u32) -> Self {
        let frames = buffer_size as usize;
        Self {
            work_in: [vec![0.0; frames], vec![0.0; frames]],
            work_out: [vec![0.0; frames], vec![0.0; frames]],
            bus: EventMerger::new(BUS_CAPACITY),
            bus_out: Vec::with_capacity(BUS_CAPACITY),
            slot_events: Vec::with_capacity(BUS_CAPACITY),
            produced: EventVec::new(),
        }
    }

    /// Re-size working buffers. Control thread, audio stopped.
    pub fn set_block_size(&mut self, buffer_size: u32) {
        let frames = buffer_size as usize;
        for channel in self.work_in.iter_mut().chain(self.work_out.iter_mut()) {
            channel.resize(frames, 0.0);
        }
    }

    /// Run one rack cycle over the active snapshot.
    pub fn process(
        &mut self,
        snapshot: &Snapshot,
        block: &mut DriverBlock<'_, '_>,
        time: TimeInfo,
        control: &[ControlEventRecord],
        sample_rate: f64,
        deferred: &DeferredQueue,
    ) {
        let RackGraph {
            work_in,
            work_out,
            bus,
            bus_out,
            slot_events,
            produced,
        } = self;

        let frames = (block.frames as usize).min(work_in[0].len());
        let frames_u32 = frames as u32;

        // Stage the backend input into the working pair.
        for channel in 0..2 {
            match block.audio_in.get(channel) {
                Some(input) => work_in[channel][..frames].copy_from_slice(&input[..frames]),
                None => work_in[channel][..frames].fill(0.0),
            }
        }

        // Build the shared input bus: mailbox drain first, backend MIDI after.
        bus.clear();
        bus_out.clear();
        for record in control {
            bus.add(
                record.plugin_id,
                record.event,
                EventSource::ControlMailbox,
                frames_u32,
            );
        }
        for event in block.midi_in {
            bus.add(BROADCAST, *event, EventSource::BackendMidi, frames_u32);
        }
        let merged = bus.finish();

        for (id, slot) in snapshot.iter() {
            if !slot.is_enabled() {
                continue;
            }

            slot_events.clear();
            let mask = slot.midi_channel_mask();
            for entry in merged {
                if event_for_slot(entry, id, mask) && slot_events.len() < slot_events.capacity() {
                    slot_events.push(entry.event);
                }
            }

            let mut instance = match slot.try_instance() {
                Some(guard) => guard,
                // A control operation holds the plugin this cycle: the slot
                // is skipped and the chain passes through unchanged.
                None => continue,
            };

            let counts = slot.port_counts();
            let n_in = counts.audio_in.min(2) as usize;
            let n_out = counts.audio_out.min(2) as usize;

            slot.peaks.update_channel(0, &work_in[0][..frames]);
            slot.peaks.update_channel(1, &work_in[1][..frames]);

            produced.clear();
            {
                let mut ctx = ProcessContext::new(
                    sample_rate,
                    frames_u32,
                    time,
                    produced,
                    EVENT_BUFFER_CAPACITY,
                );
                let (in_l, in_r) = work_in.split_at(1);
                let ins_full: [&[f32]; 2] = [&in_l[0][..frames], &in_r[0][..frames]];
                let (out_l, out_r) = work_out.split_at_mut(1);
                let mut outs_full: [&mut [f32]; 2] =
                    [&mut out_l[0][..frames], &mut out_r[0][..frames]];
                instance.process(
                    &ins_full[..n_in],
                    &mut outs_full[..n_out],
                    frames_u32,
                    slot_events,
                    &mut ctx,
                );
            }
            drop(instance);

            for event in produced.iter() {
                if bus_out.len() < bus_out.capacity() {
                    bus_out.push(*event);
                }
            }

            // A pure event processor leaves the audio chain untouched.
            if n_out == 0 {
                continue;
            }

            // Mono output: duplicate or pass the right channel through.
            if n_out == 1 {
                let (out_l, out_r) = work_out.split_at_mut(1);
                if counts.audio_in <= 1 && n_in == 1 {
                    out_r[0][..frames].copy_from_slice(&out_l[0][..frames]);
                } else {
                    out_r[0][..frames].copy_from_slice(&work_in[1][..frames]);
                }
            }

            let ok_l = slot.peaks.update_channel(2, &work_out[0][..frames]);
            let ok_r = slot.peaks.update_channel(3, &work_out[1][..frames]);
            if !ok_l || !ok_r {
                // Non-finite output: silence the block, quarantine the slot
                // and report at the next idle. Peaks keep their last value.
                work_out[0][..frames].fill(0.0);
                work_out[1][..frames].fill(0.0);
                slot.disable();
                deferred.push_rt(
                    DeferredCallback::new(CallbackOpcode::Error, id).string(slot.name_index()),
                );
            }

            std::mem::swap(work_in, work_out);
        }

        // The working input pair now holds the end of the chain.
        for channel in 0..2 {
            if let Some(output) = block.audio_out.get_mut(channel) {
                output[..frames].copy_from_slice(&work_in[channel][..frames]);
            }
        }
        for event in bus_out.iter() {
            block.midi_out.push(*event);
        }
    }
}
