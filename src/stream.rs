//! # Stream Processing Module
//!
//! Per-stream state and the decode-and-emit step run for every notification.
//!
//! ## Key Types
//! - `EcgStreamState` / `MotionStreamState`: own one stream's sequence tracker
//!   and frame decoder. Never shared between streams or threads.
//! - `StreamDecoder`: the common seam both states implement
//! - `StreamProcessor`: pairs a state with its `SampleEmitter`
//!
//! ## Per-packet Order
//! 1. Split the sequence number off the notification
//! 2. Update the tracker; a gap moves the clock forward and is reported
//! 3. Decode the payload
//! 4. Stamp each physical sample with the clock, one interval per sample
//! 5. Queue the rendered records on the emitter

use crate::acc::AccFrameDecoder;
use crate::ecg::EcgFrameDecoder;
use crate::emitter::SampleEmitter;
use crate::leads::map_leads;
use crate::packet::Packet;
use crate::sample::{EcgSample, MotionSample, Record};
use crate::sequence::{MissingRange, SequenceTracker};
use crate::status::DeviceStatus;
use std::sync::Arc;

/// Result of decoding one packet
#[derive(Debug)]
pub struct Decoded<T> {
    pub missing: Option<MissingRange>,
    pub samples: Vec<T>,
}

pub trait StreamDecoder: Send {
    type Sample: Record;

    /// Short stream tag used in logs
    fn label(&self) -> &'static str;

    fn decode(&mut self, packet: Packet<'_>) -> Decoded<Self::Sample>;

    /// Decoded values still waiting to complete a sample
    fn pending(&self) -> usize {
        0
    }
}

pub struct EcgStreamState {
    tracker: SequenceTracker,
    decoder: EcgFrameDecoder,
    status: Arc<DeviceStatus>,
}

impl EcgStreamState {
    pub fn new(sample_interval_ms: f64, status: Arc<DeviceStatus>) -> Self {
        Self {
            tracker: SequenceTracker::new(sample_interval_ms),
            decoder: EcgFrameDecoder::new(),
            status,
        }
    }

    #[cfg(test)]
    pub fn tracker(&self) -> &SequenceTracker {
        &self.tracker
    }
}

impl StreamDecoder for EcgStreamState {
    type Sample = EcgSample;

    fn label(&self) -> &'static str {
        "ecg"
    }

    fn decode(&mut self, packet: Packet<'_>) -> Decoded<EcgSample> {
        let missing = self.tracker.track(packet.sequence);

        let samples = self
            .decoder
            .decode(packet.payload)
            .iter()
            .map(|leads| EcgSample {
                timestamp_ms: self.tracker.stamp(),
                channels: map_leads(leads),
                metadata: self.status.metadata(),
            })
            .collect();

        Decoded { missing, samples }
    }

    fn pending(&self) -> usize {
        self.decoder.pending_len()
    }
}

pub struct MotionStreamState {
    tracker: SequenceTracker,
    decoder: AccFrameDecoder,
}

impl MotionStreamState {
    pub fn new(sample_interval_ms: f64) -> Self {
        Self {
            tracker: SequenceTracker::new(sample_interval_ms),
            decoder: AccFrameDecoder::new(),
        }
    }

    #[cfg(test)]
    pub fn tracker(&self) -> &SequenceTracker {
        &self.tracker
    }
}

impl StreamDecoder for MotionStreamState {
    type Sample = MotionSample;

    fn label(&self) -> &'static str {
        "acc"
    }

    fn decode(&mut self, packet: Packet<'_>) -> Decoded<MotionSample> {
        let missing = self.tracker.track(packet.sequence);

        let samples = self
            .decoder
            .decode(packet.payload)
            .into_iter()
            .map(|values| MotionSample {
                timestamp_ms: self.tracker.stamp(),
                values,
            })
            .collect();

        Decoded { missing, samples }
    }
}

/// One stream's state plus the emitter its records go to
pub struct StreamProcessor<D: StreamDecoder> {
    state: D,
    emitter: SampleEmitter,
    packets: u64,
    samples: u64,
    missed: u64,
}

impl<D: StreamDecoder> StreamProcessor<D> {
    pub fn new(state: D, emitter: SampleEmitter) -> Self {
        Self {
            state,
            emitter,
            packets: 0,
            samples: 0,
            missed: 0,
        }
    }

    /// Decode one raw notification and queue its records. Returns the sample count.
    pub fn process(&mut self, notification: &[u8]) -> usize {
        let label = self.state.label();
        let packet = match Packet::parse(notification) {
            Ok(packet) => packet,
            Err(e) => {
                log::warn!("[{}] Dropping notification: {}", label, e);
                return 0;
            }
        };

        let decoded = self.state.decode(packet);
        self.packets += 1;

        if let Some(range) = decoded.missing {
            let line = range.to_record();
            log::warn!("[{}] {}", label, line);
            self.missed += u64::from(range.count);
            self.emitter.emit_diagnostic(line);
        }

        let count = decoded.samples.len();
        for sample in &decoded.samples {
            let record = sample.to_record();
            log::trace!("[{}] {}", label, record);
            self.emitter.emit(record);
        }
        self.samples += count as u64;

        count
    }

    pub fn flush(&self) {
        self.emitter.flush();
    }

    /// Stop emission and report totals; queued records are delivered first
    pub fn finish(self) -> StreamSummary {
        let pending = self.state.pending();
        if pending > 0 {
            log::debug!("[{}] Dropping {} values of an incomplete sample", self.state.label(), pending);
        }

        let summary = StreamSummary {
            label: self.state.label(),
            packets: self.packets,
            samples: self.samples,
            missed_packets: self.missed,
        };
        self.emitter.finish();
        summary
    }
}

/// Per-stream totals reported when a session ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSummary {
    pub label: &'static str,
    pub packets: u64,
    pub samples: u64,
    pub missed_packets: u64,
}
