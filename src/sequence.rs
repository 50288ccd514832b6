//! # Packet Sequencing Module
//!
//! Tracks the 8-bit wrapping notification counter of one stream and keeps
//! the stream's sample clock aligned across lost notifications.
//!
//! ## Clock
//! The clock counts elapsed sample slots as an integer and converts to
//! milliseconds on read, so long gap-free runs land exactly on
//! `slots × interval` instead of drifting through repeated float addition.
//!
//! ## States
//! - `Unset`: no packet seen yet, the next `update` only records the sequence
//! - `Tracking`: every `update` counts the sequence numbers skipped since the last one

/// Number of distinct sequence values before the counter wraps
const SEQUENCE_SPACE: u32 = 256;

/// Tracker state. `Tracking` is terminal for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Unset,
    Tracking { last_sequence: u8 },
}

/// A detected run of lost notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingRange {
    pub previous_sequence: u8,
    pub current_sequence: u8,
    pub count: u32,
}

impl MissingRange {
    /// Diagnostic line written to durable sinks
    pub fn to_record(&self) -> String {
        format!(
            "# missed {} packets - last was {} but received {}",
            self.count, self.previous_sequence, self.current_sequence
        )
    }
}

#[derive(Debug, Clone)]
pub struct SequenceTracker {
    state: TrackerState,
    sample_interval_ms: f64,
    elapsed_slots: u64,
}

impl SequenceTracker {
    pub fn new(sample_interval_ms: f64) -> Self {
        Self {
            state: TrackerState::Unset,
            sample_interval_ms,
            elapsed_slots: 0,
        }
    }

    /// Register the sequence number of a newly arrived packet.
    ///
    /// Returns how many packets were skipped since the previous one and moves
    /// the clock forward by that many sample intervals. The first call after
    /// construction returns 0 and leaves the clock untouched.
    pub fn update(&mut self, sequence: u8) -> u32 {
        let missing = match self.state {
            TrackerState::Unset => 0,
            TrackerState::Tracking { last_sequence } => missing_between(last_sequence, sequence),
        };

        self.state = TrackerState::Tracking { last_sequence: sequence };
        self.elapsed_slots += u64::from(missing);
        missing
    }

    /// Like `update`, but packages a non-zero gap as a `MissingRange`
    pub fn track(&mut self, sequence: u8) -> Option<MissingRange> {
        let previous = self.last_sequence();
        let count = self.update(sequence);

        match previous {
            Some(previous_sequence) if count > 0 => Some(MissingRange {
                previous_sequence,
                current_sequence: sequence,
                count,
            }),
            _ => None,
        }
    }

    /// Timestamp for the next physical sample; advances the clock by one interval
    pub fn stamp(&mut self) -> f64 {
        let timestamp = self.clock_ms();
        self.elapsed_slots += 1;
        timestamp
    }

    pub fn clock_ms(&self) -> f64 {
        self.elapsed_slots as f64 * self.sample_interval_ms
    }

    pub fn last_sequence(&self) -> Option<u8> {
        match self.state {
            TrackerState::Unset => None,
            TrackerState::Tracking { last_sequence } => Some(last_sequence),
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> TrackerState {
        self.state
    }
}

/// Packets skipped going forward from `last` to `current` on the 256-value ring.
///
/// A forward distance of 1 is the only gap-free step. A distance of 0 means the
/// counter came all the way around, since duplicates are not expected on the link.
fn missing_between(last: u8, current: u8) -> u32 {
    let distance = u32::from(current.wrapping_sub(last));
    (distance + SEQUENCE_SPACE - 1) % SEQUENCE_SPACE
}
