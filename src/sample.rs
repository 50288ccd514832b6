//! Decoded samples and their canonical comma-separated text records.
//!
//! ```text
//! ECG:    timestamp,I,II,III,aVR,aVL,aVF,V1,V2,V3,V4,V5,V6,avg_qrs,avg_qrs_ms,is_qrs,battery
//! Motion: timestamp,accelX,accelY,accelZ,gyroX,gyroY,gyroZ
//! ```
//!
//! Numbers are written with `f64`'s shortest round-trip formatting, so no
//! precision is lost between decoding and the record.

use crate::acc::MotionValues;
use crate::leads::Channels;
use std::fmt::Write;

/// Anything that renders to one canonical text record
pub trait Record {
    fn to_record(&self) -> String;
}

/// Per-sample ECG annotations that do not come from the lead data itself
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EcgMetadata {
    /// Running QRS duration estimate in samples
    pub avg_qrs: u32,
    /// Same estimate in milliseconds
    pub avg_qrs_ms: f64,
    /// Sample sits on a detected QRS spike
    pub is_qrs: bool,
    /// Device battery in percent
    pub battery: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EcgSample {
    pub timestamp_ms: f64,
    pub channels: Channels,
    pub metadata: EcgMetadata,
}

impl Record for EcgSample {
    fn to_record(&self) -> String {
        let mut line = join_values(self.timestamp_ms, &self.channels);
        let meta = &self.metadata;
        // Writing to a String cannot fail
        let _ = write!(
            line,
            ",{},{},{},{}",
            meta.avg_qrs,
            meta.avg_qrs_ms,
            u8::from(meta.is_qrs),
            meta.battery
        );
        line
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MotionSample {
    pub timestamp_ms: f64,
    pub values: MotionValues,
}

impl Record for MotionSample {
    fn to_record(&self) -> String {
        join_values(self.timestamp_ms, &self.values)
    }
}

fn join_values(timestamp_ms: f64, values: &[f64]) -> String {
    let mut line = timestamp_ms.to_string();
    for value in values {
        line.push(',');
        let _ = write!(line, "{}", value);
    }
    line
}
