//! # Output Sink Module
//!
//! Destinations for rendered records, composed into a fan-out list.
//!
//! ## Sinks
//! - `FileSink`: append-only recording file, one record per line (durable)
//! - `BusSink`: publishes each record under a topic on an in-process bus;
//!   whatever bridges the bus to a broker drains the receiving end
//! - `FanOut`: delivers a record to every sink it holds
//!
//! A failing sink only affects itself. The fan-out logs the failure, counts
//! it against that sink, and carries on with the next one. A sink that
//! panics is disabled for the rest of the session instead of taking the
//! emitter thread down with it.

use crate::error::SinkError;
use crossbeam_channel::Sender;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

/// An output destination for text records
pub trait RecordSink: Send {
    /// Sink name used in log messages
    fn name(&self) -> &str;

    /// Durable sinks also receive diagnostic lines such as missed packet reports
    fn is_durable(&self) -> bool;

    fn emit(&mut self, record: &str) -> Result<(), SinkError>;

    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Append-only recording file
pub struct FileSink {
    name: String,
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FileSink {
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            name: format!("file:{}", path.display()),
            path,
            writer: BufWriter::new(file),
        })
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn emit(&mut self, record: &str) -> Result<(), SinkError> {
        self.writer.write_all(record.as_bytes())?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// A record published on the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String,
    pub payload: String,
}

/// Publishes records under a fixed topic
pub struct BusSink {
    name: String,
    topic: String,
    publisher: Sender<BusMessage>,
}

impl BusSink {
    pub fn new(topic: impl Into<String>, publisher: Sender<BusMessage>) -> Self {
        let topic = topic.into();
        Self {
            name: format!("bus:{}", topic),
            topic,
            publisher,
        }
    }
}

impl RecordSink for BusSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn emit(&mut self, record: &str) -> Result<(), SinkError> {
        self.publisher
            .send(BusMessage {
                topic: self.topic.clone(),
                payload: record.to_string(),
            })
            .map_err(|_| SinkError::Disconnected { topic: self.topic.clone() })
    }
}

struct SinkSlot {
    sink: Box<dyn RecordSink>,
    failures: u64,
    /// Set once the sink has panicked; it receives nothing afterwards
    disabled: bool,
}

impl SinkSlot {
    /// Run `op` on the sink, turning a panic into a disabled slot
    fn guarded<F>(&mut self, op: F) -> Option<Result<(), SinkError>>
    where
        F: FnOnce(&mut dyn RecordSink) -> Result<(), SinkError>,
    {
        if self.disabled {
            return None;
        }

        let sink = &mut self.sink;
        match panic::catch_unwind(AssertUnwindSafe(|| op(sink.as_mut()))) {
            Ok(result) => Some(result),
            Err(_) => {
                self.failures += 1;
                self.disabled = true;
                log::error!("Sink {} panicked and has been disabled", self.sink.name());
                None
            }
        }
    }
}

/// Delivers every record to all configured sinks independently
#[derive(Default)]
pub struct FanOut {
    slots: Vec<SinkSlot>,
}

impl FanOut {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sink(&mut self, sink: Box<dyn RecordSink>) {
        log::debug!("Adding sink {}", sink.name());
        self.slots.push(SinkSlot {
            sink,
            failures: 0,
            disabled: false,
        });
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Send a sample record to every sink
    pub fn emit(&mut self, record: &str) {
        for slot in self.slots.iter_mut() {
            Self::deliver(slot, record);
        }
    }

    /// Send a diagnostic line to durable sinks only
    pub fn emit_diagnostic(&mut self, line: &str) {
        for slot in self.slots.iter_mut().filter(|s| s.sink.is_durable()) {
            Self::deliver(slot, line);
        }
    }

    pub fn flush(&mut self) {
        for slot in self.slots.iter_mut() {
            if let Some(Err(e)) = slot.guarded(|sink| sink.flush()) {
                slot.failures += 1;
                log::warn!("Failed to flush sink {}: {}", slot.sink.name(), e);
            }
        }
    }

    /// Failure count per sink name, in configuration order
    pub fn failures(&self) -> Vec<(String, u64)> {
        self.slots
            .iter()
            .map(|s| (s.sink.name().to_string(), s.failures))
            .collect()
    }

    fn deliver(slot: &mut SinkSlot, record: &str) {
        if let Some(Err(e)) = slot.guarded(|sink| sink.emit(record)) {
            slot.failures += 1;
            // Only the first failure and then every thousandth is logged
            if slot.failures == 1 || slot.failures % 1000 == 0 {
                log::warn!(
                    "Sink {} failed ({} failures so far): {}",
                    slot.sink.name(),
                    slot.failures,
                    e
                );
            }
        }
    }
}
