//! # Recording Session Module
//!
//! Wires the two telemetry streams together for one device connection.
//! The connection layer hands notifications to a `Session`; everything
//! after that happens on worker threads owned by the session.
//!
//! ## Threads
//! - One decoder thread per enabled stream, fed over its own channel, so each
//!   stream is processed strictly in arrival order while ECG and motion run
//!   side by side
//! - One emitter thread per stream behind that (see `emitter`)
//!
//! ## Outputs
//! - `<output_dir>/<YYYYmmdd_HHMMSS>.ecg` and `.acc` when `write_files` is set
//! - `<bus_topic>/ecg` and `<bus_topic>/acc` when a topic and a bus are given
//!
//! Closing the session drains both channels, flushes every sink, and joins
//! all threads. Lead values still waiting for a full group are dropped.

use crate::acc::AXIS_NAMES;
use crate::config::Config;
use crate::error::SessionError;
use crate::emitter::SampleEmitter;
use crate::leads::CHANNEL_NAMES;
use crate::sink::{BusMessage, BusSink, FanOut, FileSink};
use crate::status::{DeviceStatus, QrsEstimate};
use crate::stream::{EcgStreamState, MotionStreamState, StreamDecoder, StreamProcessor, StreamSummary};
use crossbeam_channel::{unbounded, Sender};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

/// Telemetry stream carried by a data characteristic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Ecg,
    Acc,
}

impl StreamKind {
    /// Extension of the recording file and suffix of the bus topic
    pub fn suffix(&self) -> &'static str {
        match self {
            StreamKind::Ecg => "ecg",
            StreamKind::Acc => "acc",
        }
    }

    pub fn all() -> [StreamKind; 2] {
        [StreamKind::Ecg, StreamKind::Acc]
    }

    /// Field order of one record line on this stream
    pub fn columns(&self) -> Vec<&'static str> {
        let mut columns = vec!["timestamp"];
        match self {
            StreamKind::Ecg => {
                columns.extend(CHANNEL_NAMES);
                columns.extend(["avg_qrs", "avg_qrs_ms", "is_qrs", "battery"]);
            }
            StreamKind::Acc => columns.extend(AXIS_NAMES),
        }
        columns
    }
}

struct StreamWorker {
    sender: Option<Sender<Vec<u8>>>,
    handle: Option<thread::JoinHandle<StreamSummary>>,
}

impl StreamWorker {
    fn spawn<D>(state: D, sinks: FanOut) -> Result<Self, SessionError>
    where
        D: StreamDecoder + 'static,
    {
        let label = state.label();
        let emitter = SampleEmitter::spawn(label, sinks).map_err(SessionError::ThreadSpawn)?;
        let (sender, receiver) = unbounded::<Vec<u8>>();

        let handle = thread::Builder::new()
            .name(format!("{}-decoder", label))
            .spawn(move || {
                let mut processor = StreamProcessor::new(state, emitter);
                for notification in receiver.iter() {
                    processor.process(&notification);
                    // Push buffered file output through whenever the link goes quiet
                    if receiver.is_empty() {
                        processor.flush();
                    }
                }
                processor.finish()
            })
            .map_err(SessionError::ThreadSpawn)?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    fn send(&self, stream: StreamKind, notification: &[u8]) -> Result<(), SessionError> {
        match &self.sender {
            Some(sender) => sender
                .send(notification.to_vec())
                .map_err(|_| SessionError::Closed(stream.suffix())),
            None => Err(SessionError::Closed(stream.suffix())),
        }
    }

    fn join(&mut self) -> Option<StreamSummary> {
        // Closing the channel ends the decoder loop once it has drained
        self.sender.take();
        let handle = self.handle.take()?;

        match handle.join() {
            Ok(summary) => Some(summary),
            Err(_) => {
                log::error!("Stream decoder thread panicked");
                None
            }
        }
    }
}

/// One recording session with a device
pub struct Session {
    status: Arc<DeviceStatus>,
    ecg: Option<StreamWorker>,
    acc: Option<StreamWorker>,
    recording_paths: Vec<PathBuf>,
}

impl Session {
    /// Open a session with the sinks described by `config`.
    ///
    /// `bus` is the publishing end of the message bus; it is only used when
    /// `config.bus_topic` is set.
    pub fn open(config: &Config, bus: Option<Sender<BusMessage>>) -> Result<Self, SessionError> {
        config.validate().map_err(SessionError::InvalidConfig)?;
        let mut recording_paths = Vec::new();
        let mut ecg_sinks = FanOut::new();
        let mut acc_sinks = FanOut::new();

        if config.write_files {
            std::fs::create_dir_all(&config.output_dir).map_err(SessionError::OutputDir)?;
            let stem = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();

            for (kind, sinks) in [(StreamKind::Ecg, &mut ecg_sinks), (StreamKind::Acc, &mut acc_sinks)] {
                if !Self::is_enabled(config, kind) {
                    continue;
                }
                let path = recording_path(&config.output_dir, &stem, kind);
                let sink = FileSink::open(&path).map_err(|source| SessionError::SinkOpen {
                    path: path.display().to_string(),
                    source,
                })?;
                log::info!(
                    "Recording {} to: {} ({})",
                    kind.suffix(),
                    path.display(),
                    kind.columns().join(",")
                );
                sinks.add_sink(Box::new(sink));
                recording_paths.push(path);
            }
        }

        match (&config.bus_topic, bus) {
            (Some(topic), Some(bus)) => {
                for (kind, sinks) in [(StreamKind::Ecg, &mut ecg_sinks), (StreamKind::Acc, &mut acc_sinks)] {
                    if !Self::is_enabled(config, kind) {
                        continue;
                    }
                    let topic = format!("{}/{}", topic, kind.suffix());
                    log::info!("Publishing {} to topic {}", kind.suffix(), topic);
                    sinks.add_sink(Box::new(BusSink::new(topic, bus.clone())));
                }
            }
            (Some(topic), None) => {
                log::warn!("Bus topic {} configured but no bus connected", topic);
            }
            (None, _) => {}
        }

        let mut session = Self::with_sinks(config, ecg_sinks, acc_sinks)?;
        session.recording_paths = recording_paths;
        Ok(session)
    }

    /// Open a session delivering to caller-supplied sinks
    pub fn with_sinks(config: &Config, ecg_sinks: FanOut, acc_sinks: FanOut) -> Result<Self, SessionError> {
        config.validate().map_err(SessionError::InvalidConfig)?;
        let status = Arc::new(DeviceStatus::new());

        let ecg = if config.record_ecg {
            let state = EcgStreamState::new(config.ecg_sample_interval_ms(), status.clone());
            Some(StreamWorker::spawn(state, ecg_sinks)?)
        } else {
            None
        };

        let acc = if config.record_acc {
            let state = MotionStreamState::new(config.acc_sample_interval_ms());
            Some(StreamWorker::spawn(state, acc_sinks)?)
        } else {
            None
        };

        log::info!(
            "Session opened (ecg: {}, acc: {})",
            config.record_ecg,
            config.record_acc
        );

        Ok(Self {
            status,
            ecg,
            acc,
            recording_paths: Vec::new(),
        })
    }

    fn is_enabled(config: &Config, kind: StreamKind) -> bool {
        match kind {
            StreamKind::Ecg => config.record_ecg,
            StreamKind::Acc => config.record_acc,
        }
    }

    /// Hand over a raw notification from a data characteristic.
    ///
    /// Notifications for a stream this session does not record are ignored.
    pub fn notify(&self, kind: StreamKind, notification: &[u8]) -> Result<(), SessionError> {
        let worker = match kind {
            StreamKind::Ecg => &self.ecg,
            StreamKind::Acc => &self.acc,
        };

        match worker {
            Some(worker) => worker.send(kind, notification),
            None => {
                log::trace!("Ignoring {} notification, stream not recorded", kind.suffix());
                Ok(())
            }
        }
    }

    pub fn notify_ecg(&self, notification: &[u8]) -> Result<(), SessionError> {
        self.notify(StreamKind::Ecg, notification)
    }

    pub fn notify_acc(&self, notification: &[u8]) -> Result<(), SessionError> {
        self.notify(StreamKind::Acc, notification)
    }

    /// Battery characteristic notification or initial read
    pub fn notify_battery(&self, data: &[u8]) {
        self.status.apply_battery_notification(data);
    }

    /// QRS annotation from the features characteristic, attached to later ECG samples
    pub fn set_qrs_estimate(&self, estimate: QrsEstimate) {
        self.status.set_qrs(estimate);
    }

    pub fn recording_paths(&self) -> &[PathBuf] {
        &self.recording_paths
    }

    /// Drain both streams, flush all sinks, and stop every thread
    pub fn close(mut self) -> Vec<StreamSummary> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Vec<StreamSummary> {
        let summaries: Vec<StreamSummary> = [self.ecg.as_mut(), self.acc.as_mut()]
            .into_iter()
            .flatten()
            .filter_map(StreamWorker::join)
            .collect();

        for summary in &summaries {
            log::info!(
                "Session closed [{}]: {} packets, {} samples, {} packets missed",
                summary.label,
                summary.packets,
                summary.samples,
                summary.missed_packets
            );
        }

        summaries
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn recording_path(output_dir: &Path, stem: &str, kind: StreamKind) -> PathBuf {
    output_dir.join(format!("{}.{}", stem, kind.suffix()))
}
