//! # Sample Emission Module
//!
//! Moves record delivery off the decoding path. Decoding pushes rendered
//! records into a channel and returns at once; a writer thread drains the
//! channel into the stream's `FanOut`.
//!
//! ## Ordering
//! One emitter per stream, one FIFO channel per emitter, one writer thread
//! per channel: every sink sees a stream's records in arrival order.
//!
//! ## Shutdown
//! Dropping the emitter sends `Stop`; the writer handles everything queued
//! before it, flushes all sinks, and exits. `Drop` joins the thread.

use crate::sink::FanOut;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::thread;

/// Command sent from the decoding side to the writer thread
#[derive(Debug)]
enum EmitterCommand {
    /// Sample record for every sink
    Record(String),
    /// Diagnostic line for durable sinks
    Diagnostic(String),
    /// Flush all sinks
    Flush,
    /// Flush and exit
    Stop,
}

pub struct SampleEmitter {
    label: &'static str,
    command_tx: Sender<EmitterCommand>,
    writer_thread: Option<thread::JoinHandle<FanOut>>,
}

impl SampleEmitter {
    /// Start a writer thread delivering to `sinks`.
    ///
    /// `label` names the stream in log messages and the thread name.
    pub fn spawn(label: &'static str, sinks: FanOut) -> std::io::Result<Self> {
        let (command_tx, command_rx) = unbounded();

        let writer_thread = thread::Builder::new()
            .name(format!("{}-emitter", label))
            .spawn(move || Self::writer_loop(label, command_rx, sinks))?;

        Ok(Self {
            label,
            command_tx,
            writer_thread: Some(writer_thread),
        })
    }

    /// Queue a sample record. Never blocks on sink I/O.
    pub fn emit(&self, record: String) {
        self.send(EmitterCommand::Record(record));
    }

    /// Queue a diagnostic line for durable sinks
    pub fn emit_diagnostic(&self, line: String) {
        self.send(EmitterCommand::Diagnostic(line));
    }

    pub fn flush(&self) {
        self.send(EmitterCommand::Flush);
    }

    /// Stop the writer and hand back the sinks once everything queued is delivered
    pub fn finish(mut self) -> Option<FanOut> {
        self.stop()
    }

    fn stop(&mut self) -> Option<FanOut> {
        let handle = self.writer_thread.take()?;
        let _ = self.command_tx.send(EmitterCommand::Stop);

        match handle.join() {
            Ok(sinks) => Some(sinks),
            Err(_) => {
                log::error!("{} emitter thread panicked", self.label);
                None
            }
        }
    }

    fn send(&self, command: EmitterCommand) {
        if self.command_tx.send(command).is_err() {
            log::error!("{} emitter thread is gone, record dropped", self.label);
        }
    }

    fn writer_loop(label: &'static str, command_rx: Receiver<EmitterCommand>, mut sinks: FanOut) -> FanOut {
        log::debug!("{} emitter started with {} sinks", label, sinks.len());

        loop {
            match command_rx.recv() {
                Ok(EmitterCommand::Record(record)) => sinks.emit(&record),
                Ok(EmitterCommand::Diagnostic(line)) => sinks.emit_diagnostic(&line),
                Ok(EmitterCommand::Flush) => sinks.flush(),
                Ok(EmitterCommand::Stop) => {
                    sinks.flush();
                    log::debug!("{} emitter stopped", label);
                    break;
                }
                Err(_) => {
                    sinks.flush();
                    log::info!("{} emitter: command channel closed", label);
                    break;
                }
            }
        }

        for (name, failures) in sinks.failures() {
            if failures > 0 {
                log::warn!("{} sink {} failed {} times this session", label, name, failures);
            }
        }

        sinks
    }
}

impl Drop for SampleEmitter {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::tests::{FailingSink, MemorySink, PanickingSink};

    #[test]
    fn test_records_arrive_in_order() {
        let memory = MemorySink::default();
        let mut sinks = FanOut::new();
        sinks.add_sink(Box::new(memory.clone()));

        let emitter = SampleEmitter::spawn("test", sinks).unwrap();
        for i in 0..500 {
            emitter.emit(i.to_string());
        }
        drop(emitter);

        let lines = memory.lines.lock().unwrap();
        let expected: Vec<String> = (0..500).map(|i: i32| i.to_string()).collect();
        assert_eq!(*lines, expected);
    }

    #[test]
    fn test_failing_sink_is_contained() {
        let memory = MemorySink { durable: true, ..MemorySink::default() };
        let mut sinks = FanOut::new();
        sinks.add_sink(Box::new(FailingSink));
        sinks.add_sink(Box::new(memory.clone()));

        let emitter = SampleEmitter::spawn("test", sinks).unwrap();
        emitter.emit("0,1".to_string());
        emitter.emit_diagnostic("# missed 1 packets - last was 3 but received 5".to_string());
        emitter.flush();

        let sinks = emitter.finish().unwrap();
        assert_eq!(memory.lines.lock().unwrap().len(), 2);
        assert!(sinks.failures()[0].1 >= 2);
    }

    #[test]
    fn test_writer_survives_panicking_sink() {
        let memory = MemorySink::default();
        let mut sinks = FanOut::new();
        sinks.add_sink(Box::new(PanickingSink { seen: 0 }));
        sinks.add_sink(Box::new(memory.clone()));

        let emitter = SampleEmitter::spawn("test", sinks).unwrap();
        for i in 0..10 {
            emitter.emit(i.to_string());
        }

        // the writer thread hands its sinks back, so it never unwound
        let sinks = emitter.finish().unwrap();
        assert_eq!(memory.lines.lock().unwrap().len(), 10);
        assert_eq!(sinks.failures()[0].1, 1);
    }
}
