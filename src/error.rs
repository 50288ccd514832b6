//! # Error Types Module
//!
//! Centralized error handling for the telemetry decoder.
//! Each concern gets its own enum so callers can match on what actually went wrong.
//!
//! ## Error Types
//! - `PacketError`: Notification buffers that cannot be split into sequence + payload
//! - `SinkError`: Failures inside a single output sink (contained by the fan-out)
//! - `ConfigError`: Configuration file I/O and parsing errors
//! - `SessionError`: Failures while opening or driving a recording session
//!
//! Decoding itself has no error type: truncated payloads decode whatever
//! complete units they carry, and sequence gaps are compensated, not raised.

use std::fmt;

/// Errors raised while splitting a raw notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    /// Notification carried no bytes at all, not even a sequence number
    Empty,
}

impl fmt::Display for PacketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketError::Empty => write!(f, "Empty notification: no sequence number"),
        }
    }
}

impl std::error::Error for PacketError {}

/// Errors that can occur inside an individual sink
#[derive(Debug)]
pub enum SinkError {
    /// Write or flush on durable storage failed
    Io(std::io::Error),
    /// Receiving end of the bus has gone away
    Disconnected { topic: String },
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::Io(e) => write!(f, "Sink write failed: {}", e),
            SinkError::Disconnected { topic } => {
                write!(f, "Bus disconnected, cannot publish to {}", topic)
            }
        }
    }
}

impl std::error::Error for SinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SinkError::Io(e) => Some(e),
            SinkError::Disconnected { .. } => None,
        }
    }
}

impl From<std::io::Error> for SinkError {
    fn from(e: std::io::Error) -> Self {
        SinkError::Io(e)
    }
}

/// Errors that can occur during configuration operations
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read config file
    ReadFailed(std::io::Error),
    /// Failed to write config file
    WriteFailed(std::io::Error),
    /// Failed to parse config file
    ParseFailed(toml::de::Error),
    /// Failed to serialize config
    SerializeFailed(toml::ser::Error),
    /// A setting holds a value the decoder cannot work with
    InvalidValue { field: &'static str, value: f64 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ReadFailed(e) => {
                write!(f, "Failed to read config file: {}", e)
            }
            ConfigError::WriteFailed(e) => {
                write!(f, "Failed to write config file: {}", e)
            }
            ConfigError::ParseFailed(e) => {
                write!(f, "Failed to parse config file: {}", e)
            }
            ConfigError::SerializeFailed(e) => {
                write!(f, "Failed to serialize config: {}", e)
            }
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid config value {} = {}: must be a positive finite number", field, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadFailed(e) => Some(e),
            ConfigError::WriteFailed(e) => Some(e),
            ConfigError::ParseFailed(e) => Some(e),
            ConfigError::SerializeFailed(e) => Some(e),
            ConfigError::InvalidValue { .. } => None,
        }
    }
}

/// Errors that can occur while opening or feeding a session
#[derive(Debug)]
pub enum SessionError {
    /// Output directory could not be created
    OutputDir(std::io::Error),
    /// A recording file could not be opened for append
    SinkOpen { path: String, source: std::io::Error },
    /// Worker thread could not be started
    ThreadSpawn(std::io::Error),
    /// Settings rejected before any stream was started
    InvalidConfig(ConfigError),
    /// Stream worker has already shut down
    Closed(&'static str),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::OutputDir(e) => {
                write!(f, "Failed to create output directory: {}", e)
            }
            SessionError::SinkOpen { path, source } => {
                write!(f, "Failed to open recording file {}: {}", path, source)
            }
            SessionError::ThreadSpawn(e) => {
                write!(f, "Failed to spawn stream worker: {}", e)
            }
            SessionError::InvalidConfig(e) => write!(f, "{}", e),
            SessionError::Closed(stream) => {
                write!(f, "The {} stream worker is no longer running", stream)
            }
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::OutputDir(e) => Some(e),
            SessionError::SinkOpen { source, .. } => Some(source),
            SessionError::ThreadSpawn(e) => Some(e),
            SessionError::InvalidConfig(e) => Some(e),
            SessionError::Closed(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_packet_error_display() {
        assert!(PacketError::Empty.to_string().contains("sequence"));
    }

    #[test]
    fn test_sink_error_chain() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err = SinkError::from(io_err);
        assert!(err.source().is_some());

        let err = SinkError::Disconnected { topic: "vest/ecg".to_string() };
        assert!(err.source().is_none());
        assert!(err.to_string().contains("vest/ecg"));
    }

    #[test]
    fn test_config_error_chain() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ConfigError::ReadFailed(io_err);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_invalid_value_display() {
        let err = ConfigError::InvalidValue { field: "acc_sample_rate_hz", value: 0.0 };
        assert!(err.to_string().contains("acc_sample_rate_hz = 0"));
        assert!(err.source().is_none());

        let err = SessionError::InvalidConfig(err);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_session_error_display() {
        let err = SessionError::Closed("ecg");
        assert_eq!(err.to_string(), "The ecg stream worker is no longer running");
    }
}
