//! Error types for the field monitor.
//!
//! Every component reports failures through [`MonitorError`]. Nothing in the
//! listener, tracker or replay paths panics on bad input: malformed packets,
//! unknown robot indices and broken log files all come back as values.
//!
//! ## Error Categories
//!
//! - **Decode Errors**: Truncated or malformed telemetry datagrams
//! - **Config Errors**: Invalid or unparsable configuration
//! - **File Errors**: Problems reading or writing session logs
//! - **Network Errors**: Socket bind and receive failures
//! - **State Errors**: Unknown robot indices, out-of-range seeks, stopped tasks
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use fieldwatch::MonitorError;
//!
//! let error = MonitorError::network("port 7110 already in use");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for monitor operations.
pub type Result<T, E = MonitorError> = std::result::Result<T, E>;

/// Main error type for monitor operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum MonitorError {
    #[error("Packet decode error: {details} (expected {expected} bytes, got {actual})")]
    Decode { details: String, expected: usize, actual: usize },

    #[error("Invalid configuration: {reason}")]
    Config {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Session log error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Network error: {reason}")]
    Network {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Robot index {index} is outside the configured range (0..{robot_count})")]
    UnknownRobot { index: usize, robot_count: usize },

    #[error("Log record at {time} does not name a robot")]
    IncompleteRecord { time: String },

    #[error("Cannot seek to record {index} (log has {len} records)")]
    SeekOutOfRange { index: usize, len: usize },

    #[error("{component} is no longer running")]
    ChannelClosed { component: &'static str },
}

impl MonitorError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            MonitorError::Network { .. } => true,
            MonitorError::Decode { .. } => true,
            MonitorError::File { .. } => false,
            MonitorError::Config { .. } => false,
            MonitorError::UnknownRobot { .. } => false,
            MonitorError::IncompleteRecord { .. } => false,
            MonitorError::SeekOutOfRange { .. } => false,
            MonitorError::ChannelClosed { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            MonitorError::Decode { .. } => vec![
                "Check that senders use the 64-byte telemetry layout",
                "Verify nothing else is transmitting on the robot ports",
            ],
            MonitorError::Config { .. } => vec![
                "Check the YAML syntax of the configuration file",
                "Use positive values for field sizes, markers and timeouts",
                "Keep base_port + robot_count within the u16 port range",
            ],
            MonitorError::File { .. } => vec![
                "Check the log file exists and is readable",
                "Check write permissions on the recording directory",
                "Ensure sufficient disk space",
            ],
            MonitorError::Network { .. } => vec![
                "Check no other monitor instance is bound to the robot ports",
                "Verify the bind address exists on this host",
                "Check firewall rules for inbound UDP",
            ],
            MonitorError::UnknownRobot { .. } => vec![
                "Increase network.robot_count in the configuration",
                "Check the robot index column of the session log",
            ],
            MonitorError::IncompleteRecord { .. } => {
                vec!["Check the session log for truncated lines"]
            }
            MonitorError::SeekOutOfRange { .. } => {
                vec!["Seek to an index below the loaded record count"]
            }
            MonitorError::ChannelClosed { .. } => {
                vec!["Restart the monitor", "Check the log for an earlier task failure"]
            }
        }
    }

    /// Helper constructor for truncated packets.
    pub fn truncated(expected: usize, actual: usize) -> Self {
        MonitorError::Decode { details: "truncated datagram".to_string(), expected, actual }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        MonitorError::Config { reason: reason.into(), source: None }
    }

    /// Helper constructor for log file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        MonitorError::File { path, source }
    }

    /// Helper constructor for network errors.
    pub fn network(reason: impl Into<String>) -> Self {
        MonitorError::Network { reason: reason.into(), source: None }
    }

    /// Helper constructor for network errors with source.
    pub fn network_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        MonitorError::Network { reason: reason.into(), source: Some(source) }
    }
}

impl From<std::io::Error> for MonitorError {
    fn from(err: std::io::Error) -> Self {
        MonitorError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}

impl From<serde_yaml_ng::Error> for MonitorError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        MonitorError::Config {
            reason: "failed to parse YAML configuration".to_string(),
            source: Some(Box::new(err)),
        }
    }
}
