//! Cluster Error Types
//!
//! Error taxonomy for the management-channel subsystem.

use std::fmt;
use std::io;

/// Errors surfaced by the managed cluster connector and its channels.
#[derive(Debug)]
pub enum ClusterError {
    /// Invalid cluster configuration, detected at construction
    Config(String),
    /// Socket bind or send failure
    Io(io::Error),
    /// Operation requires a running channel
    NotRunning,
    /// Outbound send queue is full
    QueueFull,
    /// Failure inside the secure transport layer
    Secure(String),
}

impl fmt::Display for ClusterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterError::Config(msg) => write!(f, "Invalid cluster config: {}", msg),
            ClusterError::Io(e) => write!(f, "I/O error: {}", e),
            ClusterError::NotRunning => write!(f, "Management channel is not running"),
            ClusterError::QueueFull => write!(f, "Management send queue full"),
            ClusterError::Secure(msg) => write!(f, "Secure transport error: {}", msg),
        }
    }
}

impl std::error::Error for ClusterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClusterError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ClusterError {
    fn from(e: io::Error) -> Self {
        ClusterError::Io(e)
    }
}
