//! Error types for the printer library

use thiserror::Error;

/// Printer error types
#[derive(Debug, Error)]
pub enum PrintError {
    /// Network connection error
    #[error("Connection failed: {0}")]
    Connection(String),

    /// IO error during printing
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Printer is offline or unreachable
    #[error("Printer offline: {0}")]
    Offline(String),

    /// Timeout waiting for printer
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Invalid printer configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Transport not supported on this platform/build
    #[error("Unsupported transport: {0}")]
    Unsupported(String),
}

impl PrintError {
    /// Configuration problems will not fix themselves on retry
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::InvalidConfig(_) | Self::Unsupported(_))
    }
}

/// Result type for printer operations
pub type PrintResult<T> = Result<T, PrintError>;
