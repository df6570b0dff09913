//! Error types for Touchprint

use thiserror::Error;

/// Errors that can occur while running a stroke session or talking to the matcher
#[derive(Debug, Error)]
pub enum TouchprintError {
    #[error("Invalid user identifier: {0}")]
    InvalidUser(i64),

    #[error("Session is not initialized")]
    NotInitialized,

    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Protocol failure: {0}")]
    ProtocolFailure(String),

    #[error("Server fault (HTTP {status}): {message}")]
    ServerFault { status: u16, message: String },

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl TouchprintError {
    /// Stable machine-readable code, used by the FFI notification queue and the CLI
    pub fn code(&self) -> &'static str {
        match self {
            TouchprintError::InvalidUser(_) => "invalid_user",
            TouchprintError::NotInitialized => "not_initialized",
            TouchprintError::NetworkFailure(_) => "network_failure",
            TouchprintError::ProtocolFailure(_) => "protocol_failure",
            TouchprintError::ServerFault { .. } => "server_fault",
            TouchprintError::JsonError(_) => "json_error",
            TouchprintError::ConfigError(_) => "config_error",
        }
    }
}

impl From<std::io::Error> for TouchprintError {
    fn from(err: std::io::Error) -> Self {
        TouchprintError::NetworkFailure(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_errors_become_network_failures() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err: TouchprintError = io.into();
        assert!(matches!(err, TouchprintError::NetworkFailure(_)));
        assert_eq!(err.code(), "network_failure");
    }

    #[test]
    fn test_server_fault_display() {
        let err = TouchprintError::ServerFault {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "Server fault (HTTP 503): unavailable");
    }
}
