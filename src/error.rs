//! Normalized error type for every call into the teacher backend.
//!
//! Transport failures, error envelopes and client-side validation all end
//! up as one `ApiError` carrying a human-readable message.

use thiserror::Error;

use crate::config::ConfigError;

/// Message shown when a request is aborted by its timer or by the caller.
pub const TIMEOUT_MESSAGE: &str = "Timeout or cancelled";

/// Errors returned by the request and upload clients.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Per-attempt timer fired or the caller cancelled
    #[error("Timeout or cancelled")]
    Timeout,

    /// No response was received
    #[error("{message}")]
    Network { message: String },

    /// Non-2xx status or an envelope with `ok: false`
    #[error("{message}")]
    Server { status: Option<u16>, message: String },

    /// Rejected before any request was issued
    #[error("{0}")]
    Validation(String),

    /// Upload rejected by the server or the transport
    #[error("{message}")]
    Upload { message: String },

    /// Upload exceeded its timeout
    #[error("Upload timeout")]
    UploadTimeout,

    /// Envelope succeeded but a payload key had the wrong shape
    #[error("Unexpected '{key}' payload: {message}")]
    Decode { key: String, message: String },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ApiError {
    /// Transport status attached to the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => *status,
            _ => None,
        }
    }

    /// Whether this failure came from the client side before any I/O.
    pub fn is_validation(&self) -> bool {
        matches!(self, ApiError::Validation(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Timeout | ApiError::UploadTimeout)
    }

    /// Get error type string for logs
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Timeout => "timeout",
            ApiError::Network { .. } => "network_error",
            ApiError::Server { status: Some(s), .. } if *s >= 500 => "server_error",
            ApiError::Server { .. } => "request_rejected",
            ApiError::Validation(_) => "validation_error",
            ApiError::Upload { .. } => "upload_error",
            ApiError::UploadTimeout => "upload_timeout",
            ApiError::Decode { .. } => "decode_error",
            ApiError::Config(_) => "config_error",
        }
    }
}

/// True for statuses the GET retry policy treats as transient.
pub fn is_retryable_status(status: u16) -> bool {
    status >= 500
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_is_fixed() {
        assert_eq!(ApiError::Timeout.to_string(), TIMEOUT_MESSAGE);
        assert!(ApiError::Timeout.is_timeout());
    }

    #[test]
    fn server_error_displays_message_only() {
        let err = ApiError::Server {
            status: Some(403),
            message: "Not your group".to_string(),
        };
        assert_eq!(err.to_string(), "Not your group");
        assert_eq!(err.status(), Some(403));
        assert_eq!(err.error_type(), "request_rejected");
    }

    #[test]
    fn five_hundreds_are_retryable() {
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(200));
    }
}
