//! Centralized error types for the Aubade core library.
//!
//! Boundary-specific errors (`SoapError`, `ClientError`) live in the modules
//! that produce them; this module defines the application-wide error and
//! re-exports the per-boundary Result aliases.

use thiserror::Error;

use crate::sonos::soap::SoapError;
use crate::sonos::transport::ClientError;

/// Application-wide error type for Aubade services.
#[derive(Debug, Error)]
pub enum AubadeError {
    /// A device call failed in a way that was not absorbed at the client
    /// boundary (typically address validation).
    #[error("Device error: {0}")]
    Device(String),

    /// Settings document could not be read or written.
    #[error("Settings error: {0}")]
    Settings(String),

    /// Session store rejected a write.
    #[error("Session store error: {0}")]
    Session(String),

    /// Holiday calendar synchronization exhausted its retries.
    #[error("Calendar sync failed after {attempts} attempts: {last_error}")]
    CalendarSync {
        /// Number of attempts made before giving up.
        attempts: u32,
        /// Message of the last attempt's failure.
        last_error: String,
    },
}

impl From<ClientError> for AubadeError {
    fn from(err: ClientError) -> Self {
        Self::Device(err.to_string())
    }
}

impl From<SoapError> for AubadeError {
    fn from(err: SoapError) -> Self {
        Self::Device(err.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Result Type Aliases
// ─────────────────────────────────────────────────────────────────────────────

// Re-export Result type aliases from their defining modules
pub use crate::sonos::soap::SoapResult;
pub use crate::sonos::transport::ClientResult;

/// Convenient Result alias for application-wide operations.
pub type AubadeResult<T> = Result<T, AubadeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_error_converts_to_device_variant() {
        let err: AubadeError = ClientError::InvalidAddress("empty".into()).into();
        assert!(matches!(err, AubadeError::Device(_)));
    }

    #[test]
    fn calendar_sync_error_reports_attempts() {
        let err = AubadeError::CalendarSync {
            attempts: 3,
            last_error: "timeout".into(),
        };
        assert!(err.to_string().contains("3 attempts"));
    }
}
