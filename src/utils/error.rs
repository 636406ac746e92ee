//! Error types and handling
//!
//! Common error types used across the application. The variants mirror the
//! failure classes a recording session can run into, from missing platform
//! capabilities to a folder that disappeared underneath us.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The user dismissed a platform dialog. Callers treat this as a normal outcome.
    #[error("Cancelled: {0}")]
    UserCancelled(String),

    #[error("Acquisition failed: {0}")]
    AcquisitionFailed(String),

    #[error("Persistence failed: {0}")]
    PersistenceFailed(String),

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /// Whether this error is a user cancellation rather than a failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, AppError::UserCancelled(_))
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotSupported(_) => "NOT_SUPPORTED",
            AppError::PermissionDenied(_) => "PERMISSION_DENIED",
            AppError::DeviceUnavailable(_) => "DEVICE_UNAVAILABLE",
            AppError::UserCancelled(_) => "USER_CANCELLED",
            AppError::AcquisitionFailed(_) => "ACQUISITION_FAILED",
            AppError::PersistenceFailed(_) => "PERSISTENCE_FAILED",
            AppError::InvalidSelection(_) => "INVALID_SELECTION",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

/// Error response for frontend
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        ErrorResponse {
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
