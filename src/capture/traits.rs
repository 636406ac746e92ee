//! Capture trait definitions
//!
//! Platform-agnostic view of the media capabilities a recording needs:
//! device enumeration, camera/microphone capture, display capture and
//! encoding. Concrete platforms implement [`MediaPlatform`].

use super::encoder::MediaEncoder;
use super::stream::MediaStream;
use crate::utils::AppError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Permission status for a capability (folder access or media devices)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    #[default]
    Unknown,
    Prompt,
    Granted,
    Denied,
}

/// Kind of device reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaDeviceKind {
    VideoInput,
    AudioInput,
    AudioOutput,
}

/// Raw device entry as reported by the platform
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    /// Hardware id. Empty until the user has granted media permission.
    pub device_id: String,

    /// Physical device grouping (camera and its built-in microphone share one)
    pub group_id: String,

    /// Human readable name, also empty before permission
    pub label: String,

    pub kind: MediaDeviceKind,
}

/// Constraint for one track kind of a capture request
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TrackConstraint {
    /// Do not capture this kind
    #[default]
    Disabled,
    /// Any device of this kind
    Any,
    /// Exactly this device id
    Exact(String),
}

impl TrackConstraint {
    pub fn is_requested(&self) -> bool {
        !matches!(self, TrackConstraint::Disabled)
    }

    /// Exact match when the id is known, otherwise any device
    pub fn for_device_id(device_id: &str) -> Self {
        if device_id.is_empty() {
            TrackConstraint::Any
        } else {
            TrackConstraint::Exact(device_id.to_string())
        }
    }
}

/// Camera/microphone capture request
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MediaConstraints {
    pub video: TrackConstraint,
    pub audio: TrackConstraint,
}

impl MediaConstraints {
    pub fn is_empty(&self) -> bool {
        !self.video.is_requested() && !self.audio.is_requested()
    }
}

/// Failures reported by the platform's capture APIs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The user or the platform refused access
    #[error("access not allowed: {0}")]
    NotAllowed(String),

    #[error("no matching device: {0}")]
    NotFound(String),

    /// Device exists but is busy or broken
    #[error("device not readable: {0}")]
    NotReadable(String),

    #[error("constraints cannot be satisfied: {0}")]
    Overconstrained(String),

    /// The platform dialog was dismissed
    #[error("operation aborted")]
    Aborted,

    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("{0}")]
    Other(String),
}

impl From<CaptureError> for AppError {
    fn from(error: CaptureError) -> Self {
        match error {
            CaptureError::NotAllowed(msg) => AppError::PermissionDenied(msg),
            CaptureError::NotFound(msg) | CaptureError::Overconstrained(msg) => {
                AppError::DeviceUnavailable(msg)
            }
            CaptureError::NotSupported(msg) => AppError::NotSupported(msg),
            CaptureError::Aborted => AppError::AcquisitionFailed("capture aborted".to_string()),
            CaptureError::NotReadable(msg) | CaptureError::Other(msg) => {
                AppError::AcquisitionFailed(msg)
            }
        }
    }
}

/// Map a display-capture failure. Dismissing the source picker surfaces
/// as `NotAllowed` or `Aborted` and is a cancellation, not an error.
pub fn display_capture_error(error: CaptureError) -> AppError {
    match error {
        CaptureError::NotAllowed(_) | CaptureError::Aborted => {
            AppError::UserCancelled("Screen sharing was cancelled".to_string())
        }
        other => other.into(),
    }
}

/// Host media capabilities
///
/// Every async method may suspend indefinitely (for instance while a platform
/// dialog is open); callers must not hold locks across them.
#[async_trait]
pub trait MediaPlatform: Send + Sync {
    /// Whether camera/microphone capture is available
    fn supports_user_media(&self) -> bool;

    /// Whether display capture is available
    fn supports_display_capture(&self) -> bool;

    /// Whether an encoder can be created at all
    fn supports_recording(&self) -> bool;

    /// List all media devices
    async fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>, CaptureError>;

    /// Open a camera and/or microphone stream
    async fn get_user_media(&self, constraints: &MediaConstraints) -> Result<MediaStream, CaptureError>;

    /// Let the user pick a display source and open a video-only stream for it
    async fn get_display_media(&self) -> Result<MediaStream, CaptureError>;

    /// Whether the encoder accepts this mime type
    fn is_type_supported(&self, mime_type: &str) -> bool;

    /// Create an encoder for `stream`. `None` lets the platform choose the format.
    fn create_encoder(
        &self,
        stream: &MediaStream,
        mime_type: Option<&str>,
    ) -> Result<Box<dyn MediaEncoder>, CaptureError>;
}
