//! Recording state management
//!
//! Defines the recording state machine and what a session captures.

use crate::capture::encoder::container_extension;
use crate::devices::permission::{camera_active, microphone_active};
use crate::devices::DeviceSnapshot;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Current state of the recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// No recording in progress
    #[default]
    Idle,
    /// Acquiring streams and starting the encoder
    Starting,
    /// Currently recording
    Recording,
    /// Finalizing and saving
    Stopping,
    /// Failed; needs acknowledgement before the next recording
    Error,
}

/// Observable session state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub status: SessionStatus,

    /// Set only in the `error` state
    pub error_message: Option<String>,

    /// Informational note, e.g. a cancelled screen picker or the saved filename
    pub status_message: Option<String>,
}

/// Sources a recording will capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaptureIntent {
    pub screen: bool,
    pub camera: bool,
    pub microphone: bool,
    /// Camera was enabled but screen sharing took the video slot
    pub camera_dropped: bool,
}

impl CaptureIntent {
    /// Derive from device state. Screen video always wins over the camera.
    pub fn from_devices(devices: &DeviceSnapshot) -> Self {
        let screen = devices.screen_sharing_enabled;
        let camera_wanted = camera_active(devices);
        Self {
            screen,
            camera: !screen && camera_wanted,
            microphone: microphone_active(devices),
            camera_dropped: screen && camera_wanted,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.screen && !self.camera && !self.microphone
    }

    pub fn wants_video(&self) -> bool {
        self.screen || self.camera
    }

    pub fn needs_device_stream(&self) -> bool {
        self.camera || self.microphone
    }
}

/// Whether a new recording can be started right now
pub fn can_start_recording(session: &SessionSnapshot, devices: &DeviceSnapshot) -> bool {
    session.status == SessionStatus::Idle && !CaptureIntent::from_devices(devices).is_empty()
}

/// `<prefix>-<ISO 8601 time with ':' and '.' as '-'>.<ext>`
pub fn recording_filename(prefix: &str, time: DateTime<Utc>, mime_type: &str) -> String {
    let timestamp = time
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("{prefix}-{timestamp}.{}", container_extension(mime_type))
}
