//! Media capture abstractions
//!
//! This module describes the host's capture capabilities (devices, streams,
//! display capture and encoding) independently of any concrete platform.

pub mod encoder;
pub mod host;
pub mod stream;
pub mod traits;

pub use encoder::{EncoderEvent, MediaEncoder, RecordingBlob};
pub use host::HostPlatform;
pub use stream::{MediaStream, MediaTrack, TrackKind};
pub use traits::{
    CaptureError, DeviceInfo, MediaConstraints, MediaDeviceKind, MediaPlatform, PermissionState,
    TrackConstraint,
};
