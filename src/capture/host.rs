//! Host platform backend
//!
//! Audio inputs are enumerated through cpal when the `host-audio` feature is
//! enabled. Live capture, display capture and encoding have no native
//! backend here, so those report `NotSupported`.

use super::encoder::MediaEncoder;
use super::stream::MediaStream;
use super::traits::{CaptureError, DeviceInfo, MediaConstraints, MediaPlatform};
use async_trait::async_trait;

/// [`MediaPlatform`] for the machine the binary runs on
#[derive(Debug, Default)]
pub struct HostPlatform;

impl HostPlatform {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(feature = "host-audio")]
fn list_input_devices() -> Result<Vec<DeviceInfo>, CaptureError> {
    use super::traits::MediaDeviceKind;
    use cpal::traits::{DeviceTrait, HostTrait};

    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| CaptureError::NotReadable(format!("audio host {:?}: {}", host.id(), e)))?;

    Ok(devices
        .filter_map(|device| {
            let name = device.name().ok()?;
            // cpal names double as ids; they are stable per host.
            Some(DeviceInfo {
                device_id: name.clone(),
                group_id: String::new(),
                label: name,
                kind: MediaDeviceKind::AudioInput,
            })
        })
        .collect())
}

#[cfg(not(feature = "host-audio"))]
fn list_input_devices() -> Result<Vec<DeviceInfo>, CaptureError> {
    Err(CaptureError::NotSupported(
        "device enumeration (build with the host-audio feature)".to_string(),
    ))
}

#[async_trait]
impl MediaPlatform for HostPlatform {
    fn supports_user_media(&self) -> bool {
        cfg!(feature = "host-audio")
    }

    fn supports_display_capture(&self) -> bool {
        false
    }

    fn supports_recording(&self) -> bool {
        false
    }

    async fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>, CaptureError> {
        let devices = tokio::task::spawn_blocking(list_input_devices)
            .await
            .map_err(|e| CaptureError::Other(format!("device enumeration task failed: {e}")))??;
        tracing::debug!("Host reported {} input devices", devices.len());
        Ok(devices)
    }

    async fn get_user_media(&self, _constraints: &MediaConstraints) -> Result<MediaStream, CaptureError> {
        Err(CaptureError::NotSupported("live camera and microphone capture".to_string()))
    }

    async fn get_display_media(&self) -> Result<MediaStream, CaptureError> {
        Err(CaptureError::NotSupported("display capture".to_string()))
    }

    fn is_type_supported(&self, _mime_type: &str) -> bool {
        false
    }

    fn create_encoder(
        &self,
        _stream: &MediaStream,
        _mime_type: Option<&str>,
    ) -> Result<Box<dyn MediaEncoder>, CaptureError> {
        Err(CaptureError::NotSupported("media recording".to_string()))
    }
}
