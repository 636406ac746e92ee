//! Scripted platform and sink doubles for unit tests

use crate::capture::encoder::{EncoderEvent, MediaEncoder, RecordingBlob};
use crate::capture::{
    CaptureError, DeviceInfo, MediaConstraints, MediaDeviceKind, MediaPlatform, MediaStream, MediaTrack,
    PermissionState, TrackConstraint, TrackKind,
};
use crate::folder::{FolderHandle, PersistenceSink, RecordingFile, RecordingFileSummary};
use crate::utils::{AppError, AppResult};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

pub fn camera(id: &str, label: &str) -> DeviceInfo {
    DeviceInfo {
        device_id: id.to_string(),
        group_id: format!("group-{id}"),
        label: label.to_string(),
        kind: MediaDeviceKind::VideoInput,
    }
}

pub fn microphone(id: &str, label: &str) -> DeviceInfo {
    DeviceInfo {
        device_id: id.to_string(),
        group_id: format!("group-{id}"),
        label: label.to_string(),
        kind: MediaDeviceKind::AudioInput,
    }
}

/// Every call the recorder made into the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    EnumerateDevices,
    GetUserMedia(MediaConstraints),
    GetDisplayMedia,
    CreateEncoder(Option<String>),
}

/// How the display picker responds
#[derive(Debug, Clone)]
pub enum DisplayBehavior {
    Share,
    Cancel,
    Fail(CaptureError),
}

#[derive(Default)]
struct EncoderShared {
    tx: Option<mpsc::UnboundedSender<EncoderEvent>>,
    recording: bool,
    starts: usize,
    stops: usize,
    timeslice: Option<Duration>,
    track_ids: Vec<String>,
}

/// Test-side view of an encoder the recorder created
#[derive(Clone)]
pub struct EncoderHandle {
    shared: Arc<Mutex<EncoderShared>>,
}

impl EncoderHandle {
    pub fn emit_chunk(&self, bytes: &[u8]) {
        if let Some(tx) = &self.shared.lock().tx {
            let _ = tx.send(EncoderEvent::Data(bytes.to_vec()));
        }
    }

    pub fn fail(&self, message: &str) {
        let mut shared = self.shared.lock();
        shared.recording = false;
        if let Some(tx) = shared.tx.take() {
            let _ = tx.send(EncoderEvent::Error(message.to_string()));
        }
    }

    pub fn is_recording(&self) -> bool {
        self.shared.lock().recording
    }

    pub fn start_count(&self) -> usize {
        self.shared.lock().starts
    }

    pub fn stop_count(&self) -> usize {
        self.shared.lock().stops
    }

    pub fn timeslice(&self) -> Option<Duration> {
        self.shared.lock().timeslice
    }

    pub fn track_ids(&self) -> Vec<String> {
        self.shared.lock().track_ids.clone()
    }
}

struct FakeEncoder {
    shared: Arc<Mutex<EncoderShared>>,
    mime_type: String,
    final_chunk: Vec<u8>,
    start_error: Option<CaptureError>,
}

impl MediaEncoder for FakeEncoder {
    fn mime_type(&self) -> String {
        self.mime_type.clone()
    }

    fn start(&mut self, timeslice: Duration) -> Result<mpsc::UnboundedReceiver<EncoderEvent>, CaptureError> {
        if let Some(e) = self.start_error.clone() {
            return Err(e);
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let mut shared = self.shared.lock();
        shared.tx = Some(tx);
        shared.recording = true;
        shared.starts += 1;
        shared.timeslice = Some(timeslice);
        Ok(rx)
    }

    fn stop(&mut self) {
        let mut shared = self.shared.lock();
        shared.stops += 1;
        if !shared.recording {
            return;
        }
        shared.recording = false;
        if let Some(tx) = shared.tx.take() {
            if !self.final_chunk.is_empty() {
                let _ = tx.send(EncoderEvent::Data(self.final_chunk.clone()));
            }
            let _ = tx.send(EncoderEvent::Stopped);
        }
    }

    fn is_recording(&self) -> bool {
        self.shared.lock().recording
    }
}

struct FakeState {
    devices: Vec<DeviceInfo>,
    user_media_supported: bool,
    display_supported: bool,
    recording_supported: bool,
    enumerate_error: Option<CaptureError>,
    user_media_error: Option<CaptureError>,
    user_media_without_video: bool,
    user_media_gate: Option<Arc<Notify>>,
    display: DisplayBehavior,
    supported_types: Vec<String>,
    encoder_mime: String,
    encoder_final_chunk: Vec<u8>,
    encoder_start_error: Option<CaptureError>,
    calls: Vec<PlatformCall>,
    display_streams: Vec<MediaStream>,
    user_streams: Vec<MediaStream>,
    encoders: Vec<EncoderHandle>,
}

/// Scripted [`MediaPlatform`]
pub struct FakePlatform {
    state: Mutex<FakeState>,
}

impl FakePlatform {
    pub fn new(devices: Vec<DeviceInfo>) -> Self {
        Self {
            state: Mutex::new(FakeState {
                devices,
                user_media_supported: true,
                display_supported: true,
                recording_supported: true,
                enumerate_error: None,
                user_media_error: None,
                user_media_without_video: false,
                user_media_gate: None,
                display: DisplayBehavior::Share,
                supported_types: vec!["video/webm;codecs=vp8,opus".to_string(), "video/webm".to_string()],
                encoder_mime: "video/webm;codecs=vp8,opus".to_string(),
                encoder_final_chunk: vec![9, 9],
                encoder_start_error: None,
                calls: Vec::new(),
                display_streams: Vec::new(),
                user_streams: Vec::new(),
                encoders: Vec::new(),
            }),
        }
    }

    pub fn set_devices(&self, devices: Vec<DeviceInfo>) {
        self.state.lock().devices = devices;
    }

    pub fn set_enumerate_error(&self, error: Option<CaptureError>) {
        self.state.lock().enumerate_error = error;
    }

    pub fn set_user_media_error(&self, error: Option<CaptureError>) {
        self.state.lock().user_media_error = error;
    }

    pub fn set_user_media_without_video(&self, without_video: bool) {
        self.state.lock().user_media_without_video = without_video;
    }

    /// Make the next `get_user_media` wait until the returned gate is notified
    pub fn hold_user_media(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.lock().user_media_gate = Some(gate.clone());
        gate
    }

    pub fn set_display_behavior(&self, behavior: DisplayBehavior) {
        self.state.lock().display = behavior;
    }

    pub fn set_supported_types(&self, types: &[&str]) {
        self.state.lock().supported_types = types.iter().map(|t| t.to_string()).collect();
    }

    pub fn set_encoder_mime(&self, mime: &str) {
        self.state.lock().encoder_mime = mime.to_string();
    }

    pub fn set_encoder_final_chunk(&self, chunk: Vec<u8>) {
        self.state.lock().encoder_final_chunk = chunk;
    }

    pub fn set_encoder_start_error(&self, error: Option<CaptureError>) {
        self.state.lock().encoder_start_error = error;
    }

    pub fn set_display_supported(&self, supported: bool) {
        self.state.lock().display_supported = supported;
    }

    pub fn set_user_media_supported(&self, supported: bool) {
        self.state.lock().user_media_supported = supported;
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.state.lock().calls.clone()
    }

    /// Calls that open hardware or create an encoder
    pub fn acquisition_calls(&self) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| !matches!(c, PlatformCall::EnumerateDevices))
            .count()
    }

    pub fn last_display_stream(&self) -> Option<MediaStream> {
        self.state.lock().display_streams.last().cloned()
    }

    pub fn last_user_stream(&self) -> Option<MediaStream> {
        self.state.lock().user_streams.last().cloned()
    }

    pub fn user_stream_count(&self) -> usize {
        self.state.lock().user_streams.len()
    }

    pub fn last_encoder(&self) -> Option<EncoderHandle> {
        self.state.lock().encoders.last().cloned()
    }

    pub fn encoder_count(&self) -> usize {
        self.state.lock().encoders.len()
    }

    fn find_device(state: &FakeState, kind: MediaDeviceKind, constraint: &TrackConstraint) -> Option<DeviceInfo> {
        state
            .devices
            .iter()
            .filter(|d| d.kind == kind)
            .find(|d| match constraint {
                TrackConstraint::Exact(id) => &d.device_id == id,
                _ => true,
            })
            .cloned()
    }
}

#[async_trait]
impl MediaPlatform for FakePlatform {
    fn supports_user_media(&self) -> bool {
        self.state.lock().user_media_supported
    }

    fn supports_display_capture(&self) -> bool {
        self.state.lock().display_supported
    }

    fn supports_recording(&self) -> bool {
        self.state.lock().recording_supported
    }

    async fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>, CaptureError> {
        let mut state = self.state.lock();
        state.calls.push(PlatformCall::EnumerateDevices);
        match &state.enumerate_error {
            Some(e) => Err(e.clone()),
            None => Ok(state.devices.clone()),
        }
    }

    async fn get_user_media(&self, constraints: &MediaConstraints) -> Result<MediaStream, CaptureError> {
        let gate = {
            let mut state = self.state.lock();
            state.calls.push(PlatformCall::GetUserMedia(constraints.clone()));
            state.user_media_gate.take()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut state = self.state.lock();
        if let Some(e) = &state.user_media_error {
            return Err(e.clone());
        }

        let mut stream = MediaStream::new();
        if constraints.video.is_requested() && !state.user_media_without_video {
            let device = Self::find_device(&state, MediaDeviceKind::VideoInput, &constraints.video)
                .ok_or_else(|| CaptureError::NotFound("camera".to_string()))?;
            stream.add_track(MediaTrack::new(TrackKind::Video, device.label, device.device_id));
        }
        if constraints.audio.is_requested() {
            let device = Self::find_device(&state, MediaDeviceKind::AudioInput, &constraints.audio)
                .ok_or_else(|| CaptureError::NotFound("microphone".to_string()))?;
            stream.add_track(MediaTrack::new(TrackKind::Audio, device.label, device.device_id));
        }

        state.user_streams.push(stream.clone());
        Ok(stream)
    }

    async fn get_display_media(&self) -> Result<MediaStream, CaptureError> {
        let mut state = self.state.lock();
        state.calls.push(PlatformCall::GetDisplayMedia);
        match state.display.clone() {
            DisplayBehavior::Share => {
                let stream = MediaStream::from_tracks(vec![MediaTrack::new(TrackKind::Video, "Entire screen", "")]);
                state.display_streams.push(stream.clone());
                Ok(stream)
            }
            DisplayBehavior::Cancel => Err(CaptureError::NotAllowed("Permission denied by user".to_string())),
            DisplayBehavior::Fail(e) => Err(e),
        }
    }

    fn is_type_supported(&self, mime_type: &str) -> bool {
        self.state.lock().supported_types.iter().any(|t| t == mime_type)
    }

    fn create_encoder(
        &self,
        stream: &MediaStream,
        mime_type: Option<&str>,
    ) -> Result<Box<dyn MediaEncoder>, CaptureError> {
        let mut state = self.state.lock();
        state.calls.push(PlatformCall::CreateEncoder(mime_type.map(str::to_string)));

        let shared = Arc::new(Mutex::new(EncoderShared {
            track_ids: stream.tracks().iter().map(|t| t.id().to_string()).collect(),
            ..Default::default()
        }));
        state.encoders.push(EncoderHandle { shared: shared.clone() });

        Ok(Box::new(FakeEncoder {
            shared,
            mime_type: state.encoder_mime.clone(),
            final_chunk: state.encoder_final_chunk.clone(),
            start_error: state.encoder_start_error.clone(),
        }))
    }
}

/// Sink that keeps saved recordings in memory and logs every call
#[derive(Default)]
pub struct FakeSink {
    saved: Mutex<Vec<(String, RecordingBlob)>>,
    events: Mutex<Vec<String>>,
    fail_saves: Mutex<bool>,
}

impl FakeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_saves(&self, fail: bool) {
        *self.fail_saves.lock() = fail;
    }

    pub fn saved(&self) -> Vec<(String, RecordingBlob)> {
        self.saved.lock().clone()
    }

    /// `save:<name>` and `refresh` entries in call order
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn refresh_count(&self) -> usize {
        self.events.lock().iter().filter(|e| *e == "refresh").count()
    }
}

#[async_trait]
impl PersistenceSink for FakeSink {
    async fn folder_handle(&self) -> Option<FolderHandle> {
        Some(FolderHandle {
            path: PathBuf::from("/recordings"),
            name: "recordings".to_string(),
        })
    }

    async fn permission_state(&self) -> PermissionState {
        PermissionState::Granted
    }

    async fn save_recording(&self, blob: &RecordingBlob, filename: &str) -> AppResult<()> {
        self.events.lock().push(format!("save:{filename}"));
        if *self.fail_saves.lock() {
            return Err(AppError::PersistenceFailed("disk full".to_string()));
        }
        self.saved.lock().push((filename.to_string(), blob.clone()));
        Ok(())
    }

    async fn refresh_recordings(&self) -> AppResult<Vec<RecordingFileSummary>> {
        self.events.lock().push("refresh".to_string());
        Ok(self
            .saved
            .lock()
            .iter()
            .rev()
            .map(|(name, blob)| RecordingFileSummary {
                name: name.clone(),
                mime_type: blob.mime_type.clone(),
                size: blob.len() as u64,
                last_modified: Utc::now(),
            })
            .collect())
    }

    async fn read_recording_file(&self, filename: &str) -> AppResult<RecordingFile> {
        self.saved
            .lock()
            .iter()
            .find(|(name, _)| name == filename)
            .map(|(name, blob)| RecordingFile {
                name: name.clone(),
                mime_type: blob.mime_type.clone(),
                bytes: blob.bytes.clone(),
            })
            .ok_or_else(|| AppError::NotFound(filename.to_string()))
    }
}
