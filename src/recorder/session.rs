//! Recording session
//!
//! Composes the screen, camera and microphone into a single output stream,
//! drives the encoder and hands the finished recording to the persistence
//! sink. Every exit path (save, cancel, failure, a share ended from the
//! system controls) goes through [`RecordingSessionService::teardown`].

use super::state::{recording_filename, CaptureIntent, SessionSnapshot, SessionStatus};
use crate::capture::encoder::{select_mime_type, EncoderEvent, MediaEncoder, RecordingBlob};
use crate::capture::traits::display_capture_error;
use crate::capture::{MediaConstraints, MediaPlatform, MediaStream, MediaTrack, TrackConstraint};
use crate::config::AppConfig;
use crate::devices::permission::device_constraint;
use crate::devices::DeviceRegistry;
use crate::folder::PersistenceSink;
use crate::utils::{AppError, AppResult};
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

const SCREEN_CANCELLED: &str = "Screen sharing was cancelled";
const CAMERA_DROPPED: &str = "Recording the screen; the camera is not recorded while screen sharing is on";

/// Everything a running session owns
#[derive(Default)]
struct SessionResources {
    screen_stream: Option<MediaStream>,
    device_stream: Option<MediaStream>,
    output_stream: Option<MediaStream>,
    encoder: Option<Box<dyn MediaEncoder>>,
    collector: Option<JoinHandle<CollectedOutput>>,
    /// Watches the screen track for an external stop
    track_watch: Option<JoinHandle<()>>,
}

impl SessionResources {
    fn is_empty(&self) -> bool {
        self.screen_stream.is_none()
            && self.device_stream.is_none()
            && self.output_stream.is_none()
            && self.encoder.is_none()
            && self.collector.is_none()
            && self.track_watch.is_none()
    }
}

/// Chunks gathered from the encoder, in emission order
struct CollectedOutput {
    chunks: Vec<Vec<u8>>,
    fault: Option<String>,
}

/// The single recording session of the application
pub struct RecordingSessionService {
    platform: Arc<dyn MediaPlatform>,
    devices: Arc<DeviceRegistry>,
    sink: Arc<dyn PersistenceSink>,
    config: AppConfig,
    state: watch::Sender<SessionSnapshot>,
    resources: Mutex<SessionResources>,
}

impl RecordingSessionService {
    pub fn new(
        platform: Arc<dyn MediaPlatform>,
        devices: Arc<DeviceRegistry>,
        sink: Arc<dyn PersistenceSink>,
        config: AppConfig,
    ) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::default());
        Self {
            platform,
            devices,
            sink,
            config,
            state,
            resources: Mutex::new(SessionResources::default()),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.state.borrow().status
    }

    /// Subscribe to session state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// Whether any stream, encoder or watcher is still held
    pub fn holds_resources(&self) -> bool {
        !self.resources.lock().is_empty()
    }

    /// Start a recording. Does nothing unless the session is idle.
    pub async fn start_recording(self: &Arc<Self>) {
        let began = self.state.send_if_modified(|s| {
            if s.status != SessionStatus::Idle {
                return false;
            }
            *s = SessionSnapshot {
                status: SessionStatus::Starting,
                ..Default::default()
            };
            true
        });
        if !began {
            tracing::debug!("Ignoring start request while {:?}", self.status());
            return;
        }

        match self.begin().await {
            Ok(note) => {
                // An encoder fault may already have moved us to `error`.
                let started = self.state.send_if_modified(|s| {
                    if s.status != SessionStatus::Starting {
                        return false;
                    }
                    s.status = SessionStatus::Recording;
                    s.status_message = note;
                    true
                });
                if started {
                    tracing::info!("Recording started");
                }
            }
            Err(e) if e.is_cancellation() => {
                self.teardown();
                tracing::info!("Recording not started: {}", e);
                self.state.send_replace(SessionSnapshot {
                    status: SessionStatus::Idle,
                    error_message: None,
                    status_message: Some(SCREEN_CANCELLED.to_string()),
                });
            }
            Err(e) => {
                self.teardown();
                tracing::error!("Failed to start recording: {}", e);
                self.state.send_replace(SessionSnapshot {
                    status: SessionStatus::Error,
                    error_message: Some(e.to_string()),
                    status_message: None,
                });
            }
        }
    }

    /// Acquire streams and start the encoder. Returns an optional status note.
    async fn begin(self: &Arc<Self>) -> AppResult<Option<String>> {
        let devices = self.devices.snapshot();
        let intent = CaptureIntent::from_devices(&devices);
        if intent.is_empty() {
            return Err(AppError::InvalidSelection(
                "No capture source enabled. Turn on screen sharing, a camera or a microphone.".to_string(),
            ));
        }
        self.check_capabilities(&intent)?;

        tracing::info!("Starting recording: {:?}", intent);
        let mut output = MediaStream::new();

        if intent.screen {
            let screen = self.platform.get_display_media().await.map_err(display_capture_error)?;
            self.resources.lock().screen_stream = Some(screen.clone());

            if let Some(track) = screen.video_track() {
                output.add_track(track.clone());
                let watcher = self.watch_screen_track(track.clone());
                self.resources.lock().track_watch = Some(watcher);
            }
        }

        let mut camera_track = None;
        let mut microphone_track = None;

        if intent.needs_device_stream() {
            let constraints = MediaConstraints {
                video: if intent.camera && !output.has_video() {
                    device_constraint(devices.selected_camera().map(|d| d.device_id.as_str()))
                } else {
                    TrackConstraint::Disabled
                },
                audio: if intent.microphone {
                    device_constraint(devices.selected_microphone().map(|d| d.device_id.as_str()))
                } else {
                    TrackConstraint::Disabled
                },
            };

            if !constraints.is_empty() {
                let stream = self.platform.get_user_media(&constraints).await.map_err(AppError::from)?;
                self.resources.lock().device_stream = Some(stream.clone());

                if !output.has_video() {
                    if let Some(track) = stream.video_track() {
                        output.add_track(track.clone());
                        camera_track = Some(track.clone());
                    }
                }
                if let Some(track) = stream.audio_track() {
                    output.add_track(track.clone());
                    microphone_track = Some(track.clone());
                }
            }
        }

        self.resources.lock().output_stream = Some(output.clone());

        if intent.wants_video() && !output.has_video() {
            return Err(AppError::DeviceUnavailable("Video track unavailable".to_string()));
        }
        if intent.microphone && microphone_track.is_none() {
            tracing::warn!("Microphone requested but no audio track was delivered");
        }

        self.devices.attach_live_tracks(camera_track, microphone_track);

        let mime_type = select_mime_type(&self.config.preferred_mime_types, |mime| {
            self.platform.is_type_supported(mime)
        });
        let mut encoder = self
            .platform
            .create_encoder(&output, mime_type.as_deref())
            .map_err(|e| AppError::AcquisitionFailed(format!("could not create encoder: {e}")))?;
        let events = encoder
            .start(self.config.timeslice())
            .map_err(|e| AppError::AcquisitionFailed(format!("could not start encoder: {e}")))?;

        {
            // Held while spawning so a fault handler cannot tear down half-stored state.
            let mut resources = self.resources.lock();
            resources.collector = Some(tokio::spawn(collect_encoder_output(events, Arc::downgrade(self))));
            resources.encoder = Some(encoder);
        }

        Ok(intent.camera_dropped.then(|| CAMERA_DROPPED.to_string()))
    }

    fn check_capabilities(&self, intent: &CaptureIntent) -> AppResult<()> {
        if !self.platform.supports_recording() {
            return Err(AppError::NotSupported("media recording".to_string()));
        }
        if intent.screen && !self.platform.supports_display_capture() {
            return Err(AppError::NotSupported("screen capture".to_string()));
        }
        if intent.needs_device_stream() && !self.platform.supports_user_media() {
            return Err(AppError::NotSupported("camera and microphone capture".to_string()));
        }
        Ok(())
    }

    /// Stop the recording when the screen share is ended from outside the app
    fn watch_screen_track(self: &Arc<Self>, track: MediaTrack) -> JoinHandle<()> {
        let session = Arc::downgrade(self);
        tokio::spawn(async move {
            track.ended().await;
            let Some(session) = session.upgrade() else {
                return;
            };
            // A share ended mid-start is acted on once the start settles.
            let mut states = session.subscribe();
            let settled = states
                .wait_for(|s| s.status != SessionStatus::Starting)
                .await
                .map(|s| s.status);
            if matches!(settled, Ok(SessionStatus::Recording)) {
                tracing::info!("Screen share ended, stopping recording");
                // Detached: teardown aborts this watcher.
                tokio::spawn(async move { session.stop_recording().await });
            }
        })
    }

    /// Finish the recording and save it. Does nothing unless recording.
    pub async fn stop_recording(self: &Arc<Self>) {
        let began = self.state.send_if_modified(|s| {
            if s.status != SessionStatus::Recording {
                return false;
            }
            s.status = SessionStatus::Stopping;
            true
        });
        if !began {
            tracing::debug!("Ignoring stop request while {:?}", self.status());
            return;
        }

        tracing::info!("Stopping recording");
        let result = self.finish().await;
        self.teardown();

        let snapshot = match result {
            Ok(Some(filename)) => SessionSnapshot {
                status: SessionStatus::Idle,
                error_message: None,
                status_message: Some(format!("Saved {filename}")),
            },
            Ok(None) => SessionSnapshot {
                status: SessionStatus::Idle,
                error_message: None,
                status_message: Some("Recording was empty; nothing was saved".to_string()),
            },
            Err(e) => {
                tracing::error!("Failed to finish recording: {}", e);
                SessionSnapshot {
                    status: SessionStatus::Error,
                    error_message: Some(e.to_string()),
                    status_message: None,
                }
            }
        };
        self.state.send_replace(snapshot);
    }

    /// Finalize the encoder, then save and refresh. Returns the saved filename.
    async fn finish(&self) -> AppResult<Option<String>> {
        let (collector, reported_mime) = {
            let mut resources = self.resources.lock();
            let mime = resources.encoder.as_mut().map(|encoder| {
                encoder.stop();
                encoder.mime_type()
            });
            (resources.collector.take(), mime)
        };

        let collector = collector.ok_or_else(|| AppError::AcquisitionFailed("encoder is not running".to_string()))?;
        let output = collector
            .await
            .map_err(|e| AppError::AcquisitionFailed(format!("encoder output lost: {e}")))?;
        if let Some(fault) = output.fault {
            return Err(AppError::AcquisitionFailed(format!("encoder failed: {fault}")));
        }

        let blob = RecordingBlob::from_chunks(output.chunks, reported_mime, &self.config.default_mime_type);
        if blob.is_empty() {
            tracing::warn!("Encoder produced no data, nothing to save");
            return Ok(None);
        }

        let filename = recording_filename(&self.config.filename_prefix, Utc::now(), &blob.mime_type);
        self.sink
            .save_recording(&blob, &filename)
            .await
            .map_err(|e| match e {
                AppError::PersistenceFailed(_) => e,
                other => AppError::PersistenceFailed(other.to_string()),
            })?;

        if let Err(e) = self.sink.refresh_recordings().await {
            tracing::warn!("Saved {} but could not refresh the recording list: {}", filename, e);
        }

        Ok(Some(filename))
    }

    /// Encoder failed on its own while starting or recording
    fn handle_encoder_fault(&self, message: &str) {
        let failed = self.state.send_if_modified(|s| {
            if !matches!(s.status, SessionStatus::Starting | SessionStatus::Recording) {
                return false;
            }
            *s = SessionSnapshot {
                status: SessionStatus::Error,
                error_message: Some(format!("Recording failed: {message}")),
                status_message: None,
            };
            true
        });

        if failed {
            tracing::error!("Encoder failed: {}", message);
            self.teardown();
        }
    }

    /// Acknowledge an error and return to idle
    pub fn clear_error(&self) {
        let cleared = self.state.send_if_modified(|s| {
            if s.status != SessionStatus::Error {
                return false;
            }
            *s = SessionSnapshot::default();
            true
        });
        if cleared {
            self.teardown();
            tracing::debug!("Recording error cleared");
        }
    }

    /// Release every stream, the encoder and the track watcher.
    ///
    /// Safe to call in any state and any number of times.
    pub fn teardown(&self) {
        let resources = std::mem::take(&mut *self.resources.lock());
        if resources.is_empty() {
            self.devices.clear_live_tracks();
            return;
        }

        if let Some(watch) = resources.track_watch {
            watch.abort();
        }
        if let Some(mut encoder) = resources.encoder {
            if encoder.is_recording() {
                encoder.stop();
            }
        }
        if let Some(collector) = resources.collector {
            collector.abort();
        }

        for stream in [resources.screen_stream, resources.device_stream, resources.output_stream]
            .into_iter()
            .flatten()
        {
            stream.stop_all();
        }

        self.devices.clear_live_tracks();
        tracing::debug!("Recording resources released");
    }
}

impl Drop for RecordingSessionService {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn collect_encoder_output(
    mut events: mpsc::UnboundedReceiver<EncoderEvent>,
    session: Weak<RecordingSessionService>,
) -> CollectedOutput {
    let mut chunks = Vec::new();

    while let Some(event) = events.recv().await {
        match event {
            EncoderEvent::Data(bytes) => {
                if !bytes.is_empty() {
                    chunks.push(bytes);
                }
            }
            EncoderEvent::Error(message) => {
                if let Some(session) = session.upgrade() {
                    session.handle_encoder_fault(&message);
                }
                return CollectedOutput {
                    chunks,
                    fault: Some(message),
                };
            }
            EncoderEvent::Stopped => break,
        }
    }

    CollectedOutput { chunks, fault: None }
}
