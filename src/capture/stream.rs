//! Live media tracks and streams
//!
//! A [`MediaTrack`] is a cheap, cloneable handle: every clone observes the
//! same enabled flag, ready state and end-of-source signal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

/// Track media type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
}

struct TrackInner {
    id: String,
    kind: TrackKind,
    label: String,
    /// Hardware id of the source, empty for display capture
    device_id: String,
    enabled: AtomicBool,
    stopped: AtomicBool,
    /// Flips to true when the source goes away on its own
    ended: watch::Sender<bool>,
}

/// Handle to one live track
#[derive(Clone)]
pub struct MediaTrack {
    inner: Arc<TrackInner>,
}

impl MediaTrack {
    pub fn new(kind: TrackKind, label: impl Into<String>, device_id: impl Into<String>) -> Self {
        let (ended, _) = watch::channel(false);
        Self {
            inner: Arc::new(TrackInner {
                id: Uuid::new_v4().to_string(),
                kind,
                label: label.into(),
                device_id: device_id.into(),
                enabled: AtomicBool::new(true),
                stopped: AtomicBool::new(false),
                ended,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn kind(&self) -> TrackKind {
        self.inner.kind
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn device_id(&self) -> &str {
        &self.inner.device_id
    }

    /// Whether frames/samples flow. A disabled track stays attached and emits silence/black.
    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Whether the track is still delivering data
    pub fn is_live(&self) -> bool {
        !self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Release the underlying source. Does not fire the ended signal.
    pub fn stop(&self) {
        if !self.inner.stopped.swap(true, Ordering::SeqCst) {
            tracing::debug!("Stopped {:?} track {}", self.inner.kind, self.inner.id);
        }
    }

    /// Called by the platform when the source ends on its own, e.g. the user
    /// stopped sharing from the system's own controls.
    pub fn end_from_source(&self) {
        self.inner.stopped.store(true, Ordering::SeqCst);
        self.inner.ended.send_replace(true);
    }

    /// Resolves once the source has ended on its own
    pub async fn ended(&self) {
        let mut rx = self.inner.ended.subscribe();
        // The sender lives as long as `self`, so this only errors if it was dropped.
        let _ = rx.wait_for(|ended| *ended).await;
    }

    pub fn same_track(&self, other: &MediaTrack) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for MediaTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaTrack")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("label", &self.inner.label)
            .field("enabled", &self.is_enabled())
            .field("live", &self.is_live())
            .finish()
    }
}

/// Ordered set of tracks
#[derive(Debug, Clone)]
pub struct MediaStream {
    id: String,
    tracks: Vec<MediaTrack>,
}

impl MediaStream {
    pub fn new() -> Self {
        Self::from_tracks(Vec::new())
    }

    pub fn from_tracks(tracks: Vec<MediaTrack>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tracks,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn add_track(&mut self, track: MediaTrack) {
        if !self.tracks.iter().any(|t| t.same_track(&track)) {
            self.tracks.push(track);
        }
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn video_track(&self) -> Option<&MediaTrack> {
        self.tracks.iter().find(|t| t.kind() == TrackKind::Video)
    }

    pub fn audio_track(&self) -> Option<&MediaTrack> {
        self.tracks.iter().find(|t| t.kind() == TrackKind::Audio)
    }

    pub fn has_video(&self) -> bool {
        self.video_track().is_some()
    }

    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}

impl Default for MediaStream {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_clones_share_enabled_flag() {
        let track = MediaTrack::new(TrackKind::Audio, "Mic", "mic-1");
        let clone = track.clone();
        clone.set_enabled(false);
        assert!(!track.is_enabled());
    }

    #[test]
    fn test_add_track_ignores_duplicates() {
        let track = MediaTrack::new(TrackKind::Video, "Cam", "cam-1");
        let mut stream = MediaStream::new();
        stream.add_track(track.clone());
        stream.add_track(track.clone());
        assert_eq!(stream.tracks().len(), 1);
        assert!(stream.has_video());
        assert!(stream.audio_track().is_none());
    }

    #[test]
    fn test_stop_all_stops_every_track() {
        let stream = MediaStream::from_tracks(vec![
            MediaTrack::new(TrackKind::Video, "Cam", "cam-1"),
            MediaTrack::new(TrackKind::Audio, "Mic", "mic-1"),
        ]);
        stream.stop_all();
        assert!(stream.tracks().iter().all(|t| !t.is_live()));
    }

    #[tokio::test]
    async fn test_ended_resolves_after_source_ends() {
        let track = MediaTrack::new(TrackKind::Video, "Screen", "");
        let watcher = track.clone();
        let handle = tokio::spawn(async move { watcher.ended().await });

        track.end_from_source();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("ended signal")
            .unwrap();
        assert!(!track.is_live());
    }

    #[tokio::test]
    async fn test_local_stop_does_not_signal_ended() {
        let track = MediaTrack::new(TrackKind::Video, "Screen", "");
        track.stop();
        let waited = tokio::time::timeout(Duration::from_millis(50), track.ended()).await;
        assert!(waited.is_err());
    }
}
