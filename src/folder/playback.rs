//! Playback URLs for saved recordings
//!
//! A playback URL pins the recording's bytes in memory until it is revoked.
//! Nothing is released automatically: whoever creates a URL revokes it.

use super::sink::PersistenceSink;
use crate::utils::AppResult;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

const URL_SCHEME: &str = "blob:folder-recorder/";

/// Bytes behind a playback URL
#[derive(Debug, Clone)]
pub struct PlaybackSource {
    pub bytes: Arc<Vec<u8>>,
    pub mime_type: String,
}

/// Registry of live playback URLs
#[derive(Default)]
pub struct PlaybackUrls {
    entries: Mutex<HashMap<String, PlaybackSource>>,
}

impl PlaybackUrls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, bytes: Vec<u8>, mime_type: &str) -> String {
        let url = format!("{URL_SCHEME}{}", Uuid::new_v4());
        self.entries.lock().insert(
            url.clone(),
            PlaybackSource {
                bytes: Arc::new(bytes),
                mime_type: mime_type.to_string(),
            },
        );
        url
    }

    pub fn resolve(&self, url: &str) -> Option<PlaybackSource> {
        self.entries.lock().get(url).cloned()
    }

    /// Release a URL. Returns false if it was already released.
    pub fn revoke(&self, url: &str) -> bool {
        self.entries.lock().remove(url).is_some()
    }

    pub fn live_count(&self) -> usize {
        self.entries.lock().len()
    }
}

/// Current playback of one view
///
/// Holds at most one URL; starting another playback revokes the previous one.
pub struct PlaybackController {
    urls: Arc<PlaybackUrls>,
    current: Option<String>,
}

impl PlaybackController {
    pub fn new(urls: Arc<PlaybackUrls>) -> Self {
        Self { urls, current: None }
    }

    pub fn current_url(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Load `filename` from the sink and expose it under a fresh URL
    pub async fn play(&mut self, sink: &dyn PersistenceSink, filename: &str) -> AppResult<String> {
        let file = sink.read_recording_file(filename).await?;

        self.release();
        let url = self.urls.create(file.bytes, &file.mime_type);
        tracing::debug!("Playing {} via {}", filename, url);
        self.current = Some(url.clone());
        Ok(url)
    }

    pub fn release(&mut self) {
        if let Some(url) = self.current.take() {
            self.urls.revoke(&url);
        }
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.release();
    }
}
