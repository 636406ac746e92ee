//! Encoder abstraction and recording format selection

use super::traits::CaptureError;
use std::time::Duration;
use tokio::sync::mpsc;

/// Recording formats in order of preference
pub const PREFERRED_MIME_TYPES: [&str; 4] = [
    "video/webm;codecs=vp9,opus",
    "video/webm;codecs=vp8,opus",
    "video/webm",
    "video/mp4",
];

/// Container assumed when the encoder does not report a type
pub const DEFAULT_MIME_TYPE: &str = "video/webm";

/// Output of a running encoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncoderEvent {
    /// A chunk of encoded data, in order
    Data(Vec<u8>),
    /// The encoder failed; no further data follows
    Error(String),
    /// Finalized after `stop`; all data has been delivered
    Stopped,
}

/// A running media encoder bound to one stream
pub trait MediaEncoder: Send {
    /// Mime type the encoder actually produces. May be empty until data flows.
    fn mime_type(&self) -> String;

    /// Start encoding, flushing a chunk every `timeslice`
    fn start(&mut self, timeslice: Duration) -> Result<mpsc::UnboundedReceiver<EncoderEvent>, CaptureError>;

    /// Request finalization. The last chunk and `Stopped` follow on the event channel.
    fn stop(&mut self);

    fn is_recording(&self) -> bool;
}

/// Pick the first preferred type the platform supports
pub fn select_mime_type<F>(preferred: &[String], is_supported: F) -> Option<String>
where
    F: Fn(&str) -> bool,
{
    let selected = preferred.iter().find(|mime| is_supported(mime.as_str())).cloned();
    match &selected {
        Some(mime) => tracing::debug!("Selected recording format {}", mime),
        None => tracing::warn!("No preferred recording format supported, using platform default"),
    }
    selected
}

/// File extension for a container mime type
pub fn container_extension(mime_type: &str) -> &'static str {
    let essence = mime_type.split(';').next().unwrap_or_default().trim();
    let subtype = essence.split('/').nth(1).unwrap_or_default();
    match subtype.to_ascii_lowercase().as_str() {
        "mp4" => "mp4",
        "quicktime" => "mov",
        "x-matroska" => "mkv",
        "ogg" => "ogg",
        "mpeg" => "mp3",
        "wav" | "wave" | "x-wav" => "wav",
        _ => "webm",
    }
}

/// Finished recording, ready to be written out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingBlob {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl RecordingBlob {
    /// Concatenate chunks in order, falling back to `default_mime` for an unreported type
    pub fn from_chunks(chunks: Vec<Vec<u8>>, reported_mime: Option<String>, default_mime: &str) -> Self {
        let mime_type = reported_mime
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| default_mime.to_string());
        Self {
            bytes: chunks.concat(),
            mime_type,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn extension(&self) -> &'static str {
        container_extension(&self.mime_type)
    }
}
