//! Input devices and their selection keys
//!
//! Platforms hide hardware ids until media permission is granted, so every
//! device of a kind reports the same empty id. Selection keys stay distinct
//! in that situation by falling back to group id, label and position.

use crate::capture::{DeviceInfo, MediaDeviceKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Input device kinds the recorder can select
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    #[serde(rename = "videoinput")]
    Camera,
    #[serde(rename = "audioinput")]
    Microphone,
}

impl DeviceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Camera => "videoinput",
            DeviceKind::Microphone => "audioinput",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DeviceKind::Camera => "camera",
            DeviceKind::Microphone => "microphone",
        }
    }

    fn from_platform(kind: MediaDeviceKind) -> Option<Self> {
        match kind {
            MediaDeviceKind::VideoInput => Some(DeviceKind::Camera),
            MediaDeviceKind::AudioInput => Some(DeviceKind::Microphone),
            MediaDeviceKind::AudioOutput => None,
        }
    }
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One selectable input device from the latest enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInputDevice {
    pub selection_key: String,
    pub label: String,
    pub kind: DeviceKind,
    pub group_id: String,
    /// Raw hardware id, possibly empty
    pub device_id: String,
}

impl MediaInputDevice {
    pub fn has_device_id(&self) -> bool {
        !self.device_id.is_empty()
    }

    /// Label for display, with a positional fallback for unlabeled devices
    pub fn display_label(&self, index: usize) -> String {
        if self.label.trim().is_empty() {
            format!("{} {}", capitalize(self.kind.display_name()), index + 1)
        } else {
            self.label.clone()
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lowercased label with separators collapsed to `-`
pub fn normalize_label(label: &str) -> String {
    let normalized = label
        .split(|c: char| c.is_whitespace() || c == ':')
        .filter(|part| !part.is_empty())
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join("-");

    if normalized.is_empty() {
        "unlabeled".to_string()
    } else {
        normalized
    }
}

/// Key for a device with a known hardware id
pub fn id_selection_key(kind: DeviceKind, device_id: &str) -> String {
    format!("{}:id:{}", kind.as_str(), device_id)
}

/// Derive the selection key for a device at `index` within its kind's list
pub fn derive_selection_key(kind: DeviceKind, device_id: &str, group_id: &str, label: &str, index: usize) -> String {
    if device_id.is_empty() {
        format!(
            "{}:default:{}:{}:{}",
            kind.as_str(),
            group_id,
            normalize_label(label),
            index
        )
    } else {
        id_selection_key(kind, device_id)
    }
}

/// Whether `value` is already a selection key for `kind`
pub fn is_selection_key(kind: DeviceKind, value: &str) -> bool {
    value
        .strip_prefix(kind.as_str())
        .and_then(|rest| rest.strip_prefix(':'))
        .map(|rest| rest.starts_with("id:") || rest.starts_with("default:"))
        .unwrap_or(false)
}

/// Group id, normalized label and index encoded in a positional key
pub fn parse_default_key(kind: DeviceKind, key: &str) -> Option<(&str, &str, usize)> {
    let rest = key.strip_prefix(kind.as_str())?.strip_prefix(":default:")?;
    // The label part never contains ':', the group id might.
    let mut parts = rest.rsplitn(3, ':');
    let index = parts.next()?.parse().ok()?;
    let label = parts.next()?;
    let group_id = parts.next()?;
    Some((group_id, label, index))
}

/// Split a platform enumeration into camera and microphone lists.
///
/// Keys are unique within each list; a repeated hardware id is reported once.
pub fn partition_devices(infos: &[DeviceInfo]) -> (Vec<MediaInputDevice>, Vec<MediaInputDevice>) {
    let mut cameras = Vec::new();
    let mut microphones = Vec::new();
    let mut seen = HashSet::new();

    for info in infos {
        let Some(kind) = DeviceKind::from_platform(info.kind) else {
            continue;
        };
        let list = match kind {
            DeviceKind::Camera => &mut cameras,
            DeviceKind::Microphone => &mut microphones,
        };

        let selection_key = derive_selection_key(kind, &info.device_id, &info.group_id, &info.label, list.len());
        if !seen.insert(selection_key.clone()) {
            tracing::debug!("Skipping duplicate {} entry {}", kind, selection_key);
            continue;
        }

        list.push(MediaInputDevice {
            selection_key,
            label: info.label.clone(),
            kind,
            group_id: info.group_id.clone(),
            device_id: info.device_id.clone(),
        });
    }

    (cameras, microphones)
}
