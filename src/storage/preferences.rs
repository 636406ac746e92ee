//! Persisted preference records

use super::kv::{self, KeyValueStore, Partition};
use crate::utils::AppResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MEDIA_TOGGLES_KEY: &str = "mediaToggles";
pub const SCREEN_SHARING_KEY: &str = "screenSharing";
pub const SELECTED_DEVICES_KEY: &str = "selectedMediaDevices";

/// Last chosen camera and microphone
///
/// Older records stored the raw hardware id in `cameraDeviceId` /
/// `microphoneDeviceId`; those are migrated on load and never written again.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedMediaDevices {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_selection_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_device_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub microphone_selection_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub microphone_device_id: Option<String>,

    #[serde(default)]
    pub last_selected: Option<DateTime<Utc>>,
}

impl SelectedMediaDevices {
    pub fn new(camera_selection_key: Option<String>, microphone_selection_key: Option<String>) -> Self {
        Self {
            camera_selection_key,
            camera_device_id: None,
            microphone_selection_key,
            microphone_device_id: None,
            last_selected: Some(Utc::now()),
        }
    }

    /// Whether the record still carries the raw-id fields
    pub fn is_legacy(&self) -> bool {
        self.camera_device_id.is_some() || self.microphone_device_id.is_some()
    }

    /// Same selection, ignoring the timestamp
    pub fn same_selection(&self, other: &SelectedMediaDevices) -> bool {
        self.camera_selection_key == other.camera_selection_key
            && self.microphone_selection_key == other.microphone_selection_key
            && self.camera_device_id == other.camera_device_id
            && self.microphone_device_id == other.microphone_device_id
    }
}

/// Camera/microphone enable toggles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaTogglePreferences {
    pub microphone_enabled: bool,
    pub camera_enabled: bool,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl MediaTogglePreferences {
    pub fn new(microphone_enabled: bool, camera_enabled: bool) -> Self {
        Self {
            microphone_enabled,
            camera_enabled,
            last_updated: Some(Utc::now()),
        }
    }
}

/// Screen sharing toggle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenSharePreference {
    pub enabled: bool,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

pub async fn load_toggles(store: &dyn KeyValueStore) -> Option<MediaTogglePreferences> {
    kv::load(store, Partition::Preferences, MEDIA_TOGGLES_KEY).await
}

pub async fn save_toggles(store: &dyn KeyValueStore, toggles: &MediaTogglePreferences) -> AppResult<()> {
    kv::save(store, Partition::Preferences, MEDIA_TOGGLES_KEY, toggles).await
}

pub async fn load_screen_sharing(store: &dyn KeyValueStore) -> Option<ScreenSharePreference> {
    kv::load(store, Partition::Preferences, SCREEN_SHARING_KEY).await
}

pub async fn save_screen_sharing(store: &dyn KeyValueStore, enabled: bool) -> AppResult<()> {
    let preference = ScreenSharePreference {
        enabled,
        last_updated: Some(Utc::now()),
    };
    kv::save(store, Partition::Preferences, SCREEN_SHARING_KEY, &preference).await
}

pub async fn load_selection(store: &dyn KeyValueStore) -> Option<SelectedMediaDevices> {
    kv::load(store, Partition::DeviceSelections, SELECTED_DEVICES_KEY).await
}

pub async fn save_selection(store: &dyn KeyValueStore, selection: &SelectedMediaDevices) -> AppResult<()> {
    kv::save(store, Partition::DeviceSelections, SELECTED_DEVICES_KEY, selection).await
}

pub async fn clear_all(store: &dyn KeyValueStore) -> AppResult<()> {
    store.delete(Partition::Preferences, MEDIA_TOGGLES_KEY).await?;
    store.delete(Partition::Preferences, SCREEN_SHARING_KEY).await?;
    store.delete(Partition::DeviceSelections, SELECTED_DEVICES_KEY).await
}
