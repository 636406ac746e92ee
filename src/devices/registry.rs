//! Device registry
//!
//! Owns the enumerated camera/microphone lists, the user's selection and
//! enable toggles, and the media permission state. The watch channel is the
//! single store: every change is applied to and published as one
//! [`DeviceSnapshot`].

use super::key::{partition_devices, DeviceKind, MediaInputDevice};
use super::migration::{migrate_selection, resolve_revealed_key};
use super::permission::{has_enabled_input, access_constraints, reconcile_permission};
use crate::capture::{CaptureError, MediaPlatform, MediaTrack, PermissionState};
use crate::storage::preferences::{self, MediaTogglePreferences, SelectedMediaDevices};
use crate::storage::KeyValueStore;
use crate::utils::{AppError, AppResult};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

/// Observable device state
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSnapshot {
    pub cameras: Vec<MediaInputDevice>,
    pub microphones: Vec<MediaInputDevice>,
    pub selected_camera_key: Option<String>,
    pub selected_microphone_key: Option<String>,
    pub camera_enabled: bool,
    pub microphone_enabled: bool,
    pub screen_sharing_enabled: bool,
    pub enumerating: bool,
    pub error_message: Option<String>,
    pub permission: PermissionState,
}

impl DeviceSnapshot {
    pub fn selected_camera(&self) -> Option<&MediaInputDevice> {
        self.selected_device(DeviceKind::Camera)
    }

    pub fn selected_microphone(&self) -> Option<&MediaInputDevice> {
        self.selected_device(DeviceKind::Microphone)
    }

    pub fn has_enabled_input(&self) -> bool {
        has_enabled_input(self)
    }

    fn selected_device(&self, kind: DeviceKind) -> Option<&MediaInputDevice> {
        let key = self.selected_key(kind)?;
        self.devices(kind).iter().find(|d| d.selection_key == key)
    }

    fn devices(&self, kind: DeviceKind) -> &[MediaInputDevice] {
        match kind {
            DeviceKind::Camera => &self.cameras,
            DeviceKind::Microphone => &self.microphones,
        }
    }

    fn selected_key(&self, kind: DeviceKind) -> Option<&str> {
        match kind {
            DeviceKind::Camera => self.selected_camera_key.as_deref(),
            DeviceKind::Microphone => self.selected_microphone_key.as_deref(),
        }
    }

    fn set_selected_key(&mut self, kind: DeviceKind, key: Option<String>) {
        match kind {
            DeviceKind::Camera => self.selected_camera_key = key,
            DeviceKind::Microphone => self.selected_microphone_key = key,
        }
    }

    fn is_enabled(&self, kind: DeviceKind) -> bool {
        match kind {
            DeviceKind::Camera => self.camera_enabled,
            DeviceKind::Microphone => self.microphone_enabled,
        }
    }

    fn set_enabled_flag(&mut self, kind: DeviceKind, enabled: bool) {
        match kind {
            DeviceKind::Camera => self.camera_enabled = enabled,
            DeviceKind::Microphone => self.microphone_enabled = enabled,
        }
    }

    fn selection_record(&self) -> SelectedMediaDevices {
        SelectedMediaDevices::new(self.selected_camera_key.clone(), self.selected_microphone_key.clone())
    }

    fn toggles(&self) -> MediaTogglePreferences {
        MediaTogglePreferences::new(self.microphone_enabled, self.camera_enabled)
    }
}

/// Tracks of the running session that follow the enable toggles
#[derive(Default)]
struct LiveTracks {
    camera: Option<MediaTrack>,
    microphone: Option<MediaTrack>,
}

/// Camera/microphone registry and permission gate
pub struct DeviceRegistry {
    platform: Arc<dyn MediaPlatform>,
    store: Arc<dyn KeyValueStore>,
    state: watch::Sender<DeviceSnapshot>,
    live: Mutex<LiveTracks>,
    /// Stored selection waiting for a successful enumeration to resolve against
    pending_selection: Mutex<Option<SelectedMediaDevices>>,
}

impl DeviceRegistry {
    pub fn new(platform: Arc<dyn MediaPlatform>, store: Arc<dyn KeyValueStore>) -> Self {
        let (state, _) = watch::channel(DeviceSnapshot::default());
        Self {
            platform,
            store,
            state,
            live: Mutex::new(LiveTracks::default()),
            pending_selection: Mutex::new(None),
        }
    }

    /// Current state
    pub fn snapshot(&self) -> DeviceSnapshot {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<DeviceSnapshot> {
        self.state.subscribe()
    }

    pub fn permission_state(&self) -> PermissionState {
        self.state.borrow().permission
    }

    /// Apply a mutation, re-derive the permission state and publish, all
    /// under the channel's write lock. `f` must not read the registry.
    fn update<R: Default>(&self, f: impl FnOnce(&mut DeviceSnapshot) -> R) -> R {
        let mut result = R::default();
        self.state.send_modify(|s| {
            result = f(s);
            s.permission = reconcile_permission(s.permission, has_enabled_input(s));
        });
        result
    }

    fn report<T>(&self, result: AppResult<T>) -> AppResult<T> {
        if let Err(e) = &result {
            let message = e.to_string();
            self.update(|s| s.error_message = Some(message));
        }
        result
    }

    /// Restore persisted toggles and selection, then enumerate.
    ///
    /// The stored selection is only applied once an enumeration succeeds, so
    /// a failed first enumeration leaves the persisted records untouched.
    pub async fn initialize(&self) {
        let store = self.store.as_ref();
        let toggles = preferences::load_toggles(store).await;
        let screen_sharing = preferences::load_screen_sharing(store).await;
        let stored = preferences::load_selection(store).await;

        self.update(|s| {
            if let Some(toggles) = &toggles {
                s.camera_enabled = toggles.camera_enabled;
                s.microphone_enabled = toggles.microphone_enabled;
            }
            if let Some(screen) = &screen_sharing {
                s.screen_sharing_enabled = screen.enabled;
            }
        });
        *self.pending_selection.lock() = stored;

        self.enumerate_devices().await;
    }

    /// Refresh the device lists and drop selections whose device is gone.
    ///
    /// Failures are reported through `error_message`; the previous lists and
    /// any selection still waiting to be restored stay as they are.
    pub async fn enumerate_devices(&self) {
        let Some((cameras, microphones)) = self.fetch_devices().await else {
            return;
        };

        let pending = self.pending_selection.lock().take();
        let migrated = pending
            .as_ref()
            .and_then(|record| migrate_selection(record, &cameras, &microphones));
        if pending.as_ref().is_some_and(|r| r.is_legacy()) {
            tracing::info!("Migrated legacy device selection: {:?}", migrated);
        }

        let changed = self.update(|s| {
            s.error_message = None;
            if pending.is_some() {
                s.selected_camera_key = migrated.as_ref().and_then(|m| m.camera_selection_key.clone());
                s.selected_microphone_key = migrated.as_ref().and_then(|m| m.microphone_selection_key.clone());
            }
            apply_devices(s, cameras, microphones)
        });

        let current = self.snapshot().selection_record();
        let restored_differs = pending.as_ref().is_some_and(|r| !r.same_selection(&current));

        if changed {
            self.apply_desired_state_to_active_tracks();
        }
        if changed || restored_differs {
            if let Err(e) = self.persist_selection().await {
                tracing::warn!("Failed to store device selection: {}", e);
            }
        }
        if changed {
            if let Err(e) = self.persist_toggles().await {
                tracing::warn!("Failed to store media toggles: {}", e);
            }
        }
    }

    async fn fetch_devices(&self) -> Option<(Vec<MediaInputDevice>, Vec<MediaInputDevice>)> {
        if !self.platform.supports_user_media() {
            self.update(|s| s.error_message = Some("Media devices are not supported on this platform".to_string()));
            return None;
        }

        self.update(|s| s.enumerating = true);
        let result = self.platform.enumerate_devices().await;
        self.update(|s| s.enumerating = false);

        match result {
            Ok(infos) => {
                let (cameras, microphones) = partition_devices(&infos);
                tracing::debug!("Enumerated {} cameras, {} microphones", cameras.len(), microphones.len());
                Some((cameras, microphones))
            }
            Err(e) => {
                tracing::warn!("Device enumeration failed: {}", e);
                self.update(|s| s.error_message = Some(format!("Failed to list media devices: {e}")));
                None
            }
        }
    }

    pub async fn select_camera(&self, key: &str) -> AppResult<()> {
        self.select(DeviceKind::Camera, key).await
    }

    pub async fn select_microphone(&self, key: &str) -> AppResult<()> {
        self.select(DeviceKind::Microphone, key).await
    }

    async fn select(&self, kind: DeviceKind, key: &str) -> AppResult<()> {
        let accepted = self.update(|s| {
            if !s.devices(kind).iter().any(|d| d.selection_key == key) {
                s.error_message = Some(format!("The selected {} is not available", kind.display_name()));
                return false;
            }
            s.set_selected_key(kind, Some(key.to_string()));
            s.error_message = None;
            true
        });

        if !accepted {
            return Err(AppError::InvalidSelection(format!(
                "{} {} is not in the current device list",
                kind.display_name(),
                key
            )));
        }

        tracing::info!("Selected {} {}", kind.display_name(), key);
        let result = self.persist_selection().await;
        self.report(result)
    }

    pub async fn set_camera_enabled(&self, enabled: bool) -> AppResult<()> {
        self.set_enabled(DeviceKind::Camera, enabled).await
    }

    pub async fn set_microphone_enabled(&self, enabled: bool) -> AppResult<()> {
        self.set_enabled(DeviceKind::Microphone, enabled).await
    }

    async fn set_enabled(&self, kind: DeviceKind, enabled: bool) -> AppResult<()> {
        let accepted = self.update(|s| {
            if enabled && s.selected_key(kind).is_none() {
                s.error_message = Some(format!("Select a {} before enabling it", kind.display_name()));
                return false;
            }
            s.set_enabled_flag(kind, enabled);
            s.error_message = None;
            true
        });

        if !accepted {
            return Err(AppError::DeviceUnavailable(format!("no {} selected", kind.display_name())));
        }

        tracing::debug!("{} enabled: {}", kind.display_name(), enabled);
        self.apply_desired_state_to_active_tracks();
        let result = self.persist_toggles().await;
        self.report(result)
    }

    /// Screen sharing needs no device, so it can always be toggled
    pub async fn set_screen_sharing_enabled(&self, enabled: bool) -> AppResult<()> {
        self.update(|s| s.screen_sharing_enabled = enabled);
        let result = preferences::save_screen_sharing(self.store.as_ref(), enabled).await;
        self.report(result)
    }

    /// Ask the platform for camera/microphone access.
    ///
    /// Only runs from an explicit user action and only for enabled inputs.
    /// The access stream is stopped immediately. Once granted, the devices are
    /// enumerated again so selections move to the now visible hardware ids.
    pub async fn request_permission(&self) -> AppResult<PermissionState> {
        let snapshot = self.snapshot();
        let Some(constraints) = access_constraints(&snapshot) else {
            let message = "Enable a camera or microphone before requesting access".to_string();
            self.update(|s| s.error_message = Some(message.clone()));
            return Err(AppError::InvalidSelection(message));
        };

        if !self.platform.supports_user_media() {
            return self.report(Err(AppError::NotSupported(
                "camera and microphone capture".to_string(),
            )));
        }

        tracing::info!("Requesting media permission with {:?}", constraints);
        match self.platform.get_user_media(&constraints).await {
            Ok(stream) => {
                stream.stop_all();
                self.update(|s| {
                    s.permission = PermissionState::Granted;
                    s.error_message = None;
                });
                self.enumerate_devices().await;
                Ok(PermissionState::Granted)
            }
            Err(CaptureError::NotAllowed(reason)) => {
                tracing::warn!("Media permission denied: {}", reason);
                self.update(|s| {
                    s.permission = PermissionState::Denied;
                    s.error_message = Some("Camera and microphone access was denied".to_string());
                });
                Err(AppError::PermissionDenied(reason))
            }
            Err(e) => {
                tracing::warn!("Media access request failed: {}", e);
                self.report(Err(e.into()))
            }
        }
    }

    /// Attach the running session's tracks so toggles mute them live
    pub fn attach_live_tracks(&self, camera: Option<MediaTrack>, microphone: Option<MediaTrack>) {
        *self.live.lock() = LiveTracks { camera, microphone };
        self.apply_desired_state_to_active_tracks();
    }

    pub fn clear_live_tracks(&self) {
        *self.live.lock() = LiveTracks::default();
    }

    pub fn has_live_tracks(&self) -> bool {
        let live = self.live.lock();
        live.camera.is_some() || live.microphone.is_some()
    }

    /// Mirror the enable toggles onto attached tracks. Never adds or removes tracks.
    pub fn apply_desired_state_to_active_tracks(&self) {
        let (camera_enabled, microphone_enabled) = {
            let state = self.state.borrow();
            (state.camera_enabled, state.microphone_enabled)
        };

        let live = self.live.lock();
        if let Some(track) = &live.camera {
            track.set_enabled(camera_enabled);
        }
        if let Some(track) = &live.microphone {
            track.set_enabled(microphone_enabled);
        }
    }

    async fn persist_selection(&self) -> AppResult<()> {
        let record = self.snapshot().selection_record();
        preferences::save_selection(self.store.as_ref(), &record).await
    }

    async fn persist_toggles(&self) -> AppResult<()> {
        let toggles = self.snapshot().toggles();
        preferences::save_toggles(self.store.as_ref(), &toggles).await
    }
}

/// Install fresh device lists and re-validate both selections.
///
/// Returns whether a selection or toggle changed.
fn apply_devices(s: &mut DeviceSnapshot, cameras: Vec<MediaInputDevice>, microphones: Vec<MediaInputDevice>) -> bool {
    if cameras.iter().chain(microphones.iter()).any(|d| d.has_device_id() || !d.label.is_empty()) {
        // Ids and labels are only revealed once access has been granted.
        s.permission = PermissionState::Granted;
    }
    s.cameras = cameras;
    s.microphones = microphones;

    let camera_changed = validate_selection(s, DeviceKind::Camera);
    let microphone_changed = validate_selection(s, DeviceKind::Microphone);
    camera_changed || microphone_changed
}

/// Keep a listed selection, follow a positional key to its revealed device,
/// otherwise clear the selection together with its enable flag.
fn validate_selection(s: &mut DeviceSnapshot, kind: DeviceKind) -> bool {
    let Some(key) = s.selected_key(kind).map(str::to_string) else {
        if s.is_enabled(kind) {
            s.set_enabled_flag(kind, false);
            return true;
        }
        return false;
    };

    if s.selected_device(kind).is_some() {
        return false;
    }

    match resolve_revealed_key(kind, &key, s.devices(kind)) {
        Some(revealed) => {
            tracing::info!("Selected {} {} is now {}", kind.display_name(), key, revealed);
            s.set_selected_key(kind, Some(revealed));
        }
        None => {
            tracing::warn!("Selected {} {} disappeared", kind.display_name(), key);
            s.set_selected_key(kind, None);
            s.set_enabled_flag(kind, false);
        }
    }
    true
}
