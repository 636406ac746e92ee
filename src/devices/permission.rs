//! Media permission gate
//!
//! Pure rules deciding when the recorder may ask for camera/microphone
//! access and what it asks for. The registry applies them.

use super::registry::DeviceSnapshot;
use crate::capture::{MediaConstraints, PermissionState, TrackConstraint};

/// At least one camera or microphone is both enabled and selected
pub fn has_enabled_input(snapshot: &DeviceSnapshot) -> bool {
    microphone_active(snapshot) || camera_active(snapshot)
}

pub fn microphone_active(snapshot: &DeviceSnapshot) -> bool {
    snapshot.microphone_enabled && snapshot.selected_microphone_key.is_some()
}

pub fn camera_active(snapshot: &DeviceSnapshot) -> bool {
    snapshot.camera_enabled && snapshot.selected_camera_key.is_some()
}

/// Move between `unknown` and `prompt` as inputs are enabled or disabled.
///
/// `granted` and `denied` are never reset here.
pub fn reconcile_permission(current: PermissionState, has_enabled_input: bool) -> PermissionState {
    match current {
        PermissionState::Unknown if has_enabled_input => PermissionState::Prompt,
        PermissionState::Prompt if !has_enabled_input => PermissionState::Unknown,
        other => other,
    }
}

/// Constraints for the access request stream, `None` when nothing is enabled
pub fn access_constraints(snapshot: &DeviceSnapshot) -> Option<MediaConstraints> {
    if !has_enabled_input(snapshot) {
        return None;
    }

    let video = if camera_active(snapshot) {
        device_constraint(snapshot.selected_camera().map(|d| d.device_id.as_str()))
    } else {
        TrackConstraint::Disabled
    };
    let audio = if microphone_active(snapshot) {
        device_constraint(snapshot.selected_microphone().map(|d| d.device_id.as_str()))
    } else {
        TrackConstraint::Disabled
    };

    Some(MediaConstraints { video, audio })
}

/// Exact id when the selected device has one, otherwise any device of the kind
pub fn device_constraint(device_id: Option<&str>) -> TrackConstraint {
    TrackConstraint::for_device_id(device_id.unwrap_or_default())
}
