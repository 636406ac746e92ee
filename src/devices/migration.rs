//! Migration of persisted device selections
//!
//! Old records identified devices by their raw hardware id. They are
//! rewritten into selection keys once, when the selection is loaded.

use super::key::{id_selection_key, is_selection_key, normalize_label, parse_default_key, DeviceKind, MediaInputDevice};
use crate::storage::preferences::SelectedMediaDevices;

/// Convert a stored record into the current schema.
///
/// Returns `None` when neither a camera nor a microphone can be resolved.
/// Empty legacy ids can only be matched against the current enumeration,
/// which is why the device lists are inputs.
pub fn migrate_selection(
    record: &SelectedMediaDevices,
    cameras: &[MediaInputDevice],
    microphones: &[MediaInputDevice],
) -> Option<SelectedMediaDevices> {
    let camera = resolve_key(
        DeviceKind::Camera,
        record.camera_selection_key.as_deref(),
        record.camera_device_id.as_deref(),
        cameras,
    );
    let microphone = resolve_key(
        DeviceKind::Microphone,
        record.microphone_selection_key.as_deref(),
        record.microphone_device_id.as_deref(),
        microphones,
    );

    if camera.is_none() && microphone.is_none() {
        return None;
    }

    Some(SelectedMediaDevices {
        camera_selection_key: camera,
        camera_device_id: None,
        microphone_selection_key: microphone,
        microphone_device_id: None,
        last_selected: record.last_selected,
    })
}

fn resolve_key(
    kind: DeviceKind,
    selection_key: Option<&str>,
    legacy_id: Option<&str>,
    devices: &[MediaInputDevice],
) -> Option<String> {
    if let Some(key) = selection_key.filter(|k| !k.is_empty()) {
        return Some(key.to_string());
    }

    let legacy_id = legacy_id?;
    if is_selection_key(kind, legacy_id) {
        return Some(legacy_id.to_string());
    }
    if !legacy_id.is_empty() {
        return Some(id_selection_key(kind, legacy_id));
    }

    devices
        .iter()
        .find(|d| d.kind == kind && !d.has_device_id())
        .map(|d| d.selection_key.clone())
}

/// Find the device a positional key referred to after ids became visible.
///
/// Keys of id-less devices stop matching once permission is granted and the
/// platform reports real ids. The device is matched by group id first, then
/// as the only device of its kind, then by position when the label agrees or
/// was hidden.
pub fn resolve_revealed_key(kind: DeviceKind, key: &str, devices: &[MediaInputDevice]) -> Option<String> {
    let (group_id, label, index) = parse_default_key(kind, key)?;

    let by_group = (!group_id.is_empty())
        .then(|| devices.iter().find(|d| d.group_id == group_id))
        .flatten();
    if let Some(device) = by_group {
        return Some(device.selection_key.clone());
    }

    if let [only] = devices {
        return Some(only.selection_key.clone());
    }

    devices
        .get(index)
        .filter(|d| label == "unlabeled" || normalize_label(&d.label) == label)
        .map(|d| d.selection_key.clone())
}
