//! Device registry commands

use super::{Context, DevicesCommand, InputKind, Switch};
use crate::capture::HostPlatform;
use crate::devices::key::{is_selection_key, DeviceKind};
use crate::devices::{DeviceRegistry, DeviceSnapshot, MediaInputDevice};
use crate::recorder::{can_start_recording, SessionSnapshot};
use crate::utils::AppError;
use std::sync::Arc;

pub async fn handle(ctx: &Context, command: DevicesCommand) -> anyhow::Result<()> {
    let registry = DeviceRegistry::new(Arc::new(HostPlatform::new()), ctx.store.clone());
    registry.initialize().await;

    match command {
        DevicesCommand::List => {}
        DevicesCommand::Select { key } => select(&registry, &key).await?,
        DevicesCommand::Enable { input } => set_enabled(&registry, input, true).await?,
        DevicesCommand::Disable { input } => set_enabled(&registry, input, false).await?,
        DevicesCommand::Screen { state } => registry.set_screen_sharing_enabled(state == Switch::On).await?,
        DevicesCommand::RequestAccess => {
            let permission = registry.request_permission().await?;
            println!("Media access: {:?}", permission);
        }
    }

    print_snapshot(&registry.snapshot());
    Ok(())
}

async fn select(registry: &DeviceRegistry, key: &str) -> anyhow::Result<()> {
    if is_selection_key(DeviceKind::Camera, key) {
        registry.select_camera(key).await?;
    } else if is_selection_key(DeviceKind::Microphone, key) {
        registry.select_microphone(key).await?;
    } else {
        return Err(AppError::InvalidSelection(format!("{key} is not a device selection key")).into());
    }
    Ok(())
}

async fn set_enabled(registry: &DeviceRegistry, input: InputKind, enabled: bool) -> anyhow::Result<()> {
    match input {
        InputKind::Camera => registry.set_camera_enabled(enabled).await?,
        InputKind::Microphone => registry.set_microphone_enabled(enabled).await?,
    }
    Ok(())
}

fn print_snapshot(snapshot: &DeviceSnapshot) {
    print_devices("Cameras", &snapshot.cameras, snapshot.selected_camera_key.as_deref(), snapshot.camera_enabled);
    print_devices(
        "Microphones",
        &snapshot.microphones,
        snapshot.selected_microphone_key.as_deref(),
        snapshot.microphone_enabled,
    );
    println!("Screen sharing: {}", if snapshot.screen_sharing_enabled { "on" } else { "off" });
    println!("Media access: {:?}", snapshot.permission);
    println!(
        "Ready to record: {}",
        if can_start_recording(&SessionSnapshot::default(), snapshot) { "yes" } else { "no" }
    );
    if let Some(message) = &snapshot.error_message {
        println!("Note: {message}");
    }
}

fn print_devices(title: &str, devices: &[MediaInputDevice], selected: Option<&str>, enabled: bool) {
    println!("{title}{}:", if enabled { " (on)" } else { "" });
    if devices.is_empty() {
        println!("  none");
    }
    for (index, device) in devices.iter().enumerate() {
        let marker = if selected == Some(device.selection_key.as_str()) { '*' } else { ' ' };
        println!("{marker} {}  [{}]", device.display_label(index), device.selection_key);
    }
}
