//! Recordings folder commands

use super::Context;
use crate::folder::PersistenceSink;
use crate::utils::format::{format_file_size, format_modified};
use std::path::Path;

pub async fn handle_set(ctx: &Context, path: &Path) -> anyhow::Result<()> {
    let handle = ctx.folder.select_folder(path).await?;
    println!("Recordings will be saved to {}", handle.path.display());
    Ok(())
}

pub async fn handle_clear(ctx: &Context) -> anyhow::Result<()> {
    ctx.folder.clear_folder().await?;
    println!("Recordings folder cleared");
    Ok(())
}

pub async fn handle_status(ctx: &Context) -> anyhow::Result<()> {
    let permission = ctx.folder.request_permission().await;
    match ctx.folder.folder_handle().await {
        Some(handle) => println!("{} ({}): {:?}", handle.name, handle.path.display(), permission),
        None => println!("No recordings folder selected"),
    }
    Ok(())
}

pub async fn handle_list(ctx: &Context) -> anyhow::Result<()> {
    let recordings = ctx.folder.refresh_recordings().await?;
    if recordings.is_empty() {
        println!("No recordings found");
        return Ok(());
    }

    let width = recordings.iter().map(|r| r.name.len()).max().unwrap_or(0);
    for recording in &recordings {
        println!(
            "{:<width$}  {:>10}  {}  {}",
            recording.name,
            format_file_size(recording.size),
            format_modified(recording.last_modified),
            recording.mime_type,
            width = width
        );
    }
    Ok(())
}

pub async fn handle_inspect(ctx: &Context, name: &str) -> anyhow::Result<()> {
    let file = ctx.folder.read_recording_file(name).await?;
    println!("{}", file.name);
    println!("  type: {}", file.mime_type);
    println!("  size: {}", format_file_size(file.bytes.len() as u64));
    Ok(())
}
