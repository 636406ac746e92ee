//! Stored preference commands

use super::Context;
use crate::storage::preferences;
use serde_json::json;

pub async fn handle_show(ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.store.as_ref();
    let summary = json!({
        "mediaToggles": preferences::load_toggles(store).await,
        "screenSharing": preferences::load_screen_sharing(store).await,
        "selectedMediaDevices": preferences::load_selection(store).await,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

pub async fn handle_clear(ctx: &Context) -> anyhow::Result<()> {
    preferences::clear_all(ctx.store.as_ref()).await?;
    tracing::info!("Cleared stored preferences in {:?}", ctx.config.data_dir);
    println!("Stored preferences cleared");
    Ok(())
}
