//! Folder Recorder - capture screen, camera and microphone into a local folder.
//!
//! The library holds the recording session state machine, the device
//! registry and permission gate, and the folder persistence sink. Capture
//! hardware sits behind [`capture::MediaPlatform`].

pub mod capture;
pub mod commands;
pub mod config;
pub mod devices;
pub mod folder;
pub mod recorder;
pub mod storage;
pub mod utils;

#[cfg(test)]
mod testing;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Parse the command line and run the requested command
pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "folder_recorder_lib=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Starting Folder Recorder v{}", env!("CARGO_PKG_VERSION"));

    let cli = commands::Cli::parse();
    commands::dispatch(cli).await
}
