//! Command-line handlers
//!
//! Each subcommand opens the persisted stores under the configured data
//! directory, performs one operation and prints the result.

pub mod devices;
pub mod folder;
pub mod preferences;

use crate::config::AppConfig;
use crate::folder::FolderStorage;
use crate::storage::JsonFileStore;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "folder-recorder")]
#[command(version)]
#[command(about = "Record screen, camera and microphone sessions into a local folder")]
pub struct Cli {
    /// Configuration file (JSON)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Override the directory holding stored preferences
    #[arg(long, value_name = "DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage the recordings folder
    #[command(subcommand)]
    Folder(FolderCommand),

    /// List recordings in the selected folder, newest first
    #[command(visible_alias = "ls")]
    List,

    /// Show the type and size of one recording
    Inspect {
        /// File name inside the recordings folder
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// List input devices and manage the selection and toggles
    #[command(subcommand)]
    Devices(DevicesCommand),

    /// Show or reset stored device preferences
    #[command(subcommand)]
    Prefs(PrefsCommand),

    /// Print the effective configuration
    Config,
}

#[derive(Subcommand)]
pub enum FolderCommand {
    /// Choose the directory recordings are written to
    Set {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
    /// Forget the chosen directory
    Clear,
    /// Show the chosen directory and its access state
    Status,
}

#[derive(Subcommand)]
pub enum DevicesCommand {
    /// Enumerate cameras and microphones with the current selection
    List,
    /// Select a device by its selection key
    Select {
        #[arg(value_name = "KEY")]
        key: String,
    },
    /// Turn a selected input on
    Enable {
        #[arg(value_enum)]
        input: InputKind,
    },
    /// Turn an input off
    Disable {
        #[arg(value_enum)]
        input: InputKind,
    },
    /// Turn screen sharing on or off
    Screen {
        #[arg(value_enum)]
        state: Switch,
    },
    /// Ask for camera/microphone access for the enabled inputs
    RequestAccess,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum InputKind {
    Camera,
    Microphone,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

#[derive(Subcommand)]
pub enum PrefsCommand {
    /// Print stored toggles and device selection
    Show,
    /// Remove stored toggles and device selection
    Clear,
}

/// Stores shared by all handlers
pub struct Context {
    pub config: AppConfig,
    pub store: Arc<JsonFileStore>,
    pub folder: FolderStorage,
}

impl Context {
    pub async fn open(config: AppConfig) -> Self {
        let store = Arc::new(JsonFileStore::new(config.data_dir.clone()));
        let folder = FolderStorage::new(store.clone());
        folder.restore().await;
        Self { config, store, folder }
    }
}

/// Resolve the configuration from the command-line flags
pub fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    Ok(config)
}

pub async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let ctx = Context::open(config).await;

    match cli.command {
        Commands::Folder(FolderCommand::Set { path }) => folder::handle_set(&ctx, &path).await?,
        Commands::Folder(FolderCommand::Clear) => folder::handle_clear(&ctx).await?,
        Commands::Folder(FolderCommand::Status) => folder::handle_status(&ctx).await?,
        Commands::List => folder::handle_list(&ctx).await?,
        Commands::Inspect { name } => folder::handle_inspect(&ctx, &name).await?,
        Commands::Devices(command) => devices::handle(&ctx, command).await?,
        Commands::Prefs(PrefsCommand::Show) => preferences::handle_show(&ctx).await?,
        Commands::Prefs(PrefsCommand::Clear) => preferences::handle_clear(&ctx).await?,
        Commands::Config => println!("{}", serde_json::to_string_pretty(&ctx.config)?),
    }

    Ok(())
}
