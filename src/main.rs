mod app;
mod clock;
mod config;
mod game;
mod input;
mod model;
mod render;
mod sim;
mod storage;

use anyhow::{Context, Result};
use clap::Parser;
use std::{fs::OpenOptions, path::PathBuf, sync::Mutex};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "petsim")]
#[command(about = "A virtual pet that lives in your terminal")]
pub(crate) struct Cli {
    /// Where the save, settings and log files live
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Keep the pet in memory only; nothing is saved
    #[arg(long, default_value_t = false)]
    ephemeral: bool,

    /// Clock speed multiplier (2.0 = twice as fast)
    #[arg(long)]
    speed: Option<f32>,

    /// Frame cap
    #[arg(long)]
    fps: Option<u32>,

    /// Force monochrome (no colors)
    #[arg(long, default_value_t = false)]
    mono: bool,

    /// Log level written to petsim.log (error, warn, info, debug, trace)
    #[arg(long, default_value_t = Level::INFO)]
    log_level: Level,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let paths = config::project_paths(cli.data_dir.clone())?;

    // stdout belongs to the terminal UI, so logs go to a file
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.log_path)
        .with_context(|| format!("could not open log file {}", paths.log_path.display()))?;
    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!(version = env!("CARGO_PKG_VERSION"), "petsim starting");
    app::run(&cli, paths)
}
