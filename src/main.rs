#![warn(clippy::pedantic)]

use std::process::ExitCode;

use anyhow::Context;
use launcher_config::LauncherConfig;
use log::error;

mod entry_box;
mod error;
mod icon;
mod input_box;
mod launcher;
mod launcher_config;
mod layout;
mod registry;
mod render_canvas;
mod text_label;
mod watcher;
mod wayland;

fn run() -> anyhow::Result<()> {
    let config = LauncherConfig::load().context("Failed to load configuration")?;
    wayland::run(config).context("Failed to run the launcher overlay")
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
