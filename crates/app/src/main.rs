//! Entry point for Orbview.

mod cli;

use anyhow::Result;
use clap::Parser;

use crate::cli::Cli;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.viewer_config();
    log::info!(
        "Starting Orbview. Model: {}, backend: {:?}, show_fps={}, window_size={}x{}",
        config.model_path.display(),
        cli.gpu_backend,
        config.show_fps,
        config.width,
        config.height
    );
    log::debug!("Import options: {:?}", config.import);

    platform::run_viewer(config)?;

    log::info!("Graceful shutdown. Bye!");
    Ok(())
}
