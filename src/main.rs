//! lytex-preview - live PDF preview for LilyPond + LaTeX documents.

mod cli;
mod compiler;
mod config;
mod core;
mod embed;
mod logger;
mod preview;
mod session;
mod status;
mod surface;
mod transport;
mod utils;
mod watch;
mod workbench;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::PreviewConfig;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = PreviewConfig::load(&cli)?;
    if let Some(path) = &config.config_path {
        debug!("config"; "loaded {}", path.display());
    }

    match &cli.command {
        Commands::Serve { files, .. } => cli::serve::serve(&config, files.clone()),
        Commands::Compile { file } => {
            if !cli::compile::compile_file(&config, file.as_deref())? {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Check => cli::check::check_toolchain(),
    }
}
