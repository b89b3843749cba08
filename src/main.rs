//! EchoClip CLI
//!
//! Renders voice clips through the echo and voice chain from the command line.

use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::{debug, info};

use echoclip::cli::commands;
use echoclip::cli::{Cli, Commands};
use echoclip::state::Studio;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    info!("EchoClip v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(cmd) => handle_command(cmd, cli.config.as_deref()),
        None => {
            println!("EchoClip v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands, config_path: Option<&std::path::Path>) -> Result<()> {
    let config = commands::load_config(config_path)?;
    debug!("Config: {:?}", config);

    match cmd {
        Commands::Render {
            input,
            out_dir,
            effects,
            preview,
            json,
        } => {
            let params = commands::resolve_params(&config, &effects)?;
            let mut studio = Studio::new(config);
            studio.set_params(params)?;
            commands::render(&mut studio, &input, &out_dir, preview, json)?;
            Ok(())
        }
        Commands::RenderDir {
            dir,
            out_dir,
            effects,
        } => {
            let params = commands::resolve_params(&config, &effects)?;
            let mut studio = Studio::new(config);
            studio.set_params(params)?;
            commands::render_dir(&mut studio, &dir, &out_dir)?;
            Ok(())
        }
        Commands::Info { input } => commands::info(&input),
        Commands::Params { effects } => {
            let params = commands::resolve_params(&config, &effects)?;
            commands::print_params(&params)
        }
    }
}
