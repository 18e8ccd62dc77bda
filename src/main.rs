//! staticc - a static asset compiler and bundler.

mod build;
mod cli;
mod compiler;
mod config;
mod tags;
mod utils;
mod watch;

use anyhow::Result;
use build::compile_bundles;
use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use std::path::Path;
use tags::TagOptions;
use watch::watch_bundles;

fn main() -> Result<()> {
    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));
    let config: &'static Config = Box::leak(Box::new(load_config(cli)?));

    match &cli.command {
        Commands::Build {
            bundles,
            no_compile,
        } => compile_bundles(config, bundles, *no_compile),
        Commands::Tags {
            bundle,
            mimetype,
            attrs,
        } => {
            let opts = TagOptions::from_cli(mimetype.as_deref(), attrs)?;
            let html = tags::emit(config, bundle, &opts)?;
            println!("{html}");
            Ok(())
        }
        Commands::Watch { bundles } => watch_bundles(config, bundles),
    }
}

/// Load and validate configuration from CLI arguments
fn load_config(cli: &'static Cli) -> Result<Config> {
    let root = cli.root.as_deref().unwrap_or(Path::new("./"));
    let config_path = root.join(&cli.config);

    let mut config = Config::from_path(&config_path)?;
    config.update_with_cli(cli);
    config.validate()?;

    Ok(config)
}
