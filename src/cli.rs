//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// staticc asset compiler CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root directory
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Config file name (default: staticc.toml)
    #[arg(short = 'C', long, default_value = "staticc.toml")]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Compile bundles into the static root
    Build {
        /// Bundle names to compile (all configured bundles when omitted)
        bundles: Vec<String>,

        /// Run only the preprocessing phase, skip postcompilation
        #[arg(long)]
        no_compile: bool,
    },

    /// Print the HTML tags for a bundle, rebuilding it first when stale
    Tags {
        /// Bundle name (or a plain output path outside debug mode)
        bundle: String,

        /// Explicit mimetype for outputs without a known extension
        #[arg(short, long)]
        mimetype: Option<String>,

        /// Extra tag attributes as key=value pairs
        #[arg(short, long = "attr", value_name = "KEY=VALUE")]
        attrs: Vec<String>,
    },

    /// Rebuild bundles whenever their sources change
    Watch {
        /// Bundle names to watch (all configured bundles when omitted)
        bundles: Vec<String>,
    },
}
