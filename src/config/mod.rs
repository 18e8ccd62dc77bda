//! Project configuration management for `staticc.toml`.
//!
//! # Sections
//!
//! | Section            | Purpose                                         |
//! |--------------------|-------------------------------------------------|
//! | `[static]`         | Output root, URL prefix, source dirs, cache     |
//! | `[preprocessors]`  | Global per-file command table (glob → commands) |
//! | `[postcompilers]`  | Global per-bundle command table                 |
//! | `[bundles.<name>]` | Named output assets built from source groups    |
//!
//! # Example
//!
//! ```toml
//! [static]
//! root = "static_build"
//! url = "/static/"
//! sources = ["app/static", "vendor/static"]
//!
//! [preprocessors]
//! "*.scss" = ["sass {input} {output}"]
//!
//! [postcompilers]
//! "*.js" = ["uglifyjs {input} -o {output}"]
//!
//! [bundles."app.css"]
//! src = ["css/reset.scss", "css/site.scss"]
//! ```

mod bundles;
pub mod defaults;
mod error;
mod statics;

// Re-export public types used by other modules
pub use bundles::{BundleConfig, CommandTable, SourceSpec};
pub use statics::StaticConfig;

use crate::cli::Cli;
use anyhow::{Context, Result, anyhow, bail};
use error::ConfigError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing staticc.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Absolute project root (set after loading)
    #[serde(skip)]
    pub project_root: PathBuf,

    /// Output layout and source discovery roots
    #[serde(rename = "static", default)]
    pub statics: StaticConfig,

    /// Global per-file command table, matched against source paths
    #[serde(default)]
    pub preprocessors: CommandTable,

    /// Global cross-file command table, matched against destination paths
    #[serde(default)]
    pub postcompilers: CommandTable,

    /// Named bundles
    #[serde(default)]
    pub bundles: IndexMap<String, BundleConfig>,
}

impl Config {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// The cache directory for intermediate files, under the static root.
    pub fn cache_root(&self) -> PathBuf {
        self.statics.root.join(&self.statics.cache)
    }

    /// Update configuration with CLI arguments and normalize all configured
    /// paths to absolute paths under the project root.
    pub fn update_with_cli(&mut self, cli: &Cli) {
        let root = cli.root.clone().unwrap_or_else(|| PathBuf::from("./"));
        let root = Self::normalize_path(&root);

        self.config_path = Self::normalize_path(&root.join(&cli.config));
        self.statics.root = Self::normalize_path(&root.join(&self.statics.root));
        self.statics.sources = self
            .statics
            .sources
            .iter()
            .map(|dir| {
                let expanded = shellexpand::tilde(&dir.to_string_lossy()).into_owned();
                let dir = PathBuf::from(expanded);
                if dir.is_absolute() {
                    Self::normalize_path(&dir)
                } else {
                    Self::normalize_path(&root.join(dir))
                }
            })
            .collect();
        self.project_root = root;
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            // For non-existent paths, manually make them absolute
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.config_path.exists() {
            bail!("Config file not found");
        }

        if self.statics.url.is_empty() || !self.statics.url.ends_with('/') {
            bail!(ConfigError::Validation(
                "[static.url] must end with `/`".into()
            ));
        }

        if self.statics.sources.is_empty() {
            bail!(ConfigError::Validation(
                "[static.sources] must list at least one directory".into()
            ));
        }

        if self.statics.cache.is_empty() || Path::new(&self.statics.cache).is_absolute() {
            bail!(ConfigError::Validation(
                "[static.cache] must be a relative directory name".into()
            ));
        }

        Self::check_table("[preprocessors]", &self.preprocessors)?;
        Self::check_table("[postcompilers]", &self.postcompilers)?;

        for (name, bundle) in &self.bundles {
            if bundle.src.is_empty() {
                bail!(ConfigError::Validation(format!(
                    "[bundles.\"{name}\".src] must not be empty"
                )));
            }

            if let Some(cwd) = &bundle.cwd
                && cwd.is_absolute()
            {
                bail!(ConfigError::Validation(format!(
                    "[bundles.\"{name}\".cwd] must be relative"
                )));
            }

            if let Some(table) = &bundle.preprocessors {
                Self::check_table(&format!("[bundles.\"{name}\".preprocessors]"), table)?;
            }
            if let Some(table) = &bundle.postcompilers {
                Self::check_table(&format!("[bundles.\"{name}\".postcompilers]"), table)?;
            }
        }

        Ok(())
    }

    /// Check every pattern and command template in a table.
    fn check_table(field: &str, table: &CommandTable) -> Result<()> {
        for (pattern, commands) in table {
            glob::Pattern::new(pattern).map_err(|err| {
                ConfigError::Validation(format!("{field} pattern `{pattern}`: {err}"))
            })?;

            if commands.is_empty() {
                bail!(ConfigError::Validation(format!(
                    "{field} pattern `{pattern}` has no commands"
                )));
            }

            for command in commands {
                Self::check_command(field, command)?;
            }
        }
        Ok(())
    }

    /// Check one command template parses and its program is installed.
    ///
    /// Programs named through a substitution or a path resolve at run time
    /// and are not checked here.
    fn check_command(field: &str, template: &str) -> Result<()> {
        let words = shell_words::split(template).map_err(|err| {
            ConfigError::Validation(format!("{field}: cannot parse `{template}`: {err}"))
        })?;

        let Some(program) = words.first() else {
            bail!(ConfigError::Validation(format!("{field}: empty command")));
        };

        if !program.contains('{') && !program.contains(std::path::MAIN_SEPARATOR) {
            which::which(program)
                .with_context(|| format!("`{program}` not found. Please install it first."))?;
        }

        Ok(())
    }

    /// Resolve a bundle-name selection against the configured bundles.
    ///
    /// An empty selection means every bundle, in config order.
    pub fn select_bundles(&self, names: &[String]) -> Result<Vec<(&str, &BundleConfig)>> {
        if names.is_empty() {
            return Ok(self
                .bundles
                .iter()
                .map(|(name, bundle)| (name.as_str(), bundle))
                .collect());
        }

        names
            .iter()
            .map(|name| {
                self.bundles
                    .get_key_value(name)
                    .map(|(name, bundle)| (name.as_str(), bundle))
                    .ok_or_else(|| anyhow!("Unknown bundle `{name}`"))
            })
            .collect()
    }

    /// The preprocessor table for a bundle (per-bundle override or global).
    pub fn preprocessors_for<'a>(&'a self, bundle: &'a BundleConfig) -> &'a CommandTable {
        bundle.preprocessors.as_ref().unwrap_or(&self.preprocessors)
    }

    /// The postcompiler table for a bundle (per-bundle override or global).
    pub fn postcompilers_for<'a>(&'a self, bundle: &'a BundleConfig) -> &'a CommandTable {
        bundle.postcompilers.as_ref().unwrap_or(&self.postcompilers)
    }
}

// ============================================================================
// Tests
// ============================================================================
