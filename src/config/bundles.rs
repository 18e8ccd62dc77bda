//! Bundle definitions and glob-keyed command tables.
//!
//! A bundle is a named group of source files compiled and concatenated into
//! one output asset. Commands are configured in tables keyed by glob
//! pattern; the pattern decides which commands apply to a given file.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Glob pattern → command templates, iterated in config order.
///
/// Preprocessor tables are matched against source paths, postcompiler
/// tables against destination paths.
pub type CommandTable = IndexMap<String, Vec<String>>;

/// Bundle source specification.
///
/// Either a plain list (each source preprocesses onto itself) or an
/// ordered map of source path → intermediate destination path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceSpec {
    List(Vec<String>),
    Map(IndexMap<String, String>),
}

impl SourceSpec {
    /// (source, destination) pairs in config order.
    ///
    /// List form reuses the source path as the destination.
    pub fn entries(&self) -> Vec<(&str, &str)> {
        match self {
            Self::List(srcs) => srcs.iter().map(|s| (s.as_str(), s.as_str())).collect(),
            Self::Map(map) => map.iter().map(|(s, d)| (s.as_str(), d.as_str())).collect(),
        }
    }

    /// Destination paths in config order.
    pub fn outputs(&self) -> Vec<&str> {
        self.entries().into_iter().map(|(_, dst)| dst).collect()
    }

    pub const fn is_map(&self) -> bool {
        matches!(self, Self::Map(_))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::List(srcs) => srcs.is_empty(),
            Self::Map(map) => map.is_empty(),
        }
    }
}

/// `[bundles.<name>]` entry - one output asset built from a source group.
///
/// # Example
/// ```toml
/// [bundles."app.css"]
/// src = ["css/reset.scss", "css/site.scss"]
///
/// [bundles."app.js"]
/// cwd = "js"
/// src = { "app.coffee" = "app.js" }
/// [bundles."app.js".postcompilers]
/// "*.js" = ["uglifyjs {input} -o {output}"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BundleConfig {
    /// Source files, relative to the bundle working root.
    pub src: SourceSpec,

    /// Working subdirectory under the cache root.
    #[serde(default)]
    pub cwd: Option<PathBuf>,

    /// Per-bundle preprocessor table. Replaces the global `[preprocessors]`
    /// table entirely when present.
    #[serde(default)]
    pub preprocessors: Option<CommandTable>,

    /// Per-bundle postcompiler table. Replaces the global `[postcompilers]`
    /// table entirely when present.
    #[serde(default)]
    pub postcompilers: Option<CommandTable>,
}
