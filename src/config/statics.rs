//! `[static]` section configuration.
//!
//! Contains the output layout and source discovery roots.

use super::defaults;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[static]` section in staticc.toml - output layout and discovery roots.
///
/// # Example
/// ```toml
/// [static]
/// root = "static_build"          # Compiled bundles land here
/// url = "/static/"               # Public URL prefix for tags
/// sources = ["app/static"]       # Directories scanned for sources
/// cache = ".cache"               # Intermediate files, under `root`
/// debug = true                   # Tag helper rebuilds stale bundles
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct StaticConfig {
    /// Output directory for compiled bundles.
    #[serde(default = "defaults::statics::root")]
    #[educe(Default = defaults::statics::root())]
    pub root: PathBuf,

    /// Public URL prefix the tag helper joins output paths onto.
    /// Must end with `/`.
    #[serde(default = "defaults::statics::url")]
    #[educe(Default = defaults::statics::url())]
    pub url: String,

    /// Source directories scanned for static files, in precedence order.
    /// A later directory's file replaces an earlier one's under the same
    /// relative path.
    #[serde(default = "defaults::statics::sources")]
    #[educe(Default = defaults::statics::sources())]
    pub sources: Vec<PathBuf>,

    /// Cache directory name created under `root` for intermediate files.
    #[serde(default = "defaults::statics::cache")]
    #[educe(Default = defaults::statics::cache())]
    pub cache: String,

    /// Debug mode: the tag helper checks source staleness and rebuilds
    /// before rendering, and renders one tag per intermediate file.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub debug: bool,

    /// Treat a tag source that no finder can locate as a hard error.
    #[serde(default = "defaults::r#false")]
    #[educe(Default = false)]
    pub strict: bool,
}

#[cfg(test)]
mod tests {
    use super::super::Config;
    use std::path::PathBuf;

    #[test]
    fn test_static_config() {
        let config = r#"
            [static]
            root = "out"
            url = "/assets/"
            sources = ["a/static", "b/static"]
            cache = ".work"
            debug = true
            strict = true
        "#;
        let config: Config = toml::from_str(config).unwrap();

        assert_eq!(config.statics.root, PathBuf::from("out"));
        assert_eq!(config.statics.url, "/assets/");
        assert_eq!(config.statics.sources.len(), 2);
        assert_eq!(config.statics.cache, ".work");
        assert!(config.statics.debug);
        assert!(config.statics.strict);
    }

    #[test]
    fn test_static_config_defaults() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config.statics.root, PathBuf::from("static_build"));
        assert_eq!(config.statics.url, "/static/");
        assert_eq!(config.statics.sources, vec![PathBuf::from("static")]);
        assert_eq!(config.statics.cache, ".cache");
        assert!(!config.statics.debug);
        assert!(!config.statics.strict);
    }

    #[test]
    fn test_static_config_partial_override() {
        let config = r#"
            [static]
            url = "/media/"
        "#;
        let config: Config = toml::from_str(config).unwrap();

        // url is overridden
        assert_eq!(config.statics.url, "/media/");
        // everything else keeps its default
        assert_eq!(config.statics.root, PathBuf::from("static_build"));
        assert_eq!(config.statics.cache, ".cache");
    }

    #[test]
    fn test_unknown_field_rejection() {
        let config = r#"
            [static]
            unknown_field = "should_fail"
        "#;
        let result: Result<Config, _> = toml::from_str(config);

        assert!(result.is_err());
    }
}
