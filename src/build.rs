//! Bundle build orchestration.
//!
//! Coordinates source collection and the two command phases.
//!
//! # Architecture
//!
//! ```text
//! compile_bundles()
//!     │
//!     ├── find_static_files() ──► collect_static_files()
//!     │       │
//!     │       └── Copy every discovered source beneath the cache root
//!     │
//!     └── compile_bundle()  (sequentially, per selected bundle)
//!             │
//!             ├── apply_preprocessors()   per source, in config order
//!             └── apply_postcompilers()   once, unless --no-compile
//! ```

use crate::{
    compiler::{
        collect::{collect_static_files, default_finders, find_static_files},
        ensure_dirs,
        pipeline::{PhaseContext, apply_postcompilers, apply_preprocessors},
    },
    config::{BundleConfig, Config},
    log,
};
use anyhow::{Context, Result};
use std::fs;

/// Compile the selected bundles (all configured bundles when `selected`
/// is empty). `no_compile` stops after the preprocessing phase.
pub fn compile_bundles(config: &Config, selected: &[String], no_compile: bool) -> Result<()> {
    let bundles = config.select_bundles(selected)?;
    if bundles.is_empty() {
        log!("build"; "no bundles configured");
        return Ok(());
    }

    let cache_root = config.cache_root();
    let finders = default_finders(config);
    let found = find_static_files(&finders, &cache_root);

    log!("collect"; "collecting {} static files into {}", found.len(), cache_root.display());
    let copied = collect_static_files(&found, &cache_root)?;
    if copied > 0 {
        log!("collect"; "copied {copied} files");
    }

    for (name, bundle) in bundles {
        compile_bundle(name, bundle, config, no_compile)
            .with_context(|| format!("Failed to build bundle `{name}`"))?;
    }

    log!("build"; "done");
    Ok(())
}

/// Run both phases for a single bundle.
fn compile_bundle(
    name: &str,
    bundle: &BundleConfig,
    config: &Config,
    no_compile: bool,
) -> Result<()> {
    log!("build"; "processing bundle {name}");

    let ctx = PhaseContext {
        static_root: &config.statics.root,
        static_url: &config.statics.url,
    };

    let mut root = config.cache_root();
    if let Some(cwd) = &bundle.cwd {
        root = root.join(cwd);
    }

    let preprocessors = config.preprocessors_for(bundle);
    let mut outputs: Vec<String> = Vec::new();

    for (src, dst) in bundle.src.entries() {
        let applied = apply_preprocessors(&root, src, dst, preprocessors, &ctx)?;

        // A renaming entry with no matching preprocessor still has to
        // materialize its destination for the next phase
        if !applied && src != dst {
            let src_file = root.join(src);
            let dst_file = root.join(dst);
            ensure_dirs(&dst_file)?;
            fs::copy(&src_file, &dst_file)
                .with_context(|| format!("Failed to copy {} to {}", src_file.display(), dst_file.display()))?;
        }

        outputs.push(dst.to_owned());
    }

    if no_compile {
        return Ok(());
    }

    let postcompilers = config.postcompilers_for(bundle);
    let dst = config.statics.root.join(name);
    apply_postcompilers(&root, &outputs, &dst, postcompilers, &ctx)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::{TempDir, tempdir};

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
    }

    /// Project layout with a source dir and a config rooted in a temp dir.
    fn project(config_toml: &str) -> (TempDir, Config) {
        let dir = tempdir().unwrap();
        let mut config = Config::from_str(config_toml).unwrap();
        config.statics.root = dir.path().join("out");
        config.statics.sources = vec![dir.path().join("static")];
        (dir, config)
    }

    #[test]
    fn test_concat_only_bundle() {
        let (dir, config) = project(
            r#"
            [bundles."site.css"]
            src = ["css/a.css", "css/b.css"]
        "#,
        );
        write(dir.path(), "static/css/a.css", "a {}\n");
        write(dir.path(), "static/css/b.css", "b {}\n");

        compile_bundles(&config, &[], false).unwrap();

        assert_eq!(
            fs::read_to_string(config.statics.root.join("site.css")).unwrap(),
            "a {}\nb {}\n"
        );
    }

    #[test]
    fn test_preprocessed_bundle() {
        let (dir, config) = project(
            r#"
            [preprocessors]
            "*.scss" = ["cat {input}"]

            [bundles."site.css"]
            src = { "css/site.scss" = "css/site.css" }
        "#,
        );
        write(dir.path(), "static/css/site.scss", "body {}\n");

        compile_bundles(&config, &[], false).unwrap();

        // Intermediate output in the cache, final bundle in the root
        assert!(config.cache_root().join("css/site.css").exists());
        assert_eq!(
            fs::read_to_string(config.statics.root.join("site.css")).unwrap(),
            "body {}\n"
        );
    }

    #[test]
    fn test_no_compile_skips_postcompilation() {
        let (dir, config) = project(
            r#"
            [bundles."site.css"]
            src = ["css/a.css"]
        "#,
        );
        write(dir.path(), "static/css/a.css", "a {}\n");

        compile_bundles(&config, &[], true).unwrap();

        assert!(config.cache_root().join("css/a.css").exists());
        assert!(!config.statics.root.join("site.css").exists());
    }

    #[test]
    fn test_bundle_selection() {
        let (dir, config) = project(
            r#"
            [bundles."a.css"]
            src = ["a.css"]

            [bundles."b.css"]
            src = ["b.css"]
        "#,
        );
        write(dir.path(), "static/a.css", "a {}\n");
        write(dir.path(), "static/b.css", "b {}\n");

        compile_bundles(&config, &["b.css".to_owned()], false).unwrap();

        assert!(!config.statics.root.join("a.css").exists());
        assert!(config.statics.root.join("b.css").exists());
    }

    #[test]
    fn test_unknown_bundle_selection() {
        let (_dir, config) = project(
            r#"
            [bundles."a.css"]
            src = ["a.css"]
        "#,
        );

        assert!(compile_bundles(&config, &["missing.css".to_owned()], false).is_err());
    }

    #[test]
    fn test_no_bundles_is_ok() {
        let (_dir, config) = project("");
        compile_bundles(&config, &[], false).unwrap();
    }

    #[test]
    fn test_bundle_cwd_scopes_sources() {
        let (dir, config) = project(
            r#"
            [bundles."app.js"]
            cwd = "js"
            src = ["app.js"]
        "#,
        );
        write(dir.path(), "static/js/app.js", "var app;\n");

        compile_bundles(&config, &[], false).unwrap();

        assert_eq!(
            fs::read_to_string(config.statics.root.join("app.js")).unwrap(),
            "var app;\n"
        );
    }

    #[test]
    fn test_renaming_entry_without_preprocessor() {
        let (dir, config) = project(
            r#"
            [bundles."app.js"]
            src = { "app.es6" = "app.js" }
        "#,
        );
        write(dir.path(), "static/app.es6", "let x;\n");

        compile_bundles(&config, &[], false).unwrap();

        assert_eq!(
            fs::read_to_string(config.statics.root.join("app.js")).unwrap(),
            "let x;\n"
        );
    }

    #[test]
    fn test_failing_command_aborts() {
        let (dir, config) = project(
            r#"
            [preprocessors]
            "*.scss" = ["false {input}"]

            [bundles."site.css"]
            src = ["site.scss"]
        "#,
        );
        write(dir.path(), "static/site.scss", "body {}\n");

        let err = format!("{:#}", compile_bundles(&config, &[], false).unwrap_err());
        assert!(err.contains("site.css"));
    }
}
