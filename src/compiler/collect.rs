//! Source discovery and cache population.
//!
//! Static files are located through finders and copied beneath the cache
//! root, which the command phases then treat as their working tree. The
//! cache directory doubles as a source of already-built intermediates, so
//! discovery must never list its own output back as input.

use super::{IGNORED_FILES, ensure_dirs, is_up_to_date};
use crate::config::Config;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use std::{
    fs,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

// ============================================================================
// Finders
// ============================================================================

/// Lists static files as (relative path, absolute path) pairs.
pub trait StaticFinder {
    fn list(&self) -> Vec<(String, PathBuf)>;
}

/// Finds files by walking a single source directory.
pub struct DirFinder {
    base: PathBuf,
}

impl DirFinder {
    pub fn new(base: &Path) -> Self {
        Self {
            base: base.to_path_buf(),
        }
    }
}

impl StaticFinder for DirFinder {
    fn list(&self) -> Vec<(String, PathBuf)> {
        WalkDir::new(&self.base)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                let name = entry.file_name().to_str().unwrap_or_default();
                !IGNORED_FILES.contains(&name)
            })
            .filter_map(|entry| {
                let abspath = entry.into_path();
                let rel = abspath.strip_prefix(&self.base).ok()?;
                Some((rel.to_string_lossy().replace('\\', "/"), abspath))
            })
            .collect()
    }
}

/// Build a finder for every configured source directory.
pub fn default_finders(config: &Config) -> Vec<Box<dyn StaticFinder>> {
    config
        .statics
        .sources
        .iter()
        .map(|dir| Box::new(DirFinder::new(dir)) as Box<dyn StaticFinder>)
        .collect()
}

// ============================================================================
// Discovery and Collection
// ============================================================================

/// Merge all finders' listings into one map keyed by relative path.
///
/// Files living under the cache root are skipped so compiled output never
/// feeds back into the pipeline as input. A later finder's entry replaces
/// an earlier one's under the same relative path.
pub fn find_static_files(
    finders: &[Box<dyn StaticFinder>],
    cache_root: &Path,
) -> IndexMap<String, PathBuf> {
    let mut found = IndexMap::new();

    for finder in finders {
        for (rel, abspath) in finder.list() {
            if abspath.starts_with(cache_root) {
                continue;
            }
            found.insert(rel, abspath);
        }
    }

    found
}

/// Copy every discovered file beneath the cache root.
///
/// Unchanged files (cache copy at least as new as the source) are left
/// alone so the command phases see stable modification times. Returns the
/// number of files actually copied.
pub fn collect_static_files(
    found: &IndexMap<String, PathBuf>,
    cache_root: &Path,
) -> Result<usize> {
    let mut copied = 0;

    for (rel, abs_src) in found {
        let abs_dst = cache_root.join(rel);
        if is_up_to_date(abs_src, &abs_dst) {
            continue;
        }
        copy_file(abs_src, &abs_dst)?;
        copied += 1;
    }

    Ok(copied)
}

fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    ensure_dirs(dst)?;
    fs::copy(src, dst)
        .with_context(|| format!("Failed to copy {} to {}", src.display(), dst.display()))?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
