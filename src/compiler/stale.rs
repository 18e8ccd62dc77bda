//! Modification-time tracking for rebuild decisions.
//!
//! Debug-mode tag rendering decides whether a bundle needs a rebuild by
//! comparing each source's modification time against the last one seen.
//! Records are seeded from the cache copy, so a fresh process still
//! detects sources edited since the last build.

use crate::config::{BundleConfig, Config};
use anyhow::{Result, bail};
use indexmap::IndexMap;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

/// In-memory source path → last-seen modification time.
///
/// Scoped to the process lifetime; never persisted, never locked.
#[derive(Debug, Default)]
pub struct ModTimeCache {
    seen: HashMap<String, SystemTime>,
}

impl ModTimeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sources of `bundle` whose modification time has advanced past the
    /// recorded one, plus map-form sources whose configured intermediate
    /// output is missing from the cache.
    ///
    /// `found` is the finder listing used to resolve sources to absolute
    /// paths. Recorded times update as observed, so a source reports
    /// changed once per edit.
    ///
    /// # Errors
    /// A source no finder can locate is an error in strict mode.
    pub fn changed_sources(
        &mut self,
        bundle: &BundleConfig,
        found: &IndexMap<String, PathBuf>,
        config: &Config,
    ) -> Result<Vec<String>> {
        let cache_root = config.cache_root();
        let mut changed = Vec::new();

        for (src, dst) in bundle.src.entries() {
            let recorded = self
                .seen
                .entry(src.to_owned())
                .or_insert_with(|| mtime(&cache_root.join(src)).unwrap_or(UNIX_EPOCH));

            if bundle.src.is_map() && !cache_root.join(dst).exists() {
                changed.push(src.to_owned());
            }

            match found.get(src) {
                Some(abs_src) => {
                    let current = mtime(abs_src).unwrap_or(UNIX_EPOCH);
                    if current > *recorded {
                        changed.push(src.to_owned());
                        *recorded = current;
                    }
                }
                None if config.statics.strict => {
                    bail!("The source file `{src}` could not be located");
                }
                None => {}
            }
        }

        // A map-form source can report twice (missing output and newer
        // mtime); the pushes are adjacent
        changed.dedup();
        Ok(changed)
    }
}

fn mtime(path: &Path) -> Option<SystemTime> {
    path.metadata().ok()?.modified().ok()
}

// ============================================================================
// Tests
// ============================================================================
