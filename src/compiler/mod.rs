//! The bundle build pipeline.
//!
//! - **collect**: discover source files and populate the cache directory
//! - **params**: `{key}` substitution parameters for command templates
//! - **pipeline**: the two command phases (preprocess, postcompile)
//! - **stale**: modification-time tracking for rebuild decisions
//!
//! # Build Flow
//!
//! ```text
//! find_static_files() ──► collect_static_files() ──► apply_preprocessors()
//!        │                        │                         │ per source
//!        ▼                        ▼                         ▼
//!  finder listings           cache copies          apply_postcompilers()
//!                                                          │ per bundle
//!                                                          ▼
//!                                                  static_root/<bundle>
//! ```

pub mod collect;
pub mod params;
pub mod pipeline;
pub mod stale;

use anyhow::Result;
use std::fs;
use std::path::Path;

/// Files to ignore during directory traversal
const IGNORED_FILES: &[&str] = &[".DS_Store"];

/// Create the parent directories of a destination file.
pub fn ensure_dirs(dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Check if destination is up to date compared to its source.
///
/// Holds when both files exist and the source is not newer than the
/// destination.
pub fn is_up_to_date(src: &Path, dst: &Path) -> bool {
    let (Ok(src_meta), Ok(dst_meta)) = (src.metadata(), dst.metadata()) else {
        return false;
    };

    match (src_meta.modified(), dst_meta.modified()) {
        (Ok(src_time), Ok(dst_time)) => src_time <= dst_time,
        _ => false,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_ensure_dirs_creates_parents() {
        let dir = tempdir().unwrap();
        let dst = dir.path().join("a/b/c/out.css");

        ensure_dirs(&dst).unwrap();

        assert!(dst.parent().unwrap().is_dir());
        assert!(!dst.exists());
    }

    #[test]
    fn test_ensure_dirs_bare_filename() {
        // A destination with no directory component is a no-op
        ensure_dirs(Path::new("out.css")).unwrap();
    }

    #[test]
    fn test_is_up_to_date_missing_files() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.css");
        let dst = dir.path().join("dst.css");

        assert!(!is_up_to_date(&src, &dst));

        fs::write(&src, "a").unwrap();
        assert!(!is_up_to_date(&src, &dst));
    }

    #[test]
    fn test_is_up_to_date_transitions() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.css");
        let dst = dir.path().join("dst.css");

        fs::write(&src, "a").unwrap();
        sleep(Duration::from_millis(20));
        fs::write(&dst, "a").unwrap();
        assert!(is_up_to_date(&src, &dst));

        sleep(Duration::from_millis(20));
        fs::write(&src, "b").unwrap();
        assert!(!is_up_to_date(&src, &dst));
    }
}
