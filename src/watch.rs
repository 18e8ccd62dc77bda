//! File system watcher for bundle rebuilds.
//!
//! Monitors the configured source directories and the config file, maps
//! change events back to the bundles whose sources they provide, and
//! rebuilds just those bundles. A config file change rebuilds the whole
//! selection.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                     Event Loop                         │
//! │                                                        │
//! │  ┌──────────┐    ┌──────────┐    ┌──────────────────┐  │
//! │  │ notify   │───▶│ Debouncer│───▶│ handle_changes() │  │
//! │  │ events   │    │ (300ms)  │    │  affected only   │  │
//! │  └──────────┘    └──────────┘    └──────────────────┘  │
//! └────────────────────────────────────────────────────────┘
//! ```

use crate::{build::compile_bundles, config::Config, log};
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;
use std::{
    path::{Path, PathBuf},
    sync::mpsc::RecvTimeoutError,
    time::{Duration, Instant},
};

const DEBOUNCE_MS: u64 = 300;

// =============================================================================
// Path Utilities
// =============================================================================

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

// =============================================================================
// Debounce State
// =============================================================================

/// Batches rapid file events with debouncing.
struct Debouncer {
    pending: FxHashSet<PathBuf>,
    last_event: Option<Instant>,
}

impl Debouncer {
    fn new() -> Self {
        Self {
            pending: FxHashSet::default(),
            last_event: None,
        }
    }

    fn add(&mut self, event: Event) {
        for path in event.paths {
            if !is_temp_file(&path) {
                self.pending.insert(path);
            }
        }
        self.last_event = Some(Instant::now());
    }

    fn ready(&self) -> bool {
        !self.pending.is_empty()
            && self
                .last_event
                .is_some_and(|t| t.elapsed() >= Duration::from_millis(DEBOUNCE_MS))
    }

    fn take(&mut self) -> Vec<PathBuf> {
        self.last_event = None;
        self.pending.drain().collect()
    }

    fn timeout(&self) -> Duration {
        if self.pending.is_empty() {
            Duration::from_secs(60)
        } else {
            Duration::from_millis(DEBOUNCE_MS)
        }
    }
}

// =============================================================================
// Event Handler
// =============================================================================

/// Map changed files to the bundles that consume them.
///
/// A bundle is affected when one of its sources resolves to the changed
/// file's path relative to a source directory. Returns whether the config
/// file itself changed, plus the affected bundle names.
fn affected_bundles(paths: &[PathBuf], config: &Config) -> (bool, Vec<String>) {
    let mut config_changed = false;
    let mut rels: Vec<PathBuf> = Vec::new();

    for path in paths {
        if path == &config.config_path {
            config_changed = true;
            continue;
        }
        for dir in &config.statics.sources {
            if let Ok(rel) = path.strip_prefix(dir) {
                rels.push(rel.to_path_buf());
                break;
            }
        }
    }

    let affected = config
        .bundles
        .iter()
        .filter(|(_, bundle)| {
            let cwd = bundle.cwd.clone().unwrap_or_default();
            bundle
                .src
                .entries()
                .iter()
                .any(|(src, _)| rels.iter().any(|rel| *rel == cwd.join(src)))
        })
        .map(|(name, _)| name.clone())
        .collect();

    (config_changed, affected)
}

/// Rebuild what the batched changes require.
fn handle_changes(paths: &[PathBuf], config: &Config, selected: &[String]) {
    let (config_changed, affected) = affected_bundles(paths, config);

    if config_changed {
        log!("watch"; "config changed, rebuilding all");
        if let Err(err) = compile_bundles(config, selected, false) {
            log!("error"; "{err:#}");
        }
        return;
    }

    // Restrict rebuilds to the watched selection
    let affected: Vec<String> = affected
        .into_iter()
        .filter(|name| selected.is_empty() || selected.contains(name))
        .collect();
    if affected.is_empty() {
        return;
    }

    log!("watch"; "rebuilding {}", affected.join(" "));
    if let Err(err) = compile_bundles(config, &affected, false) {
        log!("error"; "{err:#}");
    }
}

// =============================================================================
// Watcher Setup
// =============================================================================

fn setup_watchers(watcher: &mut impl Watcher, config: &Config) -> Result<()> {
    for dir in &config.statics.sources {
        if dir.exists() {
            watcher
                .watch(dir, RecursiveMode::Recursive)
                .with_context(|| format!("Failed to watch {}", dir.display()))?;
        }
    }

    if config.config_path.exists() {
        watcher
            .watch(&config.config_path, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", config.config_path.display()))?;
    }

    let watched: Vec<String> = config
        .statics
        .sources
        .iter()
        .filter(|dir| dir.exists())
        .map(|dir| format_rel(dir, &config.project_root))
        .collect();
    log!("watch"; "watching: {}", watched.join(", "));

    Ok(())
}

/// Format a directory as relative to the project root for log display.
fn format_rel(dir: &Path, root: &Path) -> String {
    format!("{}/", dir.strip_prefix(root).unwrap_or(dir).display())
}

const fn is_relevant(event: &Event) -> bool {
    matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
}

// =============================================================================
// Public API
// =============================================================================

/// Build the selection once, then block rebuilding it on source changes.
pub fn watch_bundles(config: &Config, selected: &[String]) -> Result<()> {
    let bundles = config.select_bundles(selected)?;
    if bundles.is_empty() {
        log!("watch"; "no bundles configured");
        return Ok(());
    }

    compile_bundles(config, selected, false)?;

    let (tx, rx) = std::sync::mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx).context("Failed to create file watcher")?;
    setup_watchers(&mut watcher, config)?;

    let mut debouncer = Debouncer::new();

    loop {
        match rx.recv_timeout(debouncer.timeout()) {
            Ok(Ok(event)) if is_relevant(&event) => debouncer.add(event),
            Ok(Err(err)) => log!("watch"; "error: {err}"),
            Err(RecvTimeoutError::Timeout) if debouncer.ready() => {
                handle_changes(&debouncer.take(), config, selected);
            }
            Err(RecvTimeoutError::Disconnected) => break,
            // Other cases: irrelevant events, timeout without ready, etc.
            _ => {}
        }
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
