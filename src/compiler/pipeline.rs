//! The two command phases of a bundle build.
//!
//! Preprocessors run per source file, matched by glob patterns against the
//! source path. Postcompilers run once per bundle, matched against the
//! destination path, falling back to byte-for-byte concatenation when no
//! pattern matches.
//!
//! Matched commands chain: after each command the input collapses to the
//! destination, so later commands consume the previous output.

use super::{ensure_dirs, params::TemplateParams};
use crate::config::CommandTable;
use crate::log;
use crate::utils::exec;
use anyhow::{Context, Result};
use glob::Pattern;
use std::{fs, io, path::Path};

/// Static layout shared by both phases.
pub struct PhaseContext<'a> {
    pub static_root: &'a Path,
    pub static_url: &'a str,
}

// ============================================================================
// Pattern Matching
// ============================================================================

/// Table entries whose pattern matches `path`, in table order.
///
/// `*` crosses path separators, fnmatch style, so `*.scss` matches
/// `css/site.scss`. Invalid patterns never get here (config validation
/// rejects them).
fn matching_commands<'a>(table: &'a CommandTable, path: &str) -> Vec<&'a [String]> {
    table
        .iter()
        .filter(|(pattern, _)| Pattern::new(pattern).is_ok_and(|p| p.matches(path)))
        .map(|(_, commands)| commands.as_slice())
        .collect()
}

// ============================================================================
// Command Invocation
// ============================================================================

/// Run one command template against `dst` under `root`.
///
/// A template that does not name `{output}` has its stdout captured and
/// written to `root/dst` instead.
fn run_command(
    template: &str,
    root: &Path,
    dst: &Path,
    input: &str,
    ctx: &PhaseContext,
) -> Result<()> {
    let mut params = TemplateParams::from_dst(dst, ctx.static_root, ctx.static_url);
    params.input = input.to_owned();

    let use_stdout = !template.contains("{output}");
    if !use_stdout {
        params.output = Some(dst.to_string_lossy().into_owned());
    }

    let rendered = params.render(template)?;
    let argv = exec::split(&rendered)?;

    ensure_dirs(&root.join(dst))?;

    log!("exec"; "{rendered}");
    let output = exec::run(root, &argv)?;

    if use_stdout {
        let dst_file = root.join(dst);
        fs::write(&dst_file, &output.stdout)
            .with_context(|| format!("Failed to write {}", dst_file.display()))?;
    }

    Ok(())
}

// ============================================================================
// Phases
// ============================================================================

/// Apply the per-file phase to one source.
///
/// Commands from every matching table entry run in order; the first sees
/// `src` as its input, the rest see `dst`. Returns false when no pattern
/// matched and no command ran (pass-through source).
pub fn apply_preprocessors(
    root: &Path,
    src: &str,
    dst: &str,
    table: &CommandTable,
    ctx: &PhaseContext,
) -> Result<bool> {
    let matches = matching_commands(table, src);
    if matches.is_empty() {
        return Ok(false);
    }

    let dst_path = Path::new(dst);
    let mut input = src.to_owned();

    for commands in matches {
        for command in commands {
            run_command(command, root, dst_path, &input, ctx)?;
            input = dst.to_owned();
        }
    }

    Ok(true)
}

/// Apply the cross-file phase for a whole bundle.
///
/// The first matching command sees the space-joined source list as its
/// input; afterwards the input collapses to `dst`. With no matching
/// pattern the sources are concatenated byte-for-byte into `dst`.
pub fn apply_postcompilers(
    root: &Path,
    srcs: &[String],
    dst: &Path,
    table: &CommandTable,
    ctx: &PhaseContext,
) -> Result<()> {
    let matches = matching_commands(table, &dst.to_string_lossy());

    if matches.is_empty() {
        return concat_files(root, srcs, &root.join(dst));
    }

    let mut input = srcs.join(" ");

    for commands in matches {
        for command in commands {
            run_command(command, root, dst, &input, ctx)?;
            input = dst.to_string_lossy().into_owned();
        }
    }

    Ok(())
}

/// Concatenate `root/<src>` byte-for-byte, in order, into `dst_file`.
fn concat_files(root: &Path, srcs: &[String], dst_file: &Path) -> Result<()> {
    ensure_dirs(dst_file)?;
    log!("concat"; "{} -> {}", srcs.join(" "), dst_file.display());

    let mut dst = fs::File::create(dst_file)
        .with_context(|| format!("Failed to create {}", dst_file.display()))?;

    for src in srcs {
        let src_file = root.join(src);
        let mut src = fs::File::open(&src_file)
            .with_context(|| format!("Failed to open {}", src_file.display()))?;
        io::copy(&mut src, &mut dst)?;
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
