//! External command execution.
//!
//! Command lines arrive as rendered template strings. They are shell-split,
//! executed with the bundle working root as the process working directory,
//! and checked for a zero exit status. On failure the captured error output
//! becomes the error detail; on success surviving stderr lines are logged
//! as warnings.

use crate::log;
use anyhow::{Context, Result, bail};
use regex::Regex;
use std::{
    path::Path,
    process::{Command, Output},
    sync::OnceLock,
};

// ============================================================================
// Command Execution
// ============================================================================

/// Shell-split a rendered command line, honoring quotes.
///
/// # Errors
/// Returns error on unbalanced quotes or an empty command line.
pub fn split(command: &str) -> Result<Vec<String>> {
    let argv = shell_words::split(command)
        .with_context(|| format!("Cannot parse command `{command}`"))?;
    if argv.is_empty() {
        bail!("Empty command");
    }
    Ok(argv)
}

/// Execute a split command under `root` and capture its output.
///
/// The program path is resolved to its canonical form when it names an
/// existing file; plain names go through the usual `PATH` lookup.
///
/// # Errors
/// Returns error if the command fails to execute or exits non-zero.
pub fn run(root: &Path, argv: &[String]) -> Result<Output> {
    let name = &argv[0];
    let program = resolve_program(name);

    let output = Command::new(&program)
        .args(&argv[1..])
        .current_dir(root)
        .output()
        .with_context(|| format!("Failed to execute `{name}`"))?;

    if !output.status.success() {
        bail!(format_error(name, &output));
    }

    // On success, only surface stderr (warnings) to reduce noise
    let stderr = String::from_utf8_lossy(&output.stderr);
    log_lines(name, stderr.trim());

    Ok(output)
}

/// Canonicalize a program path when it names an existing file.
fn resolve_program(program: &str) -> String {
    let path = Path::new(program);
    if path.exists()
        && let Ok(real) = path.canonicalize()
    {
        return real.to_string_lossy().into_owned();
    }
    program.to_owned()
}

// ============================================================================
// Output Handling
// ============================================================================

fn strip_ansi(s: &str) -> std::borrow::Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*m").unwrap());
    re.replace_all(s, "")
}

/// Log non-empty output lines under the command's name.
fn log_lines(name: &str, output: &str) {
    let valid_lines: Vec<&str> = output
        .lines()
        .filter(|line| !strip_ansi(line).trim().is_empty())
        .collect();

    if !valid_lines.is_empty() {
        log!(name; "{}", valid_lines.join("\n"));
    }
}

/// Format a command failure with its captured output, colors removed.
fn format_error(name: &str, output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    let mut msg = format!("Command `{name}` failed with {}", output.status);

    let stderr = strip_ansi(stderr.trim());
    if !stderr.is_empty() {
        msg.push('\n');
        msg.push_str(&stderr);
    }

    let stdout = strip_ansi(stdout.trim());
    if !stdout.is_empty() {
        msg.push_str("\nStdout:\n");
        msg.push_str(&stdout);
    }

    msg
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_split_plain() {
        let argv = split("sass input.scss output.css").unwrap();
        assert_eq!(argv, vec!["sass", "input.scss", "output.css"]);
    }

    #[test]
    fn test_split_quoted() {
        let argv = split(r#"uglifyjs --comments "some license" -o out.js"#).unwrap();
        assert_eq!(argv[2], "some license");
    }

    #[test]
    fn test_split_empty() {
        assert!(split("").is_err());
        assert!(split("   ").is_err());
    }

    #[test]
    fn test_split_unbalanced_quote() {
        assert!(split(r#"echo "oops"#).is_err());
    }

    #[test]
    fn test_run_captures_stdout() {
        let root = std::env::temp_dir();
        let argv = vec!["echo".to_owned(), "hello".to_owned()];
        let output = run(&root, &argv).unwrap();

        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
    }

    #[test]
    fn test_run_nonzero_exit() {
        let root = std::env::temp_dir();
        let argv = vec!["false".to_owned()];
        let err = format!("{:#}", run(&root, &argv).unwrap_err());

        assert!(err.contains("Command `false` failed"));
    }

    #[test]
    fn test_run_missing_program() {
        let root = std::env::temp_dir();
        let argv = vec!["definitely-not-an-installed-program".to_owned()];
        let err = format!("{:#}", run(&root, &argv).unwrap_err());

        assert!(err.contains("Failed to execute"));
    }

    #[test]
    fn test_resolve_program_plain_name() {
        // Plain names are left for PATH lookup
        assert_eq!(resolve_program("sass"), "sass");
    }

    #[test]
    fn test_resolve_program_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("tool.sh");
        std::fs::write(&tool, "#!/bin/sh\n").unwrap();

        let resolved = PathBuf::from(resolve_program(&tool.to_string_lossy()));
        assert!(resolved.is_absolute());
        assert_eq!(resolved, tool.canonicalize().unwrap());
    }

    #[test]
    fn test_format_error_includes_stderr() {
        let status = Command::new("false").status().unwrap();
        let output = Output {
            status,
            stdout: b"partial output".to_vec(),
            stderr: b"\x1b[31mFatal error\x1b[0m".to_vec(),
        };
        let msg = format_error("sass", &output);

        assert!(msg.contains("Command `sass` failed"));
        assert!(msg.contains("Fatal error"));
        assert!(msg.contains("partial output"));
        assert!(!msg.contains('\x1b'));
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[31mRed\x1b[0m"), "Red");
        assert_eq!(strip_ansi("Plain text"), "Plain text");
        assert_eq!(
            strip_ansi("Start \x1b[33mYellow\x1b[0m End"),
            "Start Yellow End"
        );
    }
}
