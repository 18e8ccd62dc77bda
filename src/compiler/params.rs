//! Command template substitution parameters.
//!
//! Preprocessor and postcompiler commands are written as template strings
//! (`sass {input} {output}`). The substitution values derive from the
//! destination path of the invocation, plus the current input tracked
//! through chained commands.

use anyhow::{Result, bail};
use regex::Regex;
use std::{
    path::{MAIN_SEPARATOR, Path},
    sync::OnceLock,
};

/// Substitution values for one command invocation.
#[derive(Debug, Clone, Default)]
pub struct TemplateParams {
    /// Destination file stem.
    pub name: String,
    /// Destination extension, with the leading dot; empty when absent.
    pub ext: String,
    /// Destination file name.
    pub filename: String,
    /// Destination directory relative to the static root when under it,
    /// as given otherwise.
    pub relpath: String,
    /// Destination directory as given.
    pub abspath: String,
    /// Configured public URL prefix.
    pub urlroot: String,
    /// `..` components climbing from `relpath` back to the static root.
    pub relroot: String,
    /// Absolute static root.
    pub root: String,
    /// Current input path(s); space-joined for postcompilers.
    pub input: String,
    /// Output path; only set when the template names `{output}`.
    pub output: Option<String>,
}

impl TemplateParams {
    /// Derive parameters from a destination path.
    pub fn from_dst(dst: &Path, static_root: &Path, static_url: &str) -> Self {
        let filename = dst
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = dst
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = dst
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let dir = dst.parent().unwrap_or(Path::new(""));
        let relpath = dir
            .strip_prefix(static_root)
            .unwrap_or(dir)
            .to_string_lossy()
            .into_owned();

        // One `..` per relpath separator, plus one
        let relroot = vec![".."; relpath.matches(MAIN_SEPARATOR).count() + 1].join("/");

        Self {
            name,
            ext,
            filename,
            relpath,
            abspath: dir.to_string_lossy().into_owned(),
            urlroot: static_url.to_owned(),
            relroot,
            root: static_root.to_string_lossy().into_owned(),
            input: String::new(),
            output: None,
        }
    }

    fn get(&self, key: &str) -> Option<&str> {
        match key {
            "name" => Some(&self.name),
            "ext" => Some(&self.ext),
            "filename" => Some(&self.filename),
            "relpath" => Some(&self.relpath),
            "abspath" => Some(&self.abspath),
            "urlroot" => Some(&self.urlroot),
            "relroot" => Some(&self.relroot),
            "root" => Some(&self.root),
            "input" => Some(&self.input),
            "output" => self.output.as_deref(),
            _ => None,
        }
    }

    /// Substitute every `{key}` occurrence in a command template.
    ///
    /// # Errors
    /// An unknown key is an error naming the key. `{output}` counts as
    /// unknown until the executor has assigned an output path.
    pub fn render(&self, template: &str) -> Result<String> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| Regex::new(r"\{([a-z]+)\}").unwrap());

        let mut rendered = String::with_capacity(template.len());
        let mut last = 0;

        for caps in re.captures_iter(template) {
            let token = caps.get(0).unwrap();
            let key = caps.get(1).unwrap().as_str();

            let Some(value) = self.get(key) else {
                bail!("Unknown parameter `{{{key}}}` in command `{template}`");
            };

            rendered.push_str(&template[last..token.start()]);
            rendered.push_str(value);
            last = token.end();
        }
        rendered.push_str(&template[last..]);

        Ok(rendered)
    }
}

// ============================================================================
// Tests
// ============================================================================
