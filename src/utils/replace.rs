//! Regex rewriting of files selected by glob.

use crate::error::{ErrorExt, Result};
use crate::utils::fs::find_matches;
use regex::{Captures, Regex};
use std::path::Path;

/// Rewrites every file below `root` matching `pattern`.
///
/// Each match of `regex` is replaced by `replacement(&captures)`. Files are
/// only written back when their content changed; directories and non UTF-8
/// files are skipped. Returns the number of files rewritten.
pub fn replace_in_files<F>(root: &Path, pattern: &str, regex: &Regex, replacement: F) -> Result<usize>
where
    F: Fn(&Captures<'_>) -> String,
{
    let mut rewritten = 0;
    for path in find_matches(root, pattern)? {
        if !path.is_file() {
            continue;
        }
        let bytes = std::fs::read(&path).fs_context("reading file", &path)?;
        let Ok(text) = String::from_utf8(bytes) else {
            log::debug!("Skipping non UTF-8 file {}", path.display());
            continue;
        };
        let updated = regex.replace_all(&text, |caps: &Captures<'_>| replacement(caps));
        if updated != text {
            std::fs::write(&path, updated.as_bytes()).fs_context("writing file", &path)?;
            rewritten += 1;
        }
    }
    Ok(rewritten)
}
