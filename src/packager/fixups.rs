//! Path fixups for extracted Qt build artifacts.
//!
//! Build trees reference the CI machine's directories. These rewrites point
//! `.prl`, `.la` and `.pc` files at the canonical install location that the
//! installer's `QtPatch` operation knows how to relocate. Every rewrite is
//! idempotent and an empty match set is not an error.

use crate::error::Result;
use crate::utils::replace::replace_in_files;
use regex::{Captures, Regex};
use std::path::Path;
use std::sync::LazyLock;

/// Install prefix the Qt patcher rewrites on the user's machine.
pub const INSTALL_PREFIX: &str = "/home/qt/work/install";

static PRL_BUILD_DIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^QMAKE_PRL_BUILD_DIR\s*=.*(?:\r?\n)?").expect("valid regex")
});

static LA_DEPENDENCY_LIBS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^dependency_libs='([^']*)'").expect("valid regex"));

static LA_LIBDIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^libdir='[^']*'").expect("valid regex"));

static PC_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^prefix=.*$").expect("valid regex"));

/// Rewrites a `dependency_libs` value: all `-L` paths dropped, the install
/// lib dir prepended, remaining flags kept in order.
fn dependency_libs(caps: &Captures<'_>) -> String {
    let mut flags = vec![format!("-L{}/lib", INSTALL_PREFIX)];
    flags.extend(
        caps[1]
            .split_whitespace()
            .filter(|flag| !flag.starts_with("-L"))
            .map(str::to_string),
    );
    format!("dependency_libs='{}'", flags.join(" "))
}

/// Applies all artifact fixups below `root`.
pub fn apply_all(root: &Path) -> Result<()> {
    let prl = replace_in_files(root, "**/*.prl", &PRL_BUILD_DIR, |_| String::new())?;
    let la_deps = replace_in_files(root, "**/*.la", &LA_DEPENDENCY_LIBS, dependency_libs)?;
    let la_libdir = replace_in_files(root, "**/*.la", &LA_LIBDIR, |_| {
        format!("libdir='={}/lib'", INSTALL_PREFIX)
    })?;
    let pc = replace_in_files(root, "**/*.pc", &PC_PREFIX, |_| {
        format!("prefix={}", INSTALL_PREFIX)
    })?;
    log::debug!(
        "Fixed {} prl, {} la dependency, {} la libdir and {} pc files in {}",
        prl,
        la_deps,
        la_libdir,
        pc,
        root.display()
    );
    Ok(())
}
