//! File system utilities for package staging.
//!
//! Copies merge into existing trees instead of failing on pre-existing paths,
//! and symlinks are preserved on unix.

use crate::error::{DeployError, ErrorExt, Result};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Makes a symbolic link, replacing an existing file at `dst`.
#[cfg(unix)]
fn symlink(src: &Path, dst: &Path) -> io::Result<()> {
    if dst.symlink_metadata().is_ok() {
        std::fs::remove_file(dst)?;
    }
    std::os::unix::fs::symlink(src, dst)
}

/// Makes a symbolic link, replacing an existing file at `dst`.
#[cfg(windows)]
fn symlink(src: &Path, dst: &Path) -> io::Result<()> {
    if dst.symlink_metadata().is_ok() {
        std::fs::remove_file(dst)?;
    }
    if src.is_dir() {
        std::os::windows::fs::symlink_dir(src, dst)
    } else {
        std::os::windows::fs::symlink_file(src, dst)
    }
}

/// Copies a regular file, creating the parent directories of `to`.
pub async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if !from.is_file() {
        return Err(DeployError::Fs {
            context: "copying file",
            path: from.to_path_buf(),
            error: io::Error::new(io::ErrorKind::NotFound, "not a file"),
        });
    }
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)
            .await
            .fs_context("creating directory", parent)?;
    }
    fs::copy(from, to).await.fs_context("copying file", from)?;
    Ok(())
}

/// Recursively copies `from` into `to`, merging with whatever `to` already holds.
pub async fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    if !from.is_dir() {
        return Err(DeployError::Fs {
            context: "copying directory",
            path: from.to_path_buf(),
            error: io::Error::new(io::ErrorKind::NotFound, "not a directory"),
        });
    }

    for entry in walkdir::WalkDir::new(from) {
        let entry = entry?;
        let rel_path = entry.path().strip_prefix(from)?;
        let dest_path = to.join(rel_path);

        if entry.file_type().is_symlink() {
            let target = fs::read_link(entry.path())
                .await
                .fs_context("reading symlink", entry.path())?;
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent)
                    .await
                    .fs_context("creating directory", parent)?;
            }
            symlink(&target, &dest_path).fs_context("creating symlink", &dest_path)?;
        } else if entry.file_type().is_dir() {
            fs::create_dir_all(&dest_path)
                .await
                .fs_context("creating directory", &dest_path)?;
        } else {
            fs::copy(entry.path(), &dest_path)
                .await
                .fs_context("copying file", entry.path())?;
        }
    }

    Ok(())
}

/// Copies a file, symlink or directory tree to `to`.
pub async fn copy_path(from: &Path, to: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(from)
        .await
        .fs_context("reading metadata", from)?;
    if meta.is_dir() {
        copy_dir(from, to).await
    } else if meta.file_type().is_symlink() {
        let target = fs::read_link(from).await.fs_context("reading symlink", from)?;
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)
                .await
                .fs_context("creating directory", parent)?;
        }
        symlink(&target, to).fs_context("creating symlink", to)
    } else {
        copy_file(from, to).await
    }
}

/// Removes a file, symlink or directory tree. Missing paths are fine.
pub async fn remove_path(path: &Path) -> Result<()> {
    let meta = match fs::symlink_metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(error) => {
            return Err(DeployError::Fs {
                context: "reading metadata",
                path: path.to_path_buf(),
                error,
            });
        }
    };
    if meta.is_dir() {
        fs::remove_dir_all(path).await.fs_context("removing directory", path)
    } else {
        fs::remove_file(path).await.fs_context("removing file", path)
    }
}

/// Moves `from` to `to`, falling back to copy and delete across file systems.
pub async fn move_path(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)
            .await
            .fs_context("creating directory", parent)?;
    }
    match fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(e) => {
            log::debug!(
                "rename {} -> {} failed ({}), copying instead",
                from.display(),
                to.display(),
                e
            );
            copy_path(from, to).await?;
            remove_path(from).await
        }
    }
}

/// Returns every path below `root` matching the relative glob `pattern`.
pub fn find_matches(root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let escaped = glob::Pattern::escape(&root.to_string_lossy());
    let full = format!("{}/{}", escaped.trim_end_matches('/'), pattern);
    let mut matches = Vec::new();
    for entry in glob::glob(&full)? {
        match entry {
            Ok(path) => matches.push(path),
            Err(e) => {
                return Err(DeployError::Fs {
                    context: "matching",
                    path: e.path().to_path_buf(),
                    error: e.into(),
                });
            }
        }
    }
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn copy_dir_merges_into_existing_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        std::fs::create_dir_all(src.join("lib")).unwrap();
        std::fs::write(src.join("lib/a.txt"), "new").unwrap();
        std::fs::create_dir_all(dst.join("lib")).unwrap();
        std::fs::write(dst.join("lib/b.txt"), "kept").unwrap();

        copy_dir(&src, &dst).await.unwrap();

        assert_eq!(std::fs::read_to_string(dst.join("lib/a.txt")).unwrap(), "new");
        assert_eq!(std::fs::read_to_string(dst.join("lib/b.txt")).unwrap(), "kept");
    }

    #[tokio::test]
    async fn remove_path_ignores_missing() {
        let tmp = tempfile::tempdir().unwrap();
        remove_path(&tmp.path().join("nope")).await.unwrap();
    }

    #[tokio::test]
    async fn move_path_relocates_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("a");
        std::fs::create_dir_all(src.join("x")).unwrap();
        std::fs::write(src.join("x/f"), "1").unwrap();
        let dst = tmp.path().join("deep/b");

        move_path(&src, &dst).await.unwrap();

        assert!(!src.exists());
        assert_eq!(std::fs::read_to_string(dst.join("x/f")).unwrap(), "1");
    }

    #[test]
    fn find_matches_is_relative_to_root() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("bin")).unwrap();
        std::fs::create_dir_all(tmp.path().join("lib/pkgconfig")).unwrap();
        std::fs::write(tmp.path().join("bin/qdep"), "").unwrap();
        std::fs::write(tmp.path().join("bin/qdep.exe"), "").unwrap();
        std::fs::write(tmp.path().join("bin/qmake"), "").unwrap();
        std::fs::write(tmp.path().join("lib/pkgconfig/Qt5Foo.pc"), "").unwrap();

        let mut tools = find_matches(tmp.path(), "bin/qdep*").unwrap();
        tools.sort();
        assert_eq!(
            tools,
            vec![tmp.path().join("bin/qdep"), tmp.path().join("bin/qdep.exe")]
        );
        assert_eq!(find_matches(tmp.path(), "**/*.pc").unwrap().len(), 1);
        assert!(find_matches(tmp.path(), "**/*.la").unwrap().is_empty());
    }
}
