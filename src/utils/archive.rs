//! Archive extraction for release assets and source snapshots.
//!
//! Zip and gzip tarballs are unpacked in-process on the blocking pool.
//! `.tar.xz` assets go through the system `tar`.

use crate::error::{DeployError, ErrorExt, Result};
use crate::utils::process;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tokio::process::Command;

async fn blocking<T, F>(task: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| DeployError::Io(io::Error::other(e)))?
}

/// Extracts a zip archive into `dest`.
///
/// Entries that would escape `dest` are skipped.
pub async fn extract_zip(archive: &Path, dest: &Path) -> Result<()> {
    let archive = archive.to_path_buf();
    let dest = dest.to_path_buf();
    blocking(move || {
        let file = File::open(&archive).fs_context("opening archive", &archive)?;
        let mut zip = zip::ZipArchive::new(file)?;
        std::fs::create_dir_all(&dest).fs_context("creating directory", &dest)?;

        for i in 0..zip.len() {
            let mut entry = zip.by_index(i)?;
            let Some(relative) = entry.enclosed_name() else {
                log::warn!("Skipping unsafe zip entry {}", entry.name());
                continue;
            };
            let target = dest.join(relative);

            if entry.is_dir() {
                std::fs::create_dir_all(&target).fs_context("creating directory", &target)?;
                continue;
            }
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).fs_context("creating directory", parent)?;
            }
            let mut out = File::create(&target).fs_context("creating file", &target)?;
            io::copy(&mut entry, &mut out).fs_context("writing file", &target)?;

            #[cfg(unix)]
            if let Some(mode) = entry.unix_mode() {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&target, std::fs::Permissions::from_mode(mode))
                    .fs_context("setting permissions", &target)?;
            }
        }
        Ok(())
    })
    .await
}

/// Extracts a gzip compressed tarball into `dest`.
pub async fn extract_tar_gz(archive: &Path, dest: &Path) -> Result<()> {
    let archive = archive.to_path_buf();
    let dest = dest.to_path_buf();
    blocking(move || {
        let file = File::open(&archive).fs_context("opening archive", &archive)?;
        let decoder = flate2::read::GzDecoder::new(file);
        let mut tar = tar::Archive::new(decoder);
        tar.set_preserve_permissions(true);
        std::fs::create_dir_all(&dest).fs_context("creating directory", &dest)?;
        tar.unpack(&dest).fs_context("unpacking archive", &archive)?;
        Ok(())
    })
    .await
}

/// Extracts an xz compressed tarball into `dest` with the system `tar`.
pub async fn extract_tar_xz(archive: &Path, dest: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dest)
        .await
        .fs_context("creating directory", dest)?;
    process::run(
        Command::new("tar")
            .arg("-xJf")
            .arg(archive)
            .arg("-C")
            .arg(dest),
    )
    .await?;
    Ok(())
}

/// Extracts a downloaded package asset, zip or `.tar.xz`.
pub async fn extract_asset(archive: &Path, dest: &Path, zip: bool) -> Result<()> {
    log::debug!("Extracting {} to {}", archive.display(), dest.display());
    if zip {
        extract_zip(archive, dest).await
    } else {
        extract_tar_xz(archive, dest).await
    }
}

/// Returns the only directory directly inside `dir`.
///
/// Source snapshots from the release API wrap the tree in one top-level
/// directory named after the commit.
pub fn single_top_dir(dir: &Path) -> Result<PathBuf> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir).fs_context("reading directory", dir)? {
        let entry = entry.fs_context("reading directory", dir)?;
        if entry.path().is_dir() {
            dirs.push(entry.path());
        }
    }
    match dirs.len() {
        1 => Ok(dirs.remove(0)),
        n => Err(DeployError::Fs {
            context: "locating source root in",
            path: dir.to_path_buf(),
            error: io::Error::new(
                io::ErrorKind::InvalidData,
                format!("expected one top-level directory, found {}", n),
            ),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_zip(path: &Path) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        zip.add_directory("lib/", options).unwrap();
        zip.start_file("lib/Qt5Foo.prl", options).unwrap();
        zip.write_all(b"QMAKE_PRL_BUILD_DIR = C:/build\n").unwrap();
        zip.finish().unwrap();
    }

    fn write_tar_gz(path: &Path) {
        let file = File::create(path).unwrap();
        let enc = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut tar = tar::Builder::new(enc);
        let data = b"{}";
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        tar.append_data(&mut header, "Skycoder42-QtFoo-abc123/deploy.json", &data[..])
            .unwrap();
        tar.into_inner().unwrap().finish().unwrap();
    }

    #[tokio::test]
    async fn zip_entries_land_below_dest() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("foo.zip");
        write_zip(&archive);

        let dest = tmp.path().join("out");
        extract_zip(&archive, &dest).await.unwrap();

        assert!(dest.join("lib/Qt5Foo.prl").is_file());
    }

    #[tokio::test]
    async fn snapshot_root_is_the_single_top_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("src.tar.gz");
        write_tar_gz(&archive);

        let dest = tmp.path().join("src");
        extract_tar_gz(&archive, &dest).await.unwrap();

        let root = single_top_dir(&dest).unwrap();
        assert_eq!(root, dest.join("Skycoder42-QtFoo-abc123"));
        assert!(root.join("deploy.json").is_file());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn tar_xz_entries_land_below_dest() {
        let tmp = tempfile::tempdir().unwrap();
        let tree = tmp.path().join("tree");
        std::fs::create_dir_all(tree.join("lib")).unwrap();
        std::fs::write(tree.join("lib/libQt5Foo.la"), "libdir='/build/lib'\n").unwrap();
        let archive = tmp.path().join("foo-gcc_64-5.13.0.tar.xz");
        let status = std::process::Command::new("tar")
            .arg("-cJf")
            .arg(&archive)
            .arg("-C")
            .arg(&tree)
            .arg(".")
            .status()
            .unwrap();
        assert!(status.success());

        let dest = tmp.path().join("out");
        extract_asset(&archive, &dest, false).await.unwrap();

        assert!(dest.join("lib/libQt5Foo.la").is_file());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn corrupt_tar_xz_is_a_tool_error() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = tmp.path().join("broken.tar.xz");
        std::fs::write(&archive, b"not an archive").unwrap();

        let err = extract_tar_xz(&archive, &tmp.path().join("out"))
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::ExternalTool { .. }));
    }

    #[test]
    fn several_top_dirs_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("a")).unwrap();
        std::fs::create_dir(tmp.path().join("b")).unwrap();
        assert!(single_top_dir(tmp.path()).is_err());
    }
}
