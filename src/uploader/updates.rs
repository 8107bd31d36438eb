//! Version package bookkeeping in `Updates.xml`.
//!
//! Every repository carries one root package per owner and Qt version. It has
//! no payload; its `meta` archive is empty and its entry is appended to the
//! update log exactly once.

use crate::config::PackageConfig;
use crate::error::{DeployError, ErrorExt, Result};
use crate::packager::metadata::release_date;
use crate::utils::{fs, process, xml_escape};
use sha1::{Digest, Sha1};
use std::path::Path;
use tokio::process::Command;

/// Update log written by the repository generator.
pub const UPDATES_FILE: &str = "Updates.xml";

/// Version of the synthetic root package.
pub const VERSION_PACKAGE_VERSION: &str = "1.0.0";

const EMPTY_UPDATES: &str = "<Updates>
    <ApplicationName>{AnyApplication}</ApplicationName>
    <ApplicationVersion>1.0.0</ApplicationVersion>
    <Checksum>true</Checksum>
</Updates>
";

/// One `<PackageUpdate>` entry.
#[derive(Debug, Clone)]
pub struct PackageUpdate {
    /// Package id
    pub name: String,
    /// Name shown in the installer
    pub display_name: String,
    /// Package version
    pub version: String,
    /// `YYYY-MM-DD`
    pub release_date: String,
    /// Hex SHA-1 of the meta archive
    pub sha1: String,
}

impl PackageUpdate {
    fn to_xml(&self) -> String {
        format!(
            "    <PackageUpdate>
        <Name>{}</Name>
        <DisplayName>{}</DisplayName>
        <Version>{}</Version>
        <ReleaseDate>{}</ReleaseDate>
        <Default>true</Default>
        <UpdateFile CompressedSize=\"0\" OS=\"Any\" UncompressedSize=\"0\"/>
        <SHA1>{}</SHA1>
    </PackageUpdate>
",
            xml_escape(&self.name),
            xml_escape(&self.display_name),
            xml_escape(&self.version),
            xml_escape(&self.release_date),
            self.sha1
        )
    }
}

/// Appends `update` to the log at `path` unless an entry with the same name
/// is already present. Returns whether the log changed.
pub async fn append_update(path: &Path, update: &PackageUpdate) -> Result<bool> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => EMPTY_UPDATES.to_string(),
        Err(error) => {
            return Err(DeployError::Fs {
                context: "reading update log",
                path: path.to_path_buf(),
                error,
            });
        }
    };

    if text.contains(&format!("<Name>{}</Name>", xml_escape(&update.name))) {
        log::debug!("{} already lists {}", path.display(), update.name);
        return Ok(false);
    }

    let Some(end) = text.rfind("</Updates>") else {
        return Err(DeployError::UpdateLog {
            path: path.to_path_buf(),
            reason: "missing closing </Updates> element".to_string(),
        });
    };

    let mut updated = String::with_capacity(text.len() + 512);
    updated.push_str(&text[..end]);
    if !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(&update.to_xml());
    updated.push_str(&text[end..]);

    tokio::fs::write(path, updated)
        .await
        .fs_context("writing update log", path)?;
    Ok(true)
}

/// Hex SHA-1 of the file at `path`.
pub async fn sha1_hex(path: &Path) -> Result<String> {
    let data = tokio::fs::read(path)
        .await
        .fs_context("reading archive", path)?;
    Ok(hex::encode(Sha1::digest(&data)))
}

/// Makes sure `dest` contains the version package of `config`.
///
/// Does nothing if the package directory already exists. Returns whether the
/// package was created.
pub async fn ensure_version_package(
    config: &PackageConfig,
    archiver: &Path,
    dest: &Path,
) -> Result<bool> {
    let id = config.version_package_id();
    let package_dir = dest.join(&id);
    if package_dir.exists() {
        log::debug!("Version package {} already deployed", id);
        return Ok(false);
    }
    log::info!("Creating version package {}", id);

    let work = config.tmp_dir.join("version-package");
    fs::remove_path(&work).await?;
    let empty = work.join("empty");
    tokio::fs::create_dir_all(&empty)
        .await
        .fs_context("creating directory", &empty)?;

    let archive_name = format!("{}meta.7z", VERSION_PACKAGE_VERSION);
    let archive = work.join(&archive_name);
    process::run(
        Command::new(archiver)
            .args(["a", "-t7z", "-y"])
            .arg(&archive)
            .arg("./")
            .current_dir(&empty),
    )
    .await?;

    let update = PackageUpdate {
        name: id,
        display_name: format!(
            "{} Qt {} modules",
            config.context.owner, config.qt_version
        ),
        version: VERSION_PACKAGE_VERSION.to_string(),
        release_date: release_date(),
        sha1: sha1_hex(&archive).await?,
    };
    append_update(&dest.join(UPDATES_FILE), &update).await?;

    fs::move_path(&archive, &package_dir.join(archive_name)).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update() -> PackageUpdate {
        PackageUpdate {
            name: "qt.qt5.5130.owner".to_string(),
            display_name: "Owner Qt 5.13.0 modules".to_string(),
            version: "1.0.0".to_string(),
            release_date: "2019-07-01".to_string(),
            sha1: "da39a3ee5e6b4b0d3255bfef95601890afd80709".to_string(),
        }
    }

    #[tokio::test]
    async fn appends_before_closing_element() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(UPDATES_FILE);
        std::fs::write(
            &path,
            "<Updates>\n <ApplicationName>{AnyApplication}</ApplicationName>\n</Updates>\n",
        )
        .unwrap();

        assert!(append_update(&path, &update()).await.unwrap());

        let text = std::fs::read_to_string(&path).unwrap();
        let entry = text.find("<Name>qt.qt5.5130.owner</Name>").unwrap();
        assert!(entry < text.find("</Updates>").unwrap());
        assert!(text.contains("<UpdateFile CompressedSize=\"0\" OS=\"Any\" UncompressedSize=\"0\"/>"));
        assert!(text.contains("<Default>true</Default>"));
    }

    #[tokio::test]
    async fn second_append_is_a_no_op() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(UPDATES_FILE);

        assert!(append_update(&path, &update()).await.unwrap());
        assert!(!append_update(&path, &update()).await.unwrap());

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("<PackageUpdate>").count(), 1);
        assert!(text.starts_with("<Updates>"));
    }

    #[tokio::test]
    async fn log_without_root_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(UPDATES_FILE);
        std::fs::write(&path, "garbage").unwrap();

        let err = append_update(&path, &update()).await.unwrap_err();
        assert!(matches!(err, DeployError::UpdateLog { .. }));
    }

    #[tokio::test]
    async fn digest_of_empty_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("empty");
        std::fs::write(&path, b"").unwrap();
        assert_eq!(
            sha1_hex(&path).await.unwrap(),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
    }
}
