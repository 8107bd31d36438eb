//! Staging tree layout shared by the packager and the uploader.
//!
//! ```text
//! <root>/<pkgBase>/{meta/package.xml, meta/installscript.qs?, data/...}
//! <root>/<pkgBase>.<arch>/data/<qtVersion>/<token>/...
//! ```

use crate::config::PackageConfig;
use crate::platform;
use std::path::{Path, PathBuf};

/// Package root handed to the repository generator with `-p`.
#[derive(Debug, Clone)]
pub struct StagingLayout {
    root: PathBuf,
}

impl StagingLayout {
    /// Uses `root` as package root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The package root itself.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of the package `id`.
    pub fn package_dir(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    /// `meta` directory of the package `id`.
    pub fn meta_dir(&self, id: &str) -> PathBuf {
        self.package_dir(id).join("meta")
    }

    /// `data` directory of the package `id`.
    pub fn data_dir(&self, id: &str) -> PathBuf {
        self.package_dir(id).join("data")
    }

    /// Directory the binary asset of `token` is extracted into.
    pub fn platform_data_dir(&self, config: &PackageConfig, token: &str) -> PathBuf {
        self.data_dir(&config.package_id(platform::package_arch(token)))
            .join(&config.qt_version)
            .join(token)
    }
}
