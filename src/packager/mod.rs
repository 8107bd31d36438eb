//! Package assembly.
//!
//! Turns the release source tree and binary assets into installer framework
//! packages below a [`StagingLayout`]. The base package has to be staged
//! first: every other package depends on it, and it is the only one reading
//! license and extra install files from the source tree before that tree is
//! moved into the src package.

pub mod fixups;
mod layout;
pub mod metadata;
pub mod scripts;

pub use layout::StagingLayout;
pub use metadata::{LicenseRef, PackageMeta};
pub use scripts::{SCRIPT_FILE, ScriptRenderer};

use crate::config::PackageConfig;
use crate::error::{Context, DeployError, ErrorExt, Result};
use crate::github::AssetSource;
use crate::platform;
use crate::utils::{archive, fs, process};
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// CI and deployment files that do not belong into the source package.
const STRIPPED_SOURCE_FILES: &[&str] = &[
    ".github",
    ".travis.yml",
    "appveyor.yml",
    ".gitlab-ci.yml",
    crate::config::DESCRIPTOR_FILE,
];

/// Download URL of the header sync script matching `qt_version`.
pub fn syncqt_url(qt_version: &str) -> String {
    format!(
        "https://code.qt.io/cgit/qt/qtbase.git/plain/bin/syncqt.pl?h={}",
        qt_version
    )
}

/// Header forwarding generator, run once per module.
#[derive(Debug, Clone)]
pub struct SyncQt {
    /// Perl interpreter
    pub interpreter: PathBuf,
    /// Path of `syncqt.pl`
    pub script: PathBuf,
}

impl SyncQt {
    /// Runs `script` with `perl` from `PATH`.
    pub fn new(script: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: PathBuf::from("perl"),
            script: script.into(),
        }
    }

    async fn sync_module(&self, module: &str, version: &str, src_dir: &Path) -> Result<()> {
        process::run(
            Command::new(&self.interpreter)
                .arg(&self.script)
                .args(["-module", module, "-version", version])
                .arg("-out")
                .arg(src_dir)
                .arg(src_dir),
        )
        .await
        .with_context(|| format!("syncing headers of module {}", module))?;
        Ok(())
    }
}

/// Builds packages for one release.
pub struct Packager<'a, A> {
    config: &'a PackageConfig,
    layout: StagingLayout,
    assets: A,
    scripts: ScriptRenderer,
    download_dir: PathBuf,
    base_ready: bool,
}

impl<'a, A: AssetSource> Packager<'a, A> {
    /// Creates a packager staging into `layout` and fetching assets from `assets`.
    pub fn new(config: &'a PackageConfig, layout: StagingLayout, assets: A) -> Result<Self> {
        Ok(Self {
            download_dir: config.tmp_dir.join("downloads"),
            config,
            layout,
            assets,
            scripts: ScriptRenderer::new()?,
            base_ready: false,
        })
    }

    /// The staging layout packages are written to.
    pub fn layout(&self) -> &StagingLayout {
        &self.layout
    }

    fn require_base(&self, package: &str) -> Result<()> {
        if self.base_ready {
            Ok(())
        } else {
            Err(DeployError::PackageOrder {
                package: package.to_string(),
            })
        }
    }

    /// Virtual package descriptor for `id`, pulled in automatically together
    /// with the upstream Qt package `qt_dependency`.
    fn virtual_meta(&self, id: &str, display_name: String, qt_dependency: String) -> PackageMeta {
        let mut meta = PackageMeta::new(id, display_name, &self.config.pkg_version);
        meta.virtual_ = true;
        meta.auto_depend_on = vec![self.config.pkg_base.clone(), qt_dependency.clone()];
        meta.dependencies = vec![qt_dependency];
        meta
    }

    async fn write_script(&self, id: &str, script: String) -> Result<()> {
        let path = self.layout.meta_dir(id).join(SCRIPT_FILE);
        tokio::fs::write(&path, script)
            .await
            .fs_context("writing install script", &path)
    }

    /// Downloads the asset for `token` and extracts it into `dest`.
    async fn fetch_and_extract(&self, token: &str, dest: &Path) -> Result<()> {
        let zip = platform::is_zip_platform(token);
        let name = format!(
            "{}-{}-{}.{}",
            self.config.descriptor.slug(),
            token,
            self.config.qt_version,
            if zip { "zip" } else { "tar.xz" }
        );
        log::debug!("Fetching asset {}", name);
        let archive_path = self.assets.fetch_asset(&name, &self.download_dir).await?;

        fs::remove_path(dest).await?;
        archive::extract_asset(&archive_path, dest, zip).await?;
        fs::remove_path(&archive_path).await
    }

    /// Stages the base package from the source tree.
    pub async fn create_base_package(&mut self, source_root: &Path) -> Result<()> {
        log::info!("Creating base package {}", self.config.pkg_base);
        let descriptor = &self.config.descriptor;
        let id = self.config.pkg_base.as_str();
        let meta_dir = self.layout.meta_dir(id);
        let data_dir = self.layout.data_dir(id);
        tokio::fs::create_dir_all(&data_dir)
            .await
            .fs_context("creating directory", &data_dir)?;

        let mut meta = PackageMeta::new(id, descriptor.title.clone(), &self.config.pkg_version);
        meta.description = Some(descriptor.description.clone());
        meta.dependencies = descriptor
            .dependencies
            .iter()
            .map(|dep| self.config.qualify_dependency(dep))
            .collect();

        let license_src = source_root.join(&descriptor.license.path);
        let license_file = license_src
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| DeployError::ManifestParse {
                path: source_root.join(crate::config::DESCRIPTOR_FILE),
                reason: format!("license path '{}' has no file name", descriptor.license.path),
            })?;
        fs::copy_file(&license_src, &meta_dir.join(&license_file)).await?;
        meta.licenses.push(LicenseRef {
            name: descriptor.license.name.clone(),
            file: license_file,
        });

        for (src, dest) in &descriptor.installs {
            log::debug!("Installing {} to {}", src, dest);
            fs::copy_path(&source_root.join(src), &data_dir.join(dest))
                .await
                .with_context(|| format!("installing {}", src))?;
        }

        meta.write(&meta_dir).await?;
        self.base_ready = true;
        Ok(())
    }

    /// Stages the source tree as src package and generates its forwarding
    /// headers. The tree is moved, so `source_root` is gone afterwards.
    pub async fn create_src_package(&self, source_root: &Path, syncqt: &SyncQt) -> Result<()> {
        let id = self.config.package_id("src");
        self.require_base(&id)?;
        log::info!("Creating source package {}", id);

        let title = &self.config.descriptor.title;
        let meta = self.virtual_meta(
            &id,
            format!("{} Sources", title),
            self.config.qt_package_id("src"),
        );
        meta.write(&self.layout.meta_dir(&id)).await?;

        for name in STRIPPED_SOURCE_FILES {
            fs::remove_path(&source_root.join(name)).await?;
        }

        let src_dir = self
            .layout
            .data_dir(&id)
            .join(&self.config.qt_version)
            .join("Src")
            .join(self.config.descriptor.slug());
        fs::remove_path(&src_dir).await?;
        fs::move_path(source_root, &src_dir).await?;

        let version = self.config.qt_major_minor();
        for module in &self.config.descriptor.modules {
            log::debug!("Running syncqt for module {}", module);
            syncqt.sync_module(module, &version, &src_dir).await?;
        }
        Ok(())
    }

    /// Stages the binary package of a build platform.
    pub async fn create_platform_package(&self, token: &str) -> Result<()> {
        let arch = platform::package_arch(token);
        let id = self.config.package_id(arch);
        self.require_base(&id)?;
        log::info!("Creating platform package {}", id);

        let mut meta = self.virtual_meta(
            &id,
            format!("{} for {}", self.config.descriptor.title, token),
            self.config.qt_package_id(arch),
        );
        meta.script = Some(SCRIPT_FILE.to_string());
        meta.write(&self.layout.meta_dir(&id)).await?;

        let script = self.scripts.platform_script(
            &self.config.qt_version,
            token,
            platform::patch_style(token),
        )?;
        self.write_script(&id, script).await?;

        let data_dir = self.layout.platform_data_dir(self.config, token);
        self.fetch_and_extract(token, &data_dir).await?;
        fixups::apply_all(&data_dir)
    }

    /// Stages the documentation package.
    pub async fn create_doc_package(&self) -> Result<()> {
        let id = self.config.package_id("doc");
        self.require_base(&id)?;
        log::info!("Creating documentation package {}", id);

        let mut meta = self.virtual_meta(
            &id,
            format!("{} Documentation", self.config.descriptor.title),
            self.config.qt_package_id("doc"),
        );
        meta.script = Some(SCRIPT_FILE.to_string());
        meta.write(&self.layout.meta_dir(&id)).await?;

        let script = self
            .scripts
            .doc_script(&self.config.qt_version, &self.config.descriptor.slug())?;
        self.write_script(&id, script).await?;

        let data_dir = self
            .layout
            .data_dir(&id)
            .join("Docs")
            .join(format!("Qt-{}", self.config.qt_version));
        self.fetch_and_extract("doc", &data_dir).await
    }

    /// Stages the examples package.
    pub async fn create_example_package(&self) -> Result<()> {
        let id = self.config.package_id("examples");
        self.require_base(&id)?;
        log::info!("Creating examples package {}", id);

        let meta = self.virtual_meta(
            &id,
            format!("{} Examples", self.config.descriptor.title),
            self.config.qt_package_id("examples"),
        );
        meta.write(&self.layout.meta_dir(&id)).await?;

        let data_dir = self
            .layout
            .data_dir(&id)
            .join("Examples")
            .join(format!("Qt-{}", self.config.qt_version));
        self.fetch_and_extract("examples", &data_dir).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Descriptor, RepoContext};
    use crate::github::LocalAssets;

    fn config(tmp: &Path) -> PackageConfig {
        let descriptor = Descriptor::parse(
            r#"{"title": "Foo", "description": "The Foo module", "modules": ["foo"],
                "license": {"name": "MIT", "path": "LICENSE"},
                "dependencies": [".core"]}"#,
            Path::new("deploy.json"),
        )
        .unwrap();
        let ctx = RepoContext::parse("Owner/QtFoo", "sha").unwrap();
        PackageConfig::new(ctx, "1.2.3", "5.13.0", descriptor, tmp).unwrap()
    }

    #[tokio::test]
    async fn platform_package_requires_base() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        let packager = Packager::new(
            &config,
            StagingLayout::new(tmp.path().join("packages")),
            LocalAssets::new(tmp.path()),
        )
        .unwrap();

        let err = packager.create_platform_package("gcc_64").await.unwrap_err();
        assert!(matches!(err, DeployError::PackageOrder { .. }));
    }

    #[tokio::test]
    async fn base_package_copies_license_and_qualifies_dependencies() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("source");
        std::fs::create_dir_all(&source).unwrap();
        std::fs::write(source.join("LICENSE"), "MIT").unwrap();

        let config = config(tmp.path());
        let mut packager = Packager::new(
            &config,
            StagingLayout::new(tmp.path().join("packages")),
            LocalAssets::new(tmp.path()),
        )
        .unwrap();
        packager.create_base_package(&source).await.unwrap();

        let meta_dir = packager.layout().meta_dir("qt.qt5.5130.owner.foo");
        let xml = std::fs::read_to_string(meta_dir.join("package.xml")).unwrap();
        assert!(xml.contains("<Dependencies>qt.qt5.5130.core</Dependencies>"));
        assert!(xml.contains("<License name=\"MIT\" file=\"LICENSE\" />"));
        assert!(meta_dir.join("LICENSE").is_file());
    }

    #[test]
    fn syncqt_url_is_pinned_to_qt_version() {
        assert_eq!(
            syncqt_url("5.13.0"),
            "https://code.qt.io/cgit/qt/qtbase.git/plain/bin/syncqt.pl?h=5.13.0"
        );
    }
}
