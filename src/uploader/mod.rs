//! Repository generation.
//!
//! Feeds the staged packages to the installer framework's repository
//! generator once per target OS. Every step can be re-run against an existing
//! repository: `repogen --update-new-components` leaves present components
//! alone and the version package is only created when missing.

pub mod hosttools;
pub mod updates;

use crate::config::PackageConfig;
use crate::error::{Context, ErrorExt, Result};
use crate::packager::StagingLayout;
use crate::platform::{self, HostOs};
use crate::utils::process;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Generates per-OS repositories from one staging tree.
#[derive(Debug)]
pub struct Uploader<'a> {
    config: &'a PackageConfig,
    layout: StagingLayout,
    repogen: PathBuf,
    archiver: PathBuf,
    deploy_dir: PathBuf,
}

impl<'a> Uploader<'a> {
    /// Creates an uploader writing repositories below `deploy_dir`.
    pub fn new(
        config: &'a PackageConfig,
        layout: StagingLayout,
        repogen: impl Into<PathBuf>,
        archiver: impl Into<PathBuf>,
        deploy_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            config,
            layout,
            repogen: repogen.into(),
            archiver: archiver.into(),
            deploy_dir: deploy_dir.into(),
        }
    }

    /// Repository directory for `os` and `arch`, e.g. `linux_x64/qt5130`.
    pub fn repository_dir(&self, os: HostOs, arch: &str) -> PathBuf {
        self.deploy_dir
            .join(format!("{}_{}", os, arch))
            .join(self.config.repo_dir_name())
    }

    /// Package ids handed to repogen: the base package, then one per token.
    pub fn package_ids(&self, platforms: &[&str]) -> Vec<String> {
        std::iter::once(self.config.pkg_base.clone())
            .chain(
                platforms
                    .iter()
                    .map(|token| self.config.package_id(platform::package_arch(token))),
            )
            .collect()
    }

    /// Swaps host tools of every platform to the variant built for `os`.
    async fn prepare_host_tools(&self, os: HostOs, platforms: &[&str]) -> Result<()> {
        let host = platform::host_tool_platform(os, platforms)?;
        log::info!("Host tools for {} come from {}", os, host);

        // The host platform is restored first so others copy pristine tools.
        let ordered = std::iter::once(host).chain(platforms.iter().copied().filter(|t| *t != host));
        for token in ordered {
            hosttools::prepare_host_tools(self.config, &self.layout, os, token, host)
                .await
                .with_context(|| format!("preparing host tools of {}", token))?;
        }
        Ok(())
    }

    async fn run_repogen(&self, ids: &[String], dest: &Path) -> Result<()> {
        process::run(
            Command::new(&self.repogen)
                .arg("--update-new-components")
                .arg("-p")
                .arg(self.layout.root())
                .arg("-i")
                .arg(ids.join(","))
                .arg(dest),
        )
        .await?;
        Ok(())
    }

    /// Generates or updates the repository for `os`/`arch` with `platforms`.
    pub async fn generate_repos(&self, os: HostOs, arch: &str, platforms: &[&str]) -> Result<()> {
        log::info!("Deploying for {}_{}", os, arch);

        if !self.config.descriptor.hostbuilds.is_empty() {
            self.prepare_host_tools(os, platforms).await?;
        }

        let dest = self.repository_dir(os, arch);
        tokio::fs::create_dir_all(&dest)
            .await
            .fs_context("creating repository directory", &dest)?;

        let ids = self.package_ids(platforms);
        for id in &ids {
            log::debug!("Adding package {}", id);
        }
        self.run_repogen(&ids, &dest).await?;

        updates::ensure_version_package(self.config, &self.archiver, &dest).await?;
        Ok(())
    }
}
