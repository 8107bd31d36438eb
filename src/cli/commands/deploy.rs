//! The deploy command: retrieve, package, generate repositories, publish.

use crate::cli::{Args, OutputManager};
use crate::config::{DESCRIPTOR_FILE, Descriptor, PackageConfig, RepoContext, parse_tag_ref};
use crate::error::{ErrorExt, Result};
use crate::github::{ReleaseAssets, ReleaseClient};
use crate::packager::{Packager, StagingLayout, SyncQt, syncqt_url};
use crate::platform::{self, HostOs};
use crate::publish::SshfsTarget;
use crate::uploader::Uploader;
use crate::utils::fs;
use regex::Regex;
use std::path::PathBuf;

const NOT_A_TAG: &str = "Deployments are only run for tags. Not doing anything! Consider adding \
'if: startsWith(github.ref, 'refs/tags/')' as condition to this step";

/// Inputs of one run after validation.
struct Run<'a> {
    args: &'a Args,
    output: &'a OutputManager,
    context: RepoContext,
    pkg_version: String,
    qt_version: String,
    excludes: Option<Regex>,
    work_dir: PathBuf,
    repogen: PathBuf,
}

/// Runs a deployment. Non-tag refs are a successful no-op.
pub async fn execute_deploy(args: &Args, output: &OutputManager) -> Result<i32> {
    let Some(pkg_version) = parse_tag_ref(&args.reference)? else {
        log::warn!("{}", NOT_A_TAG);
        output.warn(NOT_A_TAG);
        return Ok(0);
    };
    output.info(&format!("Detected package version as {}", pkg_version));

    args.validate()?;
    let repository = args.repository.as_deref().unwrap_or_default();
    let run = Run {
        args,
        output,
        context: RepoContext::parse(repository, &args.sha)?,
        pkg_version,
        qt_version: args.qt_version.clone().unwrap_or_default(),
        excludes: args.exclude_pattern()?,
        work_dir: args.work_dir(),
        repogen: args.repogen_path()?,
    };

    output.verbose(&format!("Work directory {}", run.work_dir.display()));
    output.verbose(&format!("Repository generator {}", run.repogen.display()));
    if let Some(excludes) = &run.excludes {
        output.verbose(&format!("Excluding platforms matching '{}'", excludes));
    }

    tokio::fs::create_dir_all(&run.work_dir)
        .await
        .fs_context("creating work directory", &run.work_dir)?;

    let guard = if args.no_mount {
        tokio::fs::create_dir_all(&args.deploy_dir)
            .await
            .fs_context("creating deploy directory", &args.deploy_dir)?;
        None
    } else {
        output.section("Mounting remote");
        let target = SshfsTarget::new(&args.deploy_dir, &run.work_dir);
        Some(
            target
                .mount(
                    args.host.as_deref().unwrap_or_default(),
                    args.key.as_deref().unwrap_or_default(),
                    args.port.as_deref(),
                )
                .await?,
        )
    };

    let result = run.deploy().await;

    if let Some(guard) = guard {
        output.section("Unmounting remote");
        let released = guard.release().await;
        if let (Err(_), Err(e)) = (&result, &released) {
            log::warn!("Unmounting after a failed deployment failed too: {}", e);
            output.warn(&format!("Unmount failed: {}", e));
        }
        result?;
        released?;
    } else {
        result?;
    }

    output.success(&format!(
        "Deployed {} {} for Qt {}",
        run.context.repo, run.pkg_version, run.qt_version
    ));
    Ok(0)
}

impl Run<'_> {
    async fn deploy(&self) -> Result<()> {
        let client = ReleaseClient::new(&self.args.api_url, self.args.token.clone())?;

        self.output.section("Downloading and creating packages");
        let snapshot = client
            .fetch_release(&self.context, &self.pkg_version, &self.work_dir)
            .await?;
        if snapshot.assets.is_empty() {
            self.output.warn("The release has no assets attached");
        } else {
            self.output
                .verbose(&format!("Release has {} assets", snapshot.assets.len()));
        }
        let descriptor = Descriptor::load(&snapshot.source_root.join(DESCRIPTOR_FILE)).await?;
        let config = PackageConfig::new(
            self.context.clone(),
            &self.pkg_version,
            &self.qt_version,
            descriptor,
            &self.work_dir,
        )?;

        let layout = self.fresh_layout(&config).await?;
        let assets = ReleaseAssets::new(client.clone(), snapshot.assets);
        let mut packager = Packager::new(&config, layout.clone(), assets)?;

        self.output.progress(&format!("Base package {}", config.pkg_base));
        packager.create_base_package(&snapshot.source_root).await?;

        let platforms = platform::list_platforms(self.excludes.as_ref());
        if platforms.contains(&"src") {
            self.output.progress("Source package");
            let script = self.work_dir.join("syncqt.pl");
            client
                .download_public(&syncqt_url(&config.qt_version), &script)
                .await?;
            packager
                .create_src_package(&snapshot.source_root, &SyncQt::new(script))
                .await?;
        }

        for token in platforms.iter().filter(|token| **token != "src") {
            self.output.progress(&format!("Package for {}", token));
            match *token {
                "doc" => packager.create_doc_package().await?,
                "examples" => packager.create_example_package().await?,
                other => packager.create_platform_package(other).await?,
            }
        }

        self.output.section("Generating repositories");
        let uploader = Uploader::new(
            &config,
            layout,
            &self.repogen,
            &self.args.archivegen,
            &self.args.deploy_dir,
        );
        for os in HostOs::ALL {
            let tokens = platform::platforms_for(os, self.excludes.as_ref());
            self.output
                .verbose(&format!("{} platforms: {}", os, tokens.join(", ")));
            uploader.generate_repos(os, os.repo_arch(), &tokens).await?;
            self.output
                .success(&format!("Updated {}", uploader.repository_dir(os, os.repo_arch()).display()));
        }
        Ok(())
    }

    /// Empty staging root; host tool backups of earlier runs are dropped too.
    async fn fresh_layout(&self, config: &PackageConfig) -> Result<StagingLayout> {
        let root = self.work_dir.join("packages");
        fs::remove_path(&root).await?;
        fs::remove_path(&config.tmp_dir.join("hostbuild-backups")).await?;
        tokio::fs::create_dir_all(&root)
            .await
            .fs_context("creating directory", &root)?;
        Ok(StagingLayout::new(root))
    }
}
