//! Host tool substitution.
//!
//! Binaries listed in `hostbuilds` run on the installing machine, so every
//! repository has to ship the variant built for its OS. The data directory of
//! each platform is snapshotted on first contact and restored on every later
//! run, which makes substitution start from the extracted state each time.

use crate::config::PackageConfig;
use crate::error::{ErrorExt, Result};
use crate::packager::StagingLayout;
use crate::platform::{self, HostOs};
use crate::utils::fs;
use std::path::{Path, PathBuf};

fn backup_dir(config: &PackageConfig, token: &str) -> PathBuf {
    config.tmp_dir.join("hostbuild-backups").join(token)
}

/// Snapshots `data` on first use, restores it from the snapshot afterwards.
async fn snapshot_or_restore(data: &Path, backup: &Path, token: &str) -> Result<()> {
    if backup.is_dir() {
        log::debug!("Restoring {} from backup", token);
        fs::remove_path(data).await?;
        return fs::copy_dir(backup, data).await;
    }

    log::debug!("Backing up {}", token);
    let partial = backup.with_file_name(format!("{}.partial", token));
    fs::remove_path(&partial).await?;
    fs::copy_dir(data, &partial).await?;
    tokio::fs::rename(&partial, backup)
        .await
        .fs_context("finishing backup", backup)
}

/// Replaces the host tools of `token` with those of `host_token`.
///
/// Basic platforms are skipped. Platforms whose tools are built on another OS
/// than `os` keep their own binaries.
pub async fn prepare_host_tools(
    config: &PackageConfig,
    layout: &StagingLayout,
    os: HostOs,
    token: &str,
    host_token: &str,
) -> Result<()> {
    if platform::is_basic(token) {
        return Ok(());
    }

    let data = layout.platform_data_dir(config, token);
    let host_data = layout.platform_data_dir(config, host_token);
    snapshot_or_restore(&data, &backup_dir(config, token), token).await?;

    if token == host_token {
        return Ok(());
    }
    if platform::host_os_of(token).is_some_and(|natal| natal != os) {
        log::debug!("Keeping own host tools of {}", token);
        return Ok(());
    }

    log::info!("Using host tools of {} for {}", host_token, token);
    for pattern in &config.descriptor.hostbuilds {
        for stale in fs::find_matches(&data, pattern)? {
            fs::remove_path(&stale).await?;
        }
        for tool in fs::find_matches(&host_data, pattern)? {
            let relative = tool.strip_prefix(&host_data)?;
            fs::copy_path(&tool, &data.join(relative)).await?;
        }
    }
    Ok(())
}
