//! Release asset lookup.

use super::{ReleaseAsset, ReleaseClient};
use crate::error::{DeployError, Result};
use crate::utils::fs;
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};

/// Asset names mapped to their download URLs.
#[derive(Debug, Clone, Default)]
pub struct AssetIndex {
    urls: HashMap<String, String>,
}

impl AssetIndex {
    /// Indexes the assets of a release.
    pub fn new(assets: Vec<ReleaseAsset>) -> Self {
        Self {
            urls: assets
                .into_iter()
                .map(|a| (a.name, a.browser_download_url))
                .collect(),
        }
    }

    /// Download URL of the asset called `name`.
    pub fn resolve(&self, name: &str) -> Result<&str> {
        self.urls
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| DeployError::UnknownAsset {
                name: name.to_string(),
            })
    }

    /// Number of indexed assets.
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Returns true if the release has no assets.
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// Where the packager gets platform archives from.
pub trait AssetSource: Send + Sync {
    /// Stores the asset called `name` in `dest_dir` and returns its path.
    fn fetch_asset(&self, name: &str, dest_dir: &Path)
    -> impl Future<Output = Result<PathBuf>> + Send;
}

/// Assets downloaded from the release.
#[derive(Debug, Clone)]
pub struct ReleaseAssets {
    client: ReleaseClient,
    index: AssetIndex,
}

impl ReleaseAssets {
    /// Serves assets of `index` through `client`.
    pub fn new(client: ReleaseClient, index: AssetIndex) -> Self {
        Self { client, index }
    }
}

impl AssetSource for ReleaseAssets {
    async fn fetch_asset(&self, name: &str, dest_dir: &Path) -> Result<PathBuf> {
        let url = self.index.resolve(name)?;
        let dest = dest_dir.join(name);
        self.client.download(url, &dest).await?;
        Ok(dest)
    }
}

/// Assets already present in a local directory.
#[derive(Debug, Clone)]
pub struct LocalAssets {
    dir: PathBuf,
}

impl LocalAssets {
    /// Serves assets from `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl AssetSource for LocalAssets {
    async fn fetch_asset(&self, name: &str, dest_dir: &Path) -> Result<PathBuf> {
        let source = self.dir.join(name);
        if !source.is_file() {
            return Err(DeployError::UnknownAsset {
                name: name.to_string(),
            });
        }
        let dest = dest_dir.join(name);
        fs::copy_file(&source, &dest).await?;
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> AssetIndex {
        AssetIndex::new(vec![ReleaseAsset {
            name: "foo-gcc_64-5.13.0.tar.xz".to_string(),
            browser_download_url: "https://example.invalid/foo".to_string(),
        }])
    }

    #[test]
    fn resolves_known_asset() {
        assert_eq!(
            index().resolve("foo-gcc_64-5.13.0.tar.xz").unwrap(),
            "https://example.invalid/foo"
        );
    }

    #[test]
    fn unknown_asset_is_an_error() {
        let err = index().resolve("foo-clang_64-5.13.0.tar.xz").unwrap_err();
        assert!(matches!(err, DeployError::UnknownAsset { name } if name == "foo-clang_64-5.13.0.tar.xz"));
    }

    #[tokio::test]
    async fn local_assets_copy_into_dest() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.zip"), b"zip").unwrap();
        let dest = tmp.path().join("dl");

        let path = LocalAssets::new(tmp.path())
            .fetch_asset("a.zip", &dest)
            .await
            .unwrap();

        assert_eq!(path, dest.join("a.zip"));
        assert!(LocalAssets::new(tmp.path()).fetch_asset("b.zip", &dest).await.is_err());
    }
}
