//! GitHub release access: release lookup, source snapshot and asset downloads.

mod assets;

pub use assets::{AssetIndex, AssetSource, LocalAssets, ReleaseAssets};

use crate::config::RepoContext;
use crate::error::{DeployError, ErrorExt, Result};
use crate::utils::{archive, fs};
use reqwest::StatusCode;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use url::Url;

/// Default REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// A published release.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    /// Tag the release was created for
    pub tag_name: String,
    /// Source snapshot of the tagged commit
    pub tarball_url: String,
    /// Uploaded build artifacts
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// A file attached to a release.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    /// File name of the asset
    pub name: String,
    /// Public download URL
    pub browser_download_url: String,
}

/// Source tree and asset listing of a release.
#[derive(Debug)]
pub struct SourceSnapshot {
    /// Root of the extracted source tree
    pub source_root: PathBuf,
    /// Assets attached to the release
    pub assets: AssetIndex,
}

/// Thin client for the release endpoints.
#[derive(Debug, Clone)]
pub struct ReleaseClient {
    http: reqwest::Client,
    api_url: Url,
    token: Option<String>,
}

impl ReleaseClient {
    /// Creates a client for `api_url`, authenticating with `token` if given.
    pub fn new(api_url: &str, token: Option<String>) -> Result<Self> {
        let mut api_url = Url::parse(api_url)?;
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            api_url,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    fn get(&self, url: Url) -> reqwest::RequestBuilder {
        let request = self.http.get(url);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Looks up the release for `tag`.
    pub async fn release_by_tag(&self, owner: &str, repo: &str, tag: &str) -> Result<Release> {
        let url = self
            .api_url
            .join(&format!("repos/{}/{}/releases/tags/{}", owner, repo, tag))?;
        log::debug!("GET {}", url);

        let response = self
            .get(url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(DeployError::ReleaseNotFound {
                owner: owner.to_string(),
                repo: repo.to_string(),
                tag: tag.to_string(),
            });
        }
        Ok(response.error_for_status()?.json().await?)
    }

    /// Streams `url` into the file `dest`, authenticated with the token.
    pub async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        self.fetch(self.get(Url::parse(url)?), dest).await
    }

    /// Like [`download`](Self::download), without sending the token.
    ///
    /// For files hosted outside the release API.
    pub async fn download_public(&self, url: &str, dest: &Path) -> Result<()> {
        self.fetch(self.http.get(Url::parse(url)?), dest).await
    }

    async fn fetch(&self, request: reqwest::RequestBuilder, dest: &Path) -> Result<()> {
        let mut response = request.send().await?.error_for_status()?;
        log::info!("Downloading {}", response.url());

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .fs_context("creating directory", parent)?;
        }
        let mut file = tokio::fs::File::create(dest)
            .await
            .fs_context("creating file", dest)?;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await.fs_context("writing file", dest)?;
        }
        file.flush().await.fs_context("writing file", dest)?;
        Ok(())
    }

    /// Fetches the release for `tag` and unpacks its source snapshot below
    /// `work_dir`.
    pub async fn fetch_release(
        &self,
        context: &RepoContext,
        tag: &str,
        work_dir: &Path,
    ) -> Result<SourceSnapshot> {
        let release = self
            .release_by_tag(&context.owner, &context.repo, tag)
            .await?;
        log::info!(
            "Found release {} with {} assets",
            release.tag_name,
            release.assets.len()
        );

        let tarball = work_dir.join("source.tar.gz");
        self.download(&release.tarball_url, &tarball).await?;

        let extract_dir = work_dir.join("source");
        fs::remove_path(&extract_dir).await?;
        archive::extract_tar_gz(&tarball, &extract_dir).await?;
        let source_root = archive::single_top_dir(&extract_dir)?;

        Ok(SourceSnapshot {
            source_root,
            assets: AssetIndex::new(release.assets),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_payload_deserializes() {
        let json = r#"{
            "tag_name": "1.2.3",
            "tarball_url": "https://api.github.com/repos/o/r/tarball/1.2.3",
            "draft": false,
            "assets": [{"name": "foo-gcc_64-5.13.0.tar.xz",
                        "browser_download_url": "https://example.invalid/a",
                        "size": 10}]
        }"#;
        let release: Release = serde_json::from_str(json).unwrap();
        assert_eq!(release.tag_name, "1.2.3");
        assert_eq!(release.assets.len(), 1);
        assert_eq!(release.assets[0].name, "foo-gcc_64-5.13.0.tar.xz");
    }

    #[test]
    fn api_url_gets_trailing_slash() {
        let client = ReleaseClient::new("https://ghe.example.com/api/v3", None).unwrap();
        assert_eq!(
            client
                .api_url
                .join("repos/o/r/releases/tags/1.0.0")
                .unwrap()
                .as_str(),
            "https://ghe.example.com/api/v3/repos/o/r/releases/tags/1.0.0"
        );
    }

    #[test]
    fn empty_token_is_ignored() {
        let client = ReleaseClient::new(DEFAULT_API_URL, Some(String::new())).unwrap();
        assert!(client.token.is_none());
    }
}
