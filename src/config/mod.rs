//! Run configuration: repository context, deploy descriptor and package naming.

mod descriptor;

pub use descriptor::{DESCRIPTOR_FILE, Descriptor, License};

use crate::error::{DeployError, Result};
use std::path::{Path, PathBuf};

/// Repository the deployment runs for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoContext {
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Commit the run was triggered for
    pub sha: String,
}

impl RepoContext {
    /// Builds the context from an `owner/repo` slug and a commit sha.
    pub fn parse(repository: &str, sha: &str) -> Result<Self> {
        match repository.split_once('/') {
            Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
                Ok(Self {
                    owner: owner.to_string(),
                    repo: repo.trim_end_matches(".git").to_string(),
                    sha: sha.to_string(),
                })
            }
            _ => Err(DeployError::RepositoryFormat {
                repository: repository.to_string(),
            }),
        }
    }
}

/// Extracts the tag name from a `refs/tags/<version>` ref.
///
/// Returns `Ok(None)` for well formed refs of any other kind, which callers
/// treat as "nothing to deploy".
pub fn parse_tag_ref(reference: &str) -> Result<Option<String>> {
    let parts: Vec<&str> = reference.split('/').collect();
    if parts.len() != 3 || parts[0] != "refs" || parts[2].is_empty() {
        return Err(DeployError::RefFormat {
            reference: reference.to_string(),
        });
    }
    if parts[1] != "tags" {
        return Ok(None);
    }
    Ok(Some(parts[2].to_string()))
}

/// Immutable per-run packaging configuration shared by packager and uploader.
#[derive(Debug, Clone)]
pub struct PackageConfig {
    /// Version of the module release, taken from the tag
    pub pkg_version: String,
    /// Qt version the module is built against
    pub qt_version: String,
    /// `qt_version` without its non-numeric characters, e.g. `5130`
    pub qt_id: String,
    /// Name of the base package, e.g. `qt.qt5.5130.skycoder42.jsonserializer`
    pub pkg_base: String,
    /// Parsed deploy descriptor
    pub descriptor: Descriptor,
    /// Scratch directory for downloads and backups
    pub tmp_dir: PathBuf,
    /// Repository context
    pub context: RepoContext,
}

impl PackageConfig {
    /// Creates the configuration once the descriptor is known.
    pub fn new(
        context: RepoContext,
        pkg_version: &str,
        qt_version: &str,
        descriptor: Descriptor,
        tmp_dir: &Path,
    ) -> Result<Self> {
        let qt_id: String = qt_version.chars().filter(char::is_ascii_digit).collect();
        if qt_id.is_empty() {
            return Err(DeployError::Version {
                version: qt_version.to_string(),
                reason: "no version digits".to_string(),
            });
        }
        let repo_suffix: String = context.repo.chars().skip(2).collect();
        let pkg_base = format!(
            "qt.qt5.{}.{}.{}",
            qt_id,
            context.owner.to_lowercase(),
            repo_suffix.to_lowercase()
        );
        log::debug!("Using package base {}", pkg_base);

        Ok(Self {
            pkg_version: pkg_version.to_string(),
            qt_version: qt_version.to_string(),
            qt_id,
            pkg_base,
            descriptor,
            tmp_dir: tmp_dir.to_path_buf(),
            context,
        })
    }

    /// Version prefix shared with the upstream Qt packages, e.g. `qt.qt5.5130`.
    pub fn prefix(&self) -> String {
        format!("qt.qt5.{}", self.qt_id)
    }

    /// Id of a package below the base package, e.g. `<base>.gcc_64`.
    pub fn package_id(&self, suffix: &str) -> String {
        format!("{}.{}", self.pkg_base, suffix)
    }

    /// Id of an upstream Qt package, e.g. `qt.qt5.5130.gcc_64`.
    pub fn qt_package_id(&self, suffix: &str) -> String {
        format!("{}.{}", self.prefix(), suffix)
    }

    /// Id of the per-owner root package in every repository.
    pub fn version_package_id(&self) -> String {
        self.qt_package_id(&self.context.owner.to_lowercase())
    }

    /// Expands `.suffix` dependencies against the version prefix.
    pub fn qualify_dependency(&self, dependency: &str) -> String {
        if dependency.starts_with('.') {
            format!("{}{}", self.prefix(), dependency)
        } else {
            dependency.to_string()
        }
    }

    /// `major.minor` of the Qt version. Branch names like `5.13` are kept
    /// as they are.
    pub fn qt_major_minor(&self) -> String {
        match semver::Version::parse(&self.qt_version) {
            Ok(v) => format!("{}.{}", v.major, v.minor),
            Err(_) => self
                .qt_version
                .split('.')
                .take(2)
                .collect::<Vec<_>>()
                .join("."),
        }
    }

    /// Repository directory name for this Qt version, e.g. `qt5130`.
    pub fn repo_dir_name(&self) -> String {
        format!("qt{}", self.qt_id)
    }
}
