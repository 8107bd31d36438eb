//! Deploy descriptor (`deploy.json`) shipped in the module's source tree.

use crate::error::{DeployError, Result};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::path::Path;

/// File name of the descriptor at the root of the source tree.
pub const DESCRIPTOR_FILE: &str = "deploy.json";

/// License shipped with the base package.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct License {
    /// Display name of the license
    pub name: String,
    /// License file, relative to the source root
    pub path: String,
}

/// Parsed deploy descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Descriptor {
    /// Product title; lowercased it doubles as a file name slug
    pub title: String,
    /// Package description
    pub description: String,
    /// Qt modules whose forwarding headers are generated
    pub modules: Vec<String>,
    /// License of the module
    pub license: License,
    /// Base package dependencies; entries starting with `.` are relative to
    /// the Qt version prefix
    #[serde(default, deserialize_with = "null_as_default")]
    pub dependencies: Vec<String>,
    /// Extra files for the base package: source path -> install path
    #[serde(default, deserialize_with = "null_as_default")]
    pub installs: BTreeMap<String, String>,
    /// Globs of binaries that must match the machine running the installer
    #[serde(default, deserialize_with = "null_as_default")]
    pub hostbuilds: Vec<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Descriptor {
    /// Reads and validates the descriptor at `path`.
    pub async fn load(path: &Path) -> Result<Self> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DeployError::ManifestNotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(error) => {
                return Err(DeployError::Fs {
                    context: "reading deploy descriptor",
                    path: path.to_path_buf(),
                    error,
                });
            }
        };
        log::debug!("Loaded deploy descriptor from {}", path.display());
        Self::parse(&text, path)
    }

    /// Parses descriptor text; `path` is only used for diagnostics.
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let descriptor: Descriptor =
            serde_json::from_str(text).map_err(|e| DeployError::ManifestParse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        descriptor.validate(path)?;
        Ok(descriptor)
    }

    /// Lowercased title, used in asset names and install paths.
    pub fn slug(&self) -> String {
        self.title.to_lowercase()
    }

    fn validate(&self, path: &Path) -> Result<()> {
        const UNSAFE: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

        let invalid = |reason: &str| DeployError::ManifestParse {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        let title = self.title.trim();
        if title.is_empty() {
            return Err(invalid("title must not be empty"));
        }
        if title == "." || title == ".." || self.title.contains(UNSAFE) {
            return Err(invalid("title must be usable as a file name"));
        }
        if self.license.path.is_empty() {
            return Err(invalid("license path must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{
        "title": "JsonSerializer",
        "description": "A library to serialize QObjects",
        "modules": ["jsonserializer"],
        "license": {"name": "BSD-3-Clause", "path": "LICENSE"},
        "dependencies": [".core", "qt.tools.qdep"],
        "installs": {"tools/qdep.pri": "mkspecs/features/qdep.pri"},
        "hostbuilds": ["bin/qdep*"]
    }"#;

    #[test]
    fn parses_full_descriptor() {
        let d = Descriptor::parse(FULL, Path::new("deploy.json")).unwrap();
        assert_eq!(d.title, "JsonSerializer");
        assert_eq!(d.slug(), "jsonserializer");
        assert_eq!(d.modules, vec!["jsonserializer"]);
        assert_eq!(d.license.name, "BSD-3-Clause");
        assert_eq!(d.dependencies.len(), 2);
        assert_eq!(
            d.installs.get("tools/qdep.pri").map(String::as_str),
            Some("mkspecs/features/qdep.pri")
        );
        assert_eq!(d.hostbuilds, vec!["bin/qdep*"]);
    }

    #[test]
    fn optional_fields_default_to_empty() {
        let text = r#"{
            "title": "Foo",
            "description": "d",
            "modules": ["core"],
            "license": {"name": "MIT", "path": "LICENSE"},
            "dependencies": null
        }"#;
        let d = Descriptor::parse(text, Path::new("deploy.json")).unwrap();
        assert!(d.dependencies.is_empty());
        assert!(d.installs.is_empty());
        assert!(d.hostbuilds.is_empty());
    }

    #[test]
    fn missing_required_field_is_parse_error() {
        let text = r#"{"title": "Foo", "description": "d", "modules": []}"#;
        let err = Descriptor::parse(text, Path::new("deploy.json")).unwrap_err();
        assert!(matches!(err, DeployError::ManifestParse { .. }));
    }

    #[test]
    fn unsafe_title_is_rejected() {
        let text = FULL.replace("\"JsonSerializer\"", "\"Json/Serializer\"");
        let err = Descriptor::parse(&text, Path::new("deploy.json")).unwrap_err();
        assert!(err.to_string().contains("file name"));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = Descriptor::load(&dir.path().join(DESCRIPTOR_FILE))
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::ManifestNotFound { .. }));
    }
}
