//! `meta/package.xml` generation.

use crate::error::{ErrorExt, Result};
use crate::utils::xml_escape;
use std::fmt::Write as _;
use std::path::Path;

/// File name of the package descriptor inside `meta`.
pub const PACKAGE_FILE: &str = "package.xml";

/// License entry of a package.
#[derive(Debug, Clone)]
pub struct LicenseRef {
    /// Display name
    pub name: String,
    /// License file name inside `meta`
    pub file: String,
}

/// Contents of a `package.xml`.
#[derive(Debug, Clone, Default)]
pub struct PackageMeta {
    /// Package id
    pub name: String,
    /// Name shown in the installer
    pub display_name: String,
    /// Long description
    pub description: Option<String>,
    /// Hard dependencies
    pub dependencies: Vec<String>,
    /// Package version
    pub version: String,
    /// Release date, `YYYY-MM-DD`
    pub release_date: String,
    /// Licenses shown before installation
    pub licenses: Vec<LicenseRef>,
    /// Selected by default
    pub default: bool,
    /// Hidden from the component tree
    pub virtual_: bool,
    /// Installed automatically once all of these are installed
    pub auto_depend_on: Vec<String>,
    /// Install script file name inside `meta`
    pub script: Option<String>,
}

fn element(xml: &mut String, tag: &str, value: &str) {
    let _ = writeln!(xml, "    <{tag}>{}</{tag}>", xml_escape(value));
}

/// Today's date in the form used by `ReleaseDate`.
pub fn release_date() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

impl PackageMeta {
    /// Starts a descriptor dated today.
    pub fn new(name: impl Into<String>, display_name: impl Into<String>, version: &str) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            version: version.to_string(),
            release_date: release_date(),
            ..Self::default()
        }
    }

    /// Serializes to `package.xml` text.
    pub fn to_xml(&self) -> String {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Package>\n");

        element(&mut xml, "Name", &self.name);
        element(&mut xml, "DisplayName", &self.display_name);
        if let Some(description) = &self.description {
            element(&mut xml, "Description", description);
        }
        element(&mut xml, "Dependencies", &self.dependencies.join(", "));
        element(&mut xml, "Version", &self.version);
        element(&mut xml, "ReleaseDate", &self.release_date);
        if !self.licenses.is_empty() {
            xml.push_str("    <Licenses>\n");
            for license in &self.licenses {
                let _ = writeln!(
                    xml,
                    "        <License name=\"{}\" file=\"{}\" />",
                    xml_escape(&license.name),
                    xml_escape(&license.file)
                );
            }
            xml.push_str("    </Licenses>\n");
        }
        if self.default {
            element(&mut xml, "Default", "true");
        }
        if self.virtual_ {
            element(&mut xml, "Virtual", "true");
        }
        if !self.auto_depend_on.is_empty() {
            element(&mut xml, "AutoDependOn", &self.auto_depend_on.join(", "));
        }
        if let Some(script) = &self.script {
            element(&mut xml, "Script", script);
        }

        xml.push_str("</Package>\n");
        xml
    }

    /// Writes `package.xml` into `meta_dir`.
    pub async fn write(&self, meta_dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(meta_dir)
            .await
            .fs_context("creating directory", meta_dir)?;
        let path = meta_dir.join(PACKAGE_FILE);
        tokio::fs::write(&path, self.to_xml())
            .await
            .fs_context("writing package descriptor", &path)
    }
}
