//! Install scripts (`installscript.qs`) embedded in virtual packages.
//!
//! The scripts run inside the installer client. Everything decided at
//! install time (client OS, presence of the IDE settings file) is evaluated
//! by the script itself; this module only fills in fixed values.

use crate::error::Result;
use crate::platform::PatchStyle;
use handlebars::Handlebars;
use serde::Serialize;

/// File name of the script inside a package's `meta` directory.
pub const SCRIPT_FILE: &str = "installscript.qs";

const PLATFORM_TEMPLATE: &str = r#"function Component()
{
}

Component.prototype.createOperations = function()
{
    component.createOperations();

    var platform = "";
    if (installer.value("os") == "win")
        platform = "windows";
    else if (installer.value("os") == "mac")
        platform = "mac";
    else if (installer.value("os") == "x11")
        platform = "linux";

    if (platform != "") {
        component.addOperation("QtPatch",
                               platform,
                               "@TargetDir@/{{qt_version}}/{{platform}}",
                               "{{patch_style}}");
    }
}
"#;

const DOC_TEMPLATE: &str = r#"function Component()
{
}

Component.prototype.createOperations = function()
{
    component.createOperations();

    var settingsFile = installer.value("QtCreatorInstallerSettingsFile");
    if (settingsFile == "")
        return;

    component.addOperation("Settings",
                           "path=" + settingsFile,
                           "method=add_array_value",
                           "key=Help/InstalledDocumentation",
                           "value=@TargetDir@/Docs/Qt-{{qt_version}}/{{slug}}.qch");
}
"#;

#[derive(Serialize)]
struct PlatformScript<'a> {
    qt_version: &'a str,
    platform: &'a str,
    patch_style: &'a str,
}

#[derive(Serialize)]
struct DocScript<'a> {
    qt_version: &'a str,
    slug: &'a str,
}

/// Renders install scripts from the built-in templates.
pub struct ScriptRenderer {
    registry: Handlebars<'static>,
}

impl ScriptRenderer {
    /// Registers the built-in templates.
    pub fn new() -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(handlebars::no_escape);
        registry.register_template_string("platform", PLATFORM_TEMPLATE)?;
        registry.register_template_string("doc", DOC_TEMPLATE)?;
        Ok(Self { registry })
    }

    /// Script that patches the installed Qt build for `platform`.
    pub fn platform_script(
        &self,
        qt_version: &str,
        platform: &str,
        patch_style: PatchStyle,
    ) -> Result<String> {
        Ok(self.registry.render(
            "platform",
            &PlatformScript {
                qt_version,
                platform,
                patch_style: patch_style.as_str(),
            },
        )?)
    }

    /// Script that registers the module documentation with the IDE, if present.
    pub fn doc_script(&self, qt_version: &str, slug: &str) -> Result<String> {
        Ok(self
            .registry
            .render("doc", &DocScript { qt_version, slug })?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_script_carries_path_and_style() {
        let script = ScriptRenderer::new()
            .unwrap()
            .platform_script("5.13.0", "android_armv7", PatchStyle::Embedded)
            .unwrap();
        assert!(script.contains("\"@TargetDir@/5.13.0/android_armv7\""));
        assert!(script.contains("\"emb-arm-qt5\""));
        assert!(script.contains("installer.value(\"os\") == \"x11\""));
    }

    #[test]
    fn doc_script_checks_settings_file_at_install_time() {
        let script = ScriptRenderer::new()
            .unwrap()
            .doc_script("5.13.0", "jsonserializer")
            .unwrap();
        assert!(script.contains("if (settingsFile == \"\")"));
        assert!(script.contains("Docs/Qt-5.13.0/jsonserializer.qch"));
    }
}
