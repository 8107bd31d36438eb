#![allow(dead_code)]

use qtifw_deploy::{Descriptor, PackageConfig, RepoContext};
use std::path::{Path, PathBuf};

pub const QT_VERSION: &str = "5.13.0";
pub const PKG_BASE: &str = "qt.qt5.5130.owner.foo";

pub fn descriptor(extra: &str) -> Descriptor {
    let text = format!(
        r#"{{
            "title": "Foo",
            "description": "The Foo module",
            "modules": ["foo", "foobar"],
            "license": {{"name": "BSD-3-Clause", "path": "LICENSE"}},
            "dependencies": [".core", "qt.tools.qdep"]{}
        }}"#,
        extra
    );
    Descriptor::parse(&text, Path::new("deploy.json")).unwrap()
}

pub fn config(tmp_dir: &Path, descriptor: Descriptor) -> PackageConfig {
    let context = RepoContext::parse("Owner/QtFoo", "0123abcd").unwrap();
    PackageConfig::new(context, "1.2.3", QT_VERSION, descriptor, tmp_dir).unwrap()
}

pub fn write_file(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// Writes an executable shell script standing in for an external tool.
#[cfg(unix)]
pub fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    write_file(&path, &format!("#!/bin/sh\n{}\n", body));
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
