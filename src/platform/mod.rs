//! Platform catalog for Qt module deployments.
//!
//! A platform token names one Qt build target (`gcc_64`, `msvc2017_64`,
//! `android_armv7`, ...) or one of the basic pseudo-platforms `src`, `doc` and
//! `examples`, which are packaged through the same pipeline but never take part
//! in architecture mapping or host tool classification.
//!
//! # Host OS Families
//!
//! | Family | Repositories | Host tools built on |
//! |--------|--------------|---------------------|
//! | `gcc` | linux | - |
//! | `msvc`, `mingw` | windows | - |
//! | `clang` | mac | - |
//! | `android`, `wasm` | linux, windows, mac | linux |
//! | `winrt` | windows | windows |
//! | `ios` | mac | mac |

use crate::error::{DeployError, Result};
use regex::Regex;
use std::fmt;
use std::str::FromStr;

/// Basic pseudo-platforms, in catalog order.
pub const BASIC_PLATFORMS: [&str; 3] = ["src", "doc", "examples"];

/// Every supported platform token. Basic pseudo-platforms come first.
const CATALOG: &[&str] = &[
    "src",
    "doc",
    "examples",
    "gcc_64",
    "android_arm64_v8a",
    "android_x86_64",
    "android_armv7",
    "android_x86",
    "wasm_32",
    "msvc2017_64",
    "msvc2017",
    "winrt_x64_msvc2017",
    "winrt_x86_msvc2017",
    "winrt_armv7_msvc2017",
    "mingw73_64",
    "mingw73_32",
    "clang_64",
    "ios",
];

/// Legacy toolchain renames used by the upstream Qt repositories.
const ARCH_OVERRIDES: &[(&str, &str)] = &[
    ("mingw73_64", "win64_mingw73"),
    ("mingw73_32", "win32_mingw73"),
    ("msvc2017_64", "win64_msvc2017_64"),
    ("msvc2017", "win32_msvc2017"),
    ("winrt_x86_msvc2017", "win64_msvc2017_winrt_x86"),
    ("winrt_x64_msvc2017", "win64_msvc2017_winrt_x64"),
    ("winrt_armv7_msvc2017", "win64_msvc2017_winrt_armv7"),
];

/// Platforms patched with the embedded variant of the Qt patcher.
const EMBEDDED_PLATFORMS: &[&str] = &[
    "android_arm64_v8a",
    "android_armv7",
    "android_x86",
    "ios",
    "winrt_x86_msvc2017",
    "winrt_x64_msvc2017",
    "winrt_armv7_msvc2017",
];

/// Operating system a repository is generated for.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum HostOs {
    /// Linux repositories (`linux_x64`)
    Linux,
    /// Windows repositories (`windows_x86`)
    Windows,
    /// macOS repositories (`mac_x64`)
    Mac,
}

impl HostOs {
    /// All repository operating systems, in deployment order.
    pub const ALL: [HostOs; 3] = [HostOs::Linux, HostOs::Windows, HostOs::Mac];

    /// Lowercase identifier used in repository paths and install scripts.
    pub fn as_str(&self) -> &'static str {
        match self {
            HostOs::Linux => "linux",
            HostOs::Windows => "windows",
            HostOs::Mac => "mac",
        }
    }

    /// Architecture suffix of the upstream online repository for this OS.
    pub fn repo_arch(&self) -> &'static str {
        match self {
            HostOs::Linux => "x64",
            HostOs::Windows => "x86",
            HostOs::Mac => "x64",
        }
    }

    fn is_native(&self, token: &str) -> bool {
        match self {
            HostOs::Linux => token.contains("gcc"),
            HostOs::Windows => token.contains("msvc") || token.contains("mingw"),
            HostOs::Mac => token.contains("clang"),
        }
    }

    // Cross families whose host tools are built on this OS.
    fn provides_host_tools(&self, token: &str) -> bool {
        match self {
            HostOs::Linux => token.contains("android") || token.contains("wasm"),
            HostOs::Windows => token.contains("winrt"),
            HostOs::Mac => token.contains("ios"),
        }
    }
}

impl fmt::Display for HostOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HostOs {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "linux" => Ok(HostOs::Linux),
            "windows" => Ok(HostOs::Windows),
            "mac" => Ok(HostOs::Mac),
            other => Err(DeployError::InvalidArguments {
                reason: format!("Unsupported os: {}", other),
            }),
        }
    }
}

/// Patch style handed to the installer's Qt patch operation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PatchStyle {
    /// Desktop Qt builds
    Standard,
    /// Embedded and mobile Qt builds
    Embedded,
}

impl PatchStyle {
    /// String understood by the installer's `QtPatch` operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PatchStyle::Standard => "qt5",
            PatchStyle::Embedded => "emb-arm-qt5",
        }
    }
}

impl fmt::Display for PatchStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true for `src`, `doc` and `examples`.
pub fn is_basic(token: &str) -> bool {
    BASIC_PLATFORMS.contains(&token)
}

/// Returns the catalog minus every token matched by `exclude`.
pub fn list_platforms(exclude: Option<&Regex>) -> Vec<&'static str> {
    CATALOG
        .iter()
        .copied()
        .filter(|token| exclude.is_none_or(|re| !re.is_match(token)))
        .collect()
}

/// Returns the tokens that belong into the repository for `os`.
///
/// Android and wasm builds are shipped on every OS, winrt only on windows and
/// ios only on mac.
pub fn platforms_for(os: HostOs, exclude: Option<&Regex>) -> Vec<&'static str> {
    list_platforms(exclude)
        .into_iter()
        .filter(|token| {
            is_basic(token)
                || os.is_native(token)
                || token.contains("android")
                || token.contains("wasm")
                || (os == HostOs::Windows && token.contains("winrt"))
                || (os == HostOs::Mac && token.contains("ios"))
        })
        .collect()
}

/// Maps a platform token to the architecture suffix of its package id.
pub fn package_arch(token: &str) -> &str {
    ARCH_OVERRIDES
        .iter()
        .find(|(from, _)| *from == token)
        .map_or(token, |(_, to)| to)
}

/// Returns the patch style used when installing `token`.
pub fn patch_style(token: &str) -> PatchStyle {
    if EMBEDDED_PLATFORMS.contains(&token) {
        PatchStyle::Embedded
    } else {
        PatchStyle::Standard
    }
}

/// Returns true if the binary asset for `token` is shipped as a zip archive.
pub fn is_zip_platform(token: &str) -> bool {
    token.contains("msvc") || token.contains("mingw")
}

/// Selects the platform whose build supplies host tools for `os`.
///
/// When several candidates qualify, the first one in catalog order wins.
/// That tie-break is arbitrary, not a property of the builds.
pub fn host_tool_platform<'a>(os: HostOs, candidates: &[&'a str]) -> Result<&'a str> {
    candidates
        .iter()
        .copied()
        .filter(|token| !is_basic(token) && os.provides_host_tools(token))
        .min_by_key(|token| catalog_index(token))
        .ok_or_else(|| DeployError::NoHostTool {
            os: os.to_string(),
        })
}

/// OS the host tools of a cross platform are built on.
///
/// Basic and native desktop tokens return `None`.
pub fn host_os_of(token: &str) -> Option<HostOs> {
    if is_basic(token) {
        return None;
    }
    HostOs::ALL
        .into_iter()
        .find(|os| os.provides_host_tools(token))
}

fn catalog_index(token: &str) -> usize {
    CATALOG
        .iter()
        .position(|t| *t == token)
        .unwrap_or(usize::MAX)
}
