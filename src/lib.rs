//! # qtifw_deploy
//!
//! Deploys tagged releases of Qt modules as Qt installer framework
//! repositories.
//!
//! A run downloads the release of a tag, stages one base package plus a
//! package per platform build, source tree, documentation and examples, and
//! lets `repogen` merge them into a `linux_x64`, `windows_x86` and `mac_x64`
//! repository on a host mounted over sshfs.
//!
//! ## Usage
//!
//! ```bash
//! qtifw_deploy --ref refs/tags/1.2.3 --repository Owner/QtFoo --version 5.13.0 \
//!     --host deploy@example.com:/var/www/qt --key "$DEPLOY_KEY"
//! qtifw_deploy --ref refs/tags/1.2.3 --repository Owner/QtFoo --version 5.13.0 \
//!     --no-mount --deploy-dir ./repos --excludes 'winrt|ios'
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod cli;
pub mod config;
pub mod error;
pub mod github;
pub mod packager;
pub mod platform;
pub mod publish;
pub mod uploader;
pub mod utils;

pub use cli::Args;
pub use config::{Descriptor, PackageConfig, RepoContext};
pub use error::{DeployError, Result};
pub use github::{AssetSource, ReleaseClient};
pub use packager::{Packager, StagingLayout};
pub use platform::HostOs;
pub use uploader::Uploader;
