//! Command line argument parsing and validation.
//!
//! Every input can also come from the environment of a CI job, which is how
//! the tool is normally run: the workflow exports `GITHUB_*` and the action
//! inputs as `INPUT_*`.

use crate::error::{DeployError, Result};
use crate::github::DEFAULT_API_URL;
use clap::Parser;
use regex::Regex;
use std::path::PathBuf;

/// Deploy a tagged Qt module release as Qt installer framework repositories
#[derive(Parser, Debug, Clone)]
#[command(
    name = "qtifw_deploy",
    disable_version_flag = true,
    about = "Deploy a tagged Qt module release as Qt installer framework repositories",
    long_about = "Downloads the release of a tag, turns its sources and per-platform build \
archives into installer framework packages and generates linux_x64, windows_x86 and mac_x64 \
repositories on the remote host.

Usage:
  qtifw_deploy --ref refs/tags/1.2.3 --repository Owner/QtFoo --version 5.13.0 \\
    --host deploy@example.com:/var/www/qt --key \"$DEPLOY_KEY\""
)]
pub struct Args {
    /// Release API token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Qt version the module was built against, e.g. 5.13.0
    #[arg(long = "version", env = "INPUT_VERSION", value_name = "QT_VERSION")]
    pub qt_version: Option<String>,

    /// Regex of platforms to leave out, e.g. "winrt|ios"
    #[arg(long, env = "INPUT_EXCLUDES")]
    pub excludes: Option<String>,

    /// sshfs remote, e.g. user@host:/path
    #[arg(long, env = "INPUT_HOST")]
    pub host: Option<String>,

    /// Private key for the remote
    #[arg(long, env = "INPUT_KEY", hide_env_values = true)]
    pub key: Option<String>,

    /// ssh port of the remote
    #[arg(long, env = "INPUT_PORT")]
    pub port: Option<String>,

    /// Ref the run was triggered for; only refs/tags/<version> deploys
    #[arg(long = "ref", env = "GITHUB_REF", value_name = "REF")]
    pub reference: String,

    /// Repository as owner/repo
    #[arg(long, env = "GITHUB_REPOSITORY")]
    pub repository: Option<String>,

    /// Commit the run was triggered for
    #[arg(long, env = "GITHUB_SHA", default_value = "")]
    pub sha: String,

    /// Mount point and root of the generated repositories
    #[arg(long, default_value = "qt-deploy")]
    pub deploy_dir: PathBuf,

    /// Scratch directory for downloads and staging [default: <tmp>/qt-deploy-work]
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Repository generator binary [default: repogen from PATH]
    #[arg(long)]
    pub repogen: Option<PathBuf>,

    /// 7z compatible archiver
    #[arg(long, default_value = "7z")]
    pub archivegen: PathBuf,

    /// Release API base URL
    #[arg(long, default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Use the deploy dir as a local directory instead of mounting the remote
    #[arg(long)]
    pub no_mount: bool,

    /// Show debug output
    #[arg(short, long)]
    pub verbose: bool,

    /// Only show warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

fn missing(what: &str) -> DeployError {
    DeployError::InvalidArguments {
        reason: format!("{} is required", what),
    }
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Checks the inputs a deployment needs.
    ///
    /// Only called for tag refs, so non-tag runs succeed without them.
    pub fn validate(&self) -> Result<()> {
        if self.qt_version.as_deref().is_none_or(str::is_empty) {
            return Err(missing("--version (INPUT_VERSION)"));
        }
        if self.repository.as_deref().is_none_or(str::is_empty) {
            return Err(missing("--repository (GITHUB_REPOSITORY)"));
        }
        if !self.no_mount {
            if self.host.as_deref().is_none_or(str::is_empty) {
                return Err(missing("--host (INPUT_HOST)"));
            }
            if self.key.as_deref().is_none_or(str::is_empty) {
                return Err(missing("--key (INPUT_KEY)"));
            }
        }
        self.exclude_pattern()?;
        Ok(())
    }

    /// Compiled `--excludes`; empty means nothing is excluded.
    pub fn exclude_pattern(&self) -> Result<Option<Regex>> {
        match self.excludes.as_deref() {
            Some(pattern) if !pattern.is_empty() => Ok(Some(Regex::new(pattern)?)),
            _ => Ok(None),
        }
    }

    /// Scratch directory of the run.
    pub fn work_dir(&self) -> PathBuf {
        self.work_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("qt-deploy-work"))
    }

    /// Repository generator to run.
    pub fn repogen_path(&self) -> Result<PathBuf> {
        match &self.repogen {
            Some(path) => Ok(path.clone()),
            None => which::which("repogen").map_err(|e| DeployError::ExternalTool {
                command: "repogen".to_string(),
                status: "not found".to_string(),
                output: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["qtifw_deploy", "--ref", "refs/tags/1.0.0"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn version_flag_is_the_qt_version() {
        let args = parse(&["--version", "5.13.0"]);
        assert_eq!(args.qt_version.as_deref(), Some("5.13.0"));
    }

    #[test]
    fn mount_inputs_required_unless_no_mount() {
        let args = parse(&["--version", "5.13.0", "--repository", "o/QtFoo"]);
        assert!(args.validate().unwrap_err().to_string().contains("--host"));

        let args = parse(&["--version", "5.13.0", "--repository", "o/QtFoo", "--no-mount"]);
        args.validate().unwrap();
    }

    #[test]
    fn empty_excludes_exclude_nothing() {
        let args = parse(&["--excludes", ""]);
        assert!(args.exclude_pattern().unwrap().is_none());

        let args = parse(&["--excludes", "winrt|ios"]);
        assert!(args.exclude_pattern().unwrap().unwrap().is_match("ios"));
    }

    #[test]
    fn invalid_excludes_fail_validation() {
        let args = parse(&["--version", "5.13.0", "--repository", "o/r", "--no-mount", "--excludes", "("]);
        assert!(matches!(args.validate(), Err(DeployError::Regex(_))));
    }
}
