//! Error types for qtifw_deploy operations.
//!
//! Every failure is fatal for a run. The CLI prints the message and the
//! recovery suggestions, then exits with a nonzero status.

use std::fmt::Display;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for qtifw_deploy operations
pub type Result<T> = std::result::Result<T, DeployError>;

/// Main error type for all qtifw_deploy operations
#[derive(Error, Debug)]
pub enum DeployError {
    /// The trigger ref is not of the form `refs/<kind>/<name>`
    #[error("Unexpected GitHub ref format: {reference}")]
    RefFormat {
        /// The offending ref
        reference: String,
    },

    /// The repository slug is not of the form `owner/repo`
    #[error("Invalid repository '{repository}'. Expected: owner/repo")]
    RepositoryFormat {
        /// The offending repository slug
        repository: String,
    },

    /// Deploy descriptor missing from the source tree
    #[error("Deploy descriptor not found at {path}")]
    ManifestNotFound {
        /// Path where the descriptor was expected
        path: PathBuf,
    },

    /// Deploy descriptor exists but is malformed
    #[error("Failed to parse deploy descriptor {path}: {reason}")]
    ManifestParse {
        /// Path of the descriptor
        path: PathBuf,
        /// Parser diagnostic
        reason: String,
    },

    /// No release exists for the tag
    #[error("No release found for tag '{tag}' in {owner}/{repo}")]
    ReleaseNotFound {
        /// Repository owner
        owner: String,
        /// Repository name
        repo: String,
        /// Requested tag
        tag: String,
    },

    /// A package asset is not attached to the release
    #[error("Release has no asset named '{name}'")]
    UnknownAsset {
        /// Asset file name
        name: String,
    },

    /// External process exited with a nonzero status or could not be spawned
    #[error("Command '{command}' failed ({status}): {output}")]
    ExternalTool {
        /// Command line that was run
        command: String,
        /// Exit status description
        status: String,
        /// Diagnostic output of the tool
        output: String,
    },

    /// Host builds are declared but no requested platform provides them
    #[error("None of the provided packages provides host tools for {os}")]
    NoHostTool {
        /// Target OS of the repository
        os: String,
    },

    /// A package was requested before the base package was staged
    #[error("Package '{package}' requested before the base package")]
    PackageOrder {
        /// Id of the requested package
        package: String,
    },

    /// The repository's update log could not be extended
    #[error("Malformed update log {path}: {reason}")]
    UpdateLog {
        /// Path of `Updates.xml`
        path: PathBuf,
        /// What is wrong with it
        reason: String,
    },

    /// Qt version unusable for package ids
    #[error("Invalid version '{version}': {reason}")]
    Version {
        /// Version string
        version: String,
        /// What is wrong with it
        reason: String,
    },

    /// Invalid command line or environment input
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// File system error with path context
    #[error("{context} {path}: {error}")]
    Fs {
        /// Operation that failed, e.g. "reading descriptor"
        context: &'static str,
        /// Path that was being accessed
        path: PathBuf,
        /// The underlying I/O error
        error: io::Error,
    },

    /// Error with context
    #[error("{0}: {1}")]
    Context(String, Box<Self>),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// HTTP errors from the release API or asset downloads
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// ZIP extraction errors
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Directory traversal errors
    #[error("{0}")]
    Walkdir(#[from] walkdir::Error),

    /// Path prefix stripping error
    #[error("{0}")]
    StripPrefix(#[from] std::path::StripPrefixError),

    /// Invalid regular expression
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// Invalid glob pattern
    #[error("Glob error: {0}")]
    Glob(#[from] glob::PatternError),

    /// Install script template parsing error
    #[error("Template error: {0}")]
    Template(#[from] handlebars::TemplateError),

    /// Install script rendering error
    #[error("Render error: {0}")]
    Render(#[from] handlebars::RenderError),

    /// Invalid download URL
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl DeployError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            DeployError::RefFormat { .. } => vec![
                "Run the deployment from a tag push: refs/tags/<version>".to_string(),
            ],
            DeployError::ManifestNotFound { .. } => vec![
                "Add a deploy.json to the repository root".to_string(),
            ],
            DeployError::ManifestParse { .. } => vec![
                "deploy.json needs title, description, modules and license".to_string(),
            ],
            DeployError::ReleaseNotFound { tag, .. } => vec![
                format!("Create a GitHub release for tag '{}'", tag),
                "Check that the token can read releases of this repository".to_string(),
            ],
            DeployError::UnknownAsset { name } => vec![
                format!("Upload '{}' to the release", name),
                "Exclude the platform with --excludes if it is not built".to_string(),
            ],
            DeployError::NoHostTool { os } => vec![
                format!("Build at least one cross platform hosted on {}", os),
                "Remove 'hostbuilds' from deploy.json if no host tools are shipped".to_string(),
            ],
            DeployError::ExternalTool { .. } => vec![
                "Check the tool output above for specific details".to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }
}

/// Trait for adding context to errors.
pub trait Context<T> {
    /// Add context to an error.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static;

    /// Add context to an error using a closure.
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T> Context<T> for Result<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.map_err(|e| DeployError::Context(context.to_string(), Box::new(e)))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| DeployError::Context(f().to_string(), Box::new(e)))
    }
}

/// Extension trait for filesystem operations with automatic path context.
pub trait ErrorExt<T> {
    /// Add filesystem context to an I/O error.
    ///
    /// The `context` should be a present-tense verb phrase describing the operation,
    /// e.g., "reading file", "creating directory", "copying binary".
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, io::Error> {
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|error| DeployError::Fs {
            context,
            path: path.into(),
            error,
        })
    }
}
