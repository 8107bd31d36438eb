//! External process execution.

use crate::error::{DeployError, Result};
use tokio::process::Command;

/// Renders a command line for diagnostics.
pub fn describe(command: &Command) -> String {
    let std = command.as_std();
    std::iter::once(std.get_program())
        .chain(std.get_args())
        .map(|part| part.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs `command` to completion and returns its stdout.
///
/// A spawn failure or nonzero exit becomes [`DeployError::ExternalTool`]
/// carrying the tool's own output.
pub async fn run(command: &mut Command) -> Result<String> {
    let line = describe(command);
    log::debug!("Running {}", line);

    let output = command
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| DeployError::ExternalTool {
            command: line.clone(),
            status: "spawn failed".to_string(),
            output: e.to_string(),
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);

    if !stderr.trim().is_empty() {
        log::debug!("{} stderr:\n{}", line, stderr.trim_end());
    }

    if !output.status.success() {
        let diagnostic = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        return Err(DeployError::ExternalTool {
            command: line,
            status: output.status.to_string(),
            output: diagnostic,
        });
    }

    Ok(stdout)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout() {
        let out = run(Command::new("sh").args(["-c", "echo hello"]))
            .await
            .unwrap();
        assert_eq!(out.trim(), "hello");
    }

    #[tokio::test]
    async fn nonzero_exit_keeps_diagnostics() {
        let err = run(Command::new("sh").args(["-c", "echo broken >&2; exit 3"]))
            .await
            .unwrap_err();
        match err {
            DeployError::ExternalTool {
                command, output, ..
            } => {
                assert!(command.starts_with("sh -c"));
                assert_eq!(output, "broken");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_binary_is_external_tool_error() {
        let err = run(&mut Command::new("/nonexistent/qtifw-tool"))
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::ExternalTool { .. }));
    }
}
