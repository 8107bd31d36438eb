//! qtifw_deploy - deploy tagged Qt module releases as installer repositories.

use qtifw_deploy::cli;
use qtifw_deploy::cli::OutputManager;
use std::process;

#[tokio::main]
async fn main() {
    match cli::run().await {
        Ok(exit_code) => {
            process::exit(exit_code);
        }
        Err(e) => {
            let output = OutputManager::new(false, false);
            output.error(&format!("Fatal error: {e}"));

            let suggestions = e.recovery_suggestions();
            if !suggestions.is_empty() {
                output.indent("");
                output.indent("Recovery suggestions:");
                for suggestion in suggestions {
                    output.indent(&format!("  • {}", suggestion));
                }
            }

            process::exit(1);
        }
    }
}
