//! Command execution.

mod deploy;

use crate::cli::{Args, OutputManager};
use crate::error::Result;

pub use deploy::execute_deploy;

/// Execute the deployment described by `args`, returning the exit code.
pub async fn execute_command(args: Args) -> Result<i32> {
    let output = OutputManager::new(args.verbose, args.quiet);
    execute_deploy(&args, &output).await
}
