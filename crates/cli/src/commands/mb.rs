//! mb command - Make container
//!
//! Creates a container unless it already exists.

use clap::Args;
use serde::Serialize;

use sfs_core::RemotePath;

use super::{ConnectOptions, connect, fail};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Create a container
#[derive(Args, Debug)]
pub struct MbArgs {
    /// Container name (with or without a leading /)
    pub container: String,
}

#[derive(Debug, Serialize)]
struct MbOutput<'a> {
    status: &'static str,
    container: &'a str,
}

/// Execute the mb command
pub async fn execute(
    args: MbArgs,
    options: &ConnectOptions,
    output_config: OutputConfig,
) -> ExitCode {
    let formatter = Formatter::new(output_config);
    match run(&args, options).await {
        Ok(path) => {
            if formatter.is_json() {
                formatter.json(&MbOutput {
                    status: "success",
                    container: path.container(),
                });
            } else {
                formatter.success(&format!("Container '{}' is ready.", path.container()));
            }
            ExitCode::Success
        }
        Err(e) => fail(&formatter, e),
    }
}

async fn run(args: &MbArgs, options: &ConnectOptions) -> anyhow::Result<RemotePath> {
    let transfers = connect(options)?;
    transfers.add_container(&args.container).await?;
    Ok(RemotePath::new(&args.container))
}
