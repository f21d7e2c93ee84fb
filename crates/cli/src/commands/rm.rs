//! rm command - Remove objects, folders and containers
//!
//! A container path removes the container after emptying it; a trailing `/`
//! only empties it.

use clap::Args;
use serde::Serialize;

use super::{ConnectOptions, connect, fail};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, TransferSpinner};

/// Remove objects, folders or containers
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Path(s) to remove (/container/object, /container/folder, /container[/])
    #[arg(required = true)]
    pub paths: Vec<String>,
}

#[derive(Debug, Serialize)]
struct RmOutput {
    status: &'static str,
    path: String,
    deleted: usize,
}

/// Execute the rm command
pub async fn execute(
    args: RmArgs,
    options: &ConnectOptions,
    output_config: OutputConfig,
) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let transfers = match connect(options) {
        Ok(transfers) => transfers,
        Err(e) => return fail(&formatter, e),
    };

    for path in &args.paths {
        let spinner = TransferSpinner::new(formatter.config(), &format!("Removing {path}"));
        let transfers = match spinner.progress_fn() {
            Some(progress) => transfers.clone().with_progress(progress),
            None => transfers.clone(),
        };

        let result = transfers.delete_path(path).await;
        spinner.finish_and_clear();

        match result {
            Ok(deleted) => {
                if formatter.is_json() {
                    formatter.json(&RmOutput {
                        status: "success",
                        path: path.clone(),
                        deleted,
                    });
                } else if deleted == 0 {
                    formatter.warning(&format!("Nothing to remove under {path}"));
                } else {
                    formatter.success(&format!("Removed {path} ({deleted} deleted)."));
                }
            }
            Err(e) => return fail(&formatter, e.into()),
        }
    }

    ExitCode::Success
}
