//! cp command - Copy between the local filesystem and the store
//!
//! The direction follows from the two paths: an existing local source is
//! uploaded, a remote source is downloaded into an existing local directory.
//! A trailing `/` on the source copies its contents instead of the directory
//! itself.

use clap::Args;
use serde::Serialize;

use super::{ConnectOptions, connect, fail};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, TransferSpinner};

/// Copy files to or from the store
#[derive(Args, Debug)]
pub struct CpArgs {
    /// Source path (local file or directory, or /container[/path])
    pub source: String,

    /// Destination path (/container[/path], or an existing local directory)
    pub destination: String,
}

#[derive(Debug, Serialize)]
struct CpOutput<'a> {
    status: &'static str,
    source: &'a str,
    destination: &'a str,
    transferred: usize,
}

/// Execute the cp command
pub async fn execute(
    args: CpArgs,
    options: &ConnectOptions,
    output_config: OutputConfig,
) -> ExitCode {
    let formatter = Formatter::new(output_config);
    match run(&args, options, &formatter).await {
        Ok(transferred) => {
            if formatter.is_json() {
                formatter.json(&CpOutput {
                    status: "success",
                    source: &args.source,
                    destination: &args.destination,
                    transferred,
                });
            } else {
                formatter.success(&format!(
                    "{} -> {} ({transferred} transferred)",
                    args.source, args.destination
                ));
            }
            ExitCode::Success
        }
        Err(e) => fail(&formatter, e),
    }
}

async fn run(
    args: &CpArgs,
    options: &ConnectOptions,
    formatter: &Formatter,
) -> anyhow::Result<usize> {
    let mut transfers = connect(options)?;

    let spinner = TransferSpinner::new(formatter.config(), &format!("Copying {}", args.source));
    if let Some(progress) = spinner.progress_fn() {
        transfers = transfers.with_progress(progress);
    }

    let transferred = transfers.copy(&args.source, &args.destination).await;
    spinner.finish_and_clear();
    Ok(transferred?)
}
