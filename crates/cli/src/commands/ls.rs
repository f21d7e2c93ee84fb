//! ls command - List one hierarchy level
//!
//! Lists containers at the root, folders and objects below a container or a
//! folder, and the object itself for an object path.

use clap::Args;
use serde::Serialize;

use sfs_core::{PathKind, RemotePath};

use super::{ConnectOptions, connect, fail};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, human_size, listing_date};

/// List containers, folders and objects
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Remote path (/ or /container[/folder...])
    #[arg(default_value = "/")]
    pub path: String,

    /// Print totals after the listing
    #[arg(long)]
    pub summarize: bool,
}

#[derive(Debug, Serialize)]
struct LsOutput<'a> {
    path: &'a str,
    kind: Option<PathKind>,
    items: &'a [RemotePath],
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<Summary>,
}

#[derive(Debug, Serialize)]
struct Summary {
    total_items: usize,
    total_size_bytes: u64,
    total_size_human: String,
}

/// Execute the ls command
pub async fn execute(
    args: LsArgs,
    options: &ConnectOptions,
    output_config: OutputConfig,
) -> ExitCode {
    let formatter = Formatter::new(output_config);
    match run(&args, options, &formatter).await {
        Ok(()) => ExitCode::Success,
        Err(e) => fail(&formatter, e),
    }
}

async fn run(args: &LsArgs, options: &ConnectOptions, formatter: &Formatter) -> anyhow::Result<()> {
    let transfers = connect(options)?;
    let mut path = RemotePath::new(&args.path);
    let children = path.list_children(transfers.store()).await?;

    let total_size: u64 = children.iter().map(|c| c.bytes).sum();
    let summary = args.summarize.then(|| Summary {
        total_items: children.len(),
        total_size_bytes: total_size,
        total_size_human: human_size(total_size),
    });

    if formatter.is_json() {
        formatter.json(&LsOutput {
            path: path.name(),
            kind: path.kind(),
            items: &children,
            summary,
        });
        return Ok(());
    }

    for child in &children {
        formatter.println(&format_row(child));
    }
    if let Some(summary) = summary {
        formatter.println(&format!(
            "\nTotal: {} items, {}",
            summary.total_items, summary.total_size_human
        ));
    }
    Ok(())
}

/// `[date] size name`, folders and containers suffixed with `/`
fn format_row(child: &RemotePath) -> String {
    let folder = child.kind().is_some_and(PathKind::is_folder_like);
    let suffix = if folder { "/" } else { "" };
    format!(
        "[{}] {:>10} {}{suffix}",
        listing_date(child.last_modified),
        human_size(child.bytes),
        child.base_name()
    )
}
