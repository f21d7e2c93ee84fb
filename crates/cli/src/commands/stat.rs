//! stat command - Show path type and metadata

use clap::Args;
use serde::Serialize;

use sfs_core::{PathKind, RemotePath};

use super::{ConnectOptions, connect, fail};
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, human_size};

/// Show the type and metadata of a path
#[derive(Args, Debug)]
pub struct StatArgs {
    /// Remote path (/, /container, /container/folder or /container/object)
    pub path: String,
}

#[derive(Debug, Serialize)]
struct StatOutput {
    name: String,
    kind: PathKind,
    size_bytes: u64,
    size_human: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    etag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
}

impl StatOutput {
    fn new(path: &RemotePath, kind: PathKind) -> Self {
        Self {
            name: path.name().to_string(),
            kind,
            size_bytes: path.bytes,
            size_human: human_size(path.bytes),
            count: matches!(kind, PathKind::Root | PathKind::Container).then_some(path.count),
            last_modified: path.last_modified.map(|ts| ts.to_string()),
            etag: path.etag.clone(),
            content_type: path.content_type.clone(),
        }
    }
}

/// Execute the stat command
pub async fn execute(
    args: StatArgs,
    options: &ConnectOptions,
    output_config: OutputConfig,
) -> ExitCode {
    let formatter = Formatter::new(output_config);
    match run(&args, options, &formatter).await {
        Ok(()) => ExitCode::Success,
        Err(e) => fail(&formatter, e),
    }
}

async fn run(
    args: &StatArgs,
    options: &ConnectOptions,
    formatter: &Formatter,
) -> anyhow::Result<()> {
    let transfers = connect(options)?;
    let mut path = RemotePath::new(&args.path);
    let kind = path.classify(transfers.store()).await?;
    let output = StatOutput::new(&path, kind);

    if formatter.is_json() {
        formatter.json(&output);
        return Ok(());
    }

    formatter.println(&format!("Name      : {}", output.name));
    formatter.println(&format!("Type      : {}", output.kind));
    if kind != PathKind::VirtualFolder {
        formatter.println(&format!(
            "Size      : {} ({} bytes)",
            output.size_human, output.size_bytes
        ));
    }
    if let Some(count) = output.count {
        let label = if kind == PathKind::Root { "Containers" } else { "Objects" };
        formatter.println(&format!("{label:<10}: {count}"));
    }
    if let Some(date) = &output.last_modified {
        formatter.println(&format!("Date      : {date}"));
    }
    if let Some(etag) = &output.etag {
        formatter.println(&format!("ETag      : {etag}"));
    }
    if let Some(content_type) = &output.content_type {
        formatter.println(&format!("Content   : {content_type}"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stat_output_for_container() {
        let mut path = RemotePath::with_kind("/box", PathKind::Container);
        path.count = 3;
        path.bytes = 1024;
        let output = StatOutput::new(&path, PathKind::Container);
        assert_eq!(output.count, Some(3));
        assert_eq!(output.size_human, "1 KiB");

        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["kind"], "container");
        assert!(json.get("etag").is_none());
    }

    #[test]
    fn test_stat_output_for_object() {
        let mut path = RemotePath::with_kind("/box/a.txt", PathKind::Object);
        path.etag = Some("0cc175b9c0f1b6a831c399e269772661".to_string());
        let output = StatOutput::new(&path, PathKind::Object);
        assert_eq!(output.count, None);
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["kind"], "object");
        assert_eq!(json["etag"], "0cc175b9c0f1b6a831c399e269772661");
    }
}
