//! Bulk transfers between the local filesystem and the store
//!
//! Tree uploads, tree downloads and tree deletions first enumerate every
//! per-object job, then run them as one bounded, fail-fast batch.

mod batch;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use md5::{Digest, Md5};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info};

use crate::config::TransferLimits;
use crate::error::{Error, Result};
use crate::listing::{ContainerEntry, list_containers};
use crate::path::{ParsedPath, PathKind, RemotePath, has_trailing_slash};
use crate::resolver::trim_etag;
use crate::traits::{CONTENT_LENGTH, CONTENT_TYPE, ETAG, ObjectStore, Request, RequestBody};

use batch::TransferBatch;

const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// One unit of work of a batch
#[derive(Debug, Clone)]
pub enum TransferJob {
    Upload {
        source: PathBuf,
        destination: RemotePath,
    },
    Download {
        source: RemotePath,
        destination: PathBuf,
    },
    Delete {
        target: RemotePath,
    },
}

impl fmt::Display for TransferJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferJob::Upload {
                source,
                destination,
            } => write!(f, "{} -> {}", source.display(), destination),
            TransferJob::Download {
                source,
                destination,
            } => write!(f, "{} -> {}", source, destination.display()),
            TransferJob::Delete { target } => write!(f, "delete {target}"),
        }
    }
}

/// Called after every completed job
pub type ProgressFn = Arc<dyn Fn(&TransferJob) + Send + Sync>;

/// Transfer orchestrator bound to one store
#[derive(Clone)]
pub struct Transfers {
    store: Arc<dyn ObjectStore>,
    limits: TransferLimits,
    progress: Option<ProgressFn>,
}

impl Transfers {
    pub fn new(store: Arc<dyn ObjectStore>, limits: TransferLimits) -> Self {
        Self {
            store,
            limits: limits.normalized(),
            progress: None,
        }
    }

    /// Report each completed job to `progress`
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    /// Create a container unless it already exists
    ///
    /// `name` is a single path component, with or without a leading `/`.
    pub async fn add_container(&self, name: &str) -> Result<()> {
        let container = RemotePath::new(name);
        if container.is_root() {
            return Err(Error::MissingContainerSpecifier);
        }
        if container.key().is_some() {
            return Err(Error::InvalidPath(format!(
                "{name}: a container name cannot contain '/'"
            )));
        }
        let resource = container.container_path().resource().to_string();

        let response = self.store.call(Request::head(resource.clone())).await?;
        response.expect(&[200, 203, 204, 404])?;
        if !response.is_not_found() {
            return Ok(());
        }

        debug!(container = container.container(), "creating container");
        let response = self.store.call(Request::put(resource)).await?;
        response.expect(&[201, 202, 204])
    }

    pub async fn list_containers(&self) -> Result<Vec<ContainerEntry>> {
        list_containers(self.store.as_ref()).await
    }

    /// Upload one local file to `remote`, skipping it when the stored copy
    /// already has the same content hash
    ///
    /// Returns `false` when the upload was skipped.
    pub async fn upload_file(&self, local: &Path, remote: &RemotePath) -> Result<bool> {
        if remote.key().is_none() {
            return Err(Error::MissingContainerSpecifier);
        }
        self.add_container(remote.container()).await?;
        self.send_file(local, remote).await
    }

    /// Upload without ensuring the container first
    async fn send_file(&self, local: &Path, remote: &RemotePath) -> Result<bool> {
        let (etag, length) = file_md5(local).await?;

        let response = self.store.call(Request::head(remote.resource())).await?;
        response.expect(&[200, 203, 204, 404])?;
        if !response.is_not_found()
            && response.header_str(ETAG).map(trim_etag).as_deref() == Some(etag.as_str())
        {
            info!(path = %remote, "unchanged, skipping upload");
            return Ok(false);
        }

        let content_type = mime_guess::from_path(local).first_or_octet_stream();
        let request = Request::put(remote.resource())
            .header(CONTENT_LENGTH, length.to_string())?
            .header(ETAG, &etag)?
            .header(CONTENT_TYPE, content_type.essence_str())?
            .body(RequestBody::File(local.to_path_buf()));

        debug!(source = %local.display(), path = %remote, bytes = length, "uploading");
        let response = self.store.call(request).await?;
        response.expect(&[200, 201])?;
        Ok(true)
    }

    /// Stream one object into a local file, creating parent directories
    ///
    /// A folder marker (`key/`) becomes the directory `local` instead.
    pub async fn download_object(&self, remote: &RemotePath, local: &Path) -> Result<()> {
        if remote.is_marker() {
            debug!(path = %remote, destination = %local.display(), "creating folder");
            tokio::fs::create_dir_all(local).await?;
            return Ok(());
        }
        if let Some(parent) = local.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let response = self
            .store
            .call(Request::get(remote.resource()).streaming())
            .await?;
        response.expect(&[200])?;

        debug!(path = %remote, destination = %local.display(), "downloading");
        let mut file = tokio::fs::File::create(local).await?;
        let mut body = response.body.into_stream();
        while let Some(chunk) = body.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;
        Ok(())
    }

    pub async fn delete_object(&self, remote: &RemotePath) -> Result<()> {
        debug!(path = %remote, "deleting");
        let response = self.store.call(Request::delete(remote.resource())).await?;
        response.expect(&[200, 204])
    }

    /// Upload a file or a directory tree below the remote `destination`
    ///
    /// Returns the number of completed upload jobs.
    pub async fn put(&self, source: &str, destination: &str) -> Result<usize> {
        let root = std::path::absolute(source)?;
        if tokio::fs::metadata(&root).await.is_err() {
            return Err(Error::NotFound(source.to_string()));
        }
        let destination = RemotePath::new(destination);
        if destination.is_root() {
            return Err(Error::MissingContainerSpecifier);
        }

        let keep_root = !has_trailing_slash(source);
        let files = {
            let root = root.clone();
            tokio::task::spawn_blocking(move || collect_files(&root))
                .await
                .map_err(|e| Error::General(format!("Directory walk failed: {e}")))??
        };

        let jobs: Vec<TransferJob> = files
            .into_iter()
            .map(|file| {
                let remote = if file == root {
                    let name = root.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
                    destination.join(&name)
                } else {
                    let relative = file.strip_prefix(&root).unwrap_or(&file);
                    let root_name = root.file_name().map(|n| n.to_string_lossy());
                    upload_destination(
                        &destination,
                        if keep_root { root_name.as_deref() } else { None },
                        relative,
                    )
                };
                TransferJob::Upload {
                    source: file,
                    destination: remote,
                }
            })
            .collect();

        self.add_container(destination.container()).await?;
        self.run_batch("upload", self.limits.upload_slots, jobs).await
    }

    /// Download a container, a virtual folder or an object into the local
    /// directory `destination`
    pub async fn download_path(&self, source: &str, destination: &str) -> Result<usize> {
        let mut remote = RemotePath::new(source);
        if remote.is_root() {
            return Err(Error::MissingContainerSpecifier);
        }
        let local_root = PathBuf::from(destination);
        if tokio::fs::metadata(&local_root).await.is_err() {
            return Err(Error::NotFound(destination.to_string()));
        }

        let keep_root = !has_trailing_slash(source);
        let kind = remote.classify(self.store.as_ref()).await?;

        let jobs: Vec<TransferJob> = match kind {
            PathKind::Object => {
                let key = remote.key().unwrap_or_default();
                let destination = download_destination(&remote, keep_root, key, &local_root)?;
                vec![TransferJob::Download {
                    source: remote,
                    destination,
                }]
            }
            PathKind::Container | PathKind::VirtualFolder => remote
                .children_objects(self.store.as_ref())
                .await?
                .into_iter()
                .map(|entry| {
                    Ok(TransferJob::Download {
                        destination: download_destination(
                            &remote,
                            keep_root,
                            &entry.name,
                            &local_root,
                        )?,
                        source: RemotePath::listed(remote.container(), &entry.name),
                    })
                })
                .collect::<Result<_>>()?,
            PathKind::Root => return Err(Error::UnsupportedPathKind(remote.name().to_string())),
        };

        self.run_batch("download", self.limits.download_slots, jobs).await
    }

    /// Delete an object, every object below a virtual folder, or a container
    ///
    /// A container is emptied and then removed itself, unless `path` ends with
    /// a separator, in which case only its content is deleted.
    pub async fn delete_path(&self, path: &str) -> Result<usize> {
        let keep_container = has_trailing_slash(path);
        let mut remote = RemotePath::new(path);
        if remote.is_root() {
            return Err(Error::UnsupportedPathKind(remote.name().to_string()));
        }

        match remote.classify(self.store.as_ref()).await? {
            PathKind::Root => Err(Error::UnsupportedPathKind(remote.name().to_string())),
            PathKind::Object => {
                let jobs = vec![TransferJob::Delete { target: remote }];
                self.run_batch("delete", self.limits.delete_slots, jobs).await
            }
            PathKind::VirtualFolder => {
                let jobs = self.delete_jobs(&remote).await?;
                if jobs.is_empty() {
                    return Err(Error::NotFound(remote.name().to_string()));
                }
                self.run_batch("delete", self.limits.delete_slots, jobs).await
            }
            PathKind::Container => {
                let jobs = self.delete_jobs(&remote).await?;
                let mut deleted = self
                    .run_batch("delete", self.limits.delete_slots, jobs)
                    .await?;
                if !keep_container {
                    self.delete_object(&remote).await?;
                    deleted += 1;
                }
                Ok(deleted)
            }
        }
    }

    async fn delete_jobs(&self, remote: &RemotePath) -> Result<Vec<TransferJob>> {
        Ok(remote
            .children_objects(self.store.as_ref())
            .await?
            .into_iter()
            .map(|entry| TransferJob::Delete {
                target: RemotePath::listed(remote.container(), &entry.name),
            })
            .collect())
    }

    /// Copy between the local filesystem and the store
    ///
    /// A side is local when it exists on the local filesystem.
    pub async fn copy(&self, source: &str, destination: &str) -> Result<usize> {
        match (ParsedPath::detect(source), ParsedPath::detect(destination)) {
            (ParsedPath::Local(_), ParsedPath::Remote(_)) => self.put(source, destination).await,
            (ParsedPath::Remote(_), ParsedPath::Local(_)) => {
                self.download_path(source, destination).await
            }
            (ParsedPath::Remote(_), ParsedPath::Remote(_)) => Err(Error::UnsupportedOperation(
                "copy between two remote paths".to_string(),
            )),
            (ParsedPath::Local(_), ParsedPath::Local(_)) => Err(Error::UnsupportedOperation(
                "copy between two local paths, use a local copy tool".to_string(),
            )),
        }
    }

    async fn run_batch(
        &self,
        label: &'static str,
        slots: usize,
        jobs: Vec<TransferJob>,
    ) -> Result<usize> {
        info!(batch = label, jobs = jobs.len(), slots, "starting batch");
        let transfers = self.clone();
        TransferBatch::new(label, slots)
            .run(jobs, move |job| {
                let transfers = transfers.clone();
                async move { transfers.run_job(job).await }
            })
            .await
    }

    async fn run_job(&self, job: TransferJob) -> Result<()> {
        match &job {
            TransferJob::Upload {
                source,
                destination,
            } => {
                self.send_file(source, destination).await?;
            }
            TransferJob::Download {
                source,
                destination,
            } => self.download_object(source, destination).await?,
            TransferJob::Delete { target } => self.delete_object(target).await?,
        }
        if let Some(progress) = &self.progress {
            progress(&job);
        }
        Ok(())
    }
}

/// Local path a listed `key` is written to when downloading `source` into
/// `destination`
///
/// With `keep_root` the last component of `source` is kept as a directory
/// level; without it the content of `source` lands directly in `destination`.
/// An object source always lands as `destination/<base name>`. Keys with `.`
/// or `..` components are refused so nothing is written outside
/// `destination`.
pub fn download_destination(
    source: &RemotePath,
    keep_root: bool,
    key: &str,
    destination: &Path,
) -> Result<PathBuf> {
    let (mut path, relative) = if source.kind() == Some(PathKind::Object) {
        (destination.to_path_buf(), key.rsplit('/').next().unwrap_or(key))
    } else {
        let base = if keep_root {
            destination.join(source.base_name())
        } else {
            destination.to_path_buf()
        };
        (base, key.strip_prefix(source.prefix().as_str()).unwrap_or(key))
    };

    for part in relative.split('/').filter(|part| !part.is_empty()) {
        if part == "." || part == ".." || part.contains(std::path::MAIN_SEPARATOR) {
            return Err(Error::InvalidPath(format!(
                "{key}: key cannot be stored below {}",
                destination.display()
            )));
        }
        path.push(part);
    }
    Ok(path)
}

/// Remote path a file at `relative` (below the uploaded directory) is stored
/// at; `root_name` is the uploaded directory's own name when it is kept
pub fn upload_destination(
    destination: &RemotePath,
    root_name: Option<&str>,
    relative: &Path,
) -> RemotePath {
    let mut key: Vec<String> = root_name.map(str::to_string).into_iter().collect();
    key.extend(
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );
    destination.join(&key.join("/"))
}

/// Every regular file at or below `root`
fn collect_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root) {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Lowercase hex MD5 and length of a local file
pub async fn file_md5(path: &Path) -> Result<(String, u64)> {
    let mut file = tokio::fs::File::open(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(path.display().to_string())
        } else {
            Error::Io(e)
        }
    })?;

    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];
    let mut length = 0u64;
    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
        length += read as u64;
    }
    Ok((format!("{:x}", hasher.finalize()), length))
}
