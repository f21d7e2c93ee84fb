//! Path parsing and resolution
//!
//! Remote paths have the form `/container[/key...]`; the storage root is `/`.
//! The store itself has no directories, so whether a path names a container,
//! an object or a virtual folder is only known after classification (see
//! `resolver`). Local paths are passed through as-is.

use std::fmt;
use std::path::{Path, PathBuf};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// What a remote path denotes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathKind {
    /// The account: lists containers
    Root,
    /// A top-level bucket
    Container,
    /// A stored blob
    Object,
    /// A key prefix with objects under it but no object of its own
    VirtualFolder,
}

impl PathKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            PathKind::Root => "root",
            PathKind::Container => "container",
            PathKind::Object => "object",
            PathKind::VirtualFolder => "vfolder",
        }
    }

    /// Whether the kind can have children below it
    pub const fn is_folder_like(self) -> bool {
        !matches!(self, PathKind::Object)
    }
}

impl fmt::Display for PathKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized path into the store
///
/// Metadata fields are filled opportunistically by probes and listings and
/// stay empty until known. The kind is set at most once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemotePath {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<PathKind>,
    /// Content hash of an object
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Media type of an object
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Size in bytes (aggregated for containers and folders)
    pub bytes: u64,
    /// Number of children (containers, objects)
    pub count: u64,
    /// Last modification time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,
}

impl RemotePath {
    /// Create an unresolved path from raw user input
    pub fn new(raw: &str) -> Self {
        Self {
            name: normalize(raw),
            kind: None,
            etag: None,
            content_type: None,
            bytes: 0,
            count: 0,
            last_modified: None,
        }
    }

    /// Create a path whose kind is already known
    pub fn with_kind(raw: &str, kind: PathKind) -> Self {
        let mut path = Self::new(raw);
        path.kind = Some(kind);
        path
    }

    /// The storage root
    pub fn root() -> Self {
        Self::with_kind("/", PathKind::Root)
    }

    /// Cleaned absolute path, e.g. `/photos/2014/img.jpg`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cached kind, `None` until classified
    pub fn kind(&self) -> Option<PathKind> {
        self.kind
    }

    /// Record the kind unless one is already set; returns the effective kind
    pub(crate) fn settle_kind(&mut self, kind: PathKind) -> PathKind {
        *self.kind.get_or_insert(kind)
    }

    pub fn is_root(&self) -> bool {
        self.name == "/"
    }

    /// Request target for this path: empty for the account, the name otherwise
    pub fn resource(&self) -> &str {
        if self.is_root() { "" } else { &self.name }
    }

    /// Owning container, empty for the root
    pub fn container(&self) -> &str {
        self.name.split('/').nth(1).unwrap_or_default()
    }

    /// Object key below the container, `None` for the root and bare containers
    pub fn key(&self) -> Option<&str> {
        let container = self.container();
        if self.name.len() > container.len() + 1 {
            Some(&self.name[container.len() + 2..])
        } else {
            None
        }
    }

    /// Listing prefix for this path: `"<key>/"`, or empty for a bare container
    pub fn prefix(&self) -> String {
        self.key().map(|key| format!("{key}/")).unwrap_or_default()
    }

    /// Last path component (the container name for a container, "/" for the root)
    pub fn base_name(&self) -> &str {
        if self.is_root() {
            return "/";
        }
        self.name.rsplit('/').next().unwrap_or_default()
    }

    /// Path to the container holding this path
    pub fn container_path(&self) -> Self {
        Self::new(self.container())
    }

    /// Join a child component, which may itself contain separators
    pub fn join(&self, child: &str) -> Self {
        Self::new(&format!("{}/{}", self.name, child))
    }

    /// Object exactly as a listing named it
    ///
    /// Unlike `new`, the key is kept verbatim: a trailing `/` (folder
    /// markers), empty components and dot components all address distinct
    /// objects in the store.
    pub fn listed(container: &str, key: &str) -> Self {
        let mut path = Self::with_kind(container, PathKind::Object);
        path.name = format!("{}/{key}", path.name);
        path
    }

    /// Whether this names a folder marker object (`key/`)
    pub fn is_marker(&self) -> bool {
        self.key().is_some_and(|key| key.ends_with('/'))
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Clean a raw remote path: single leading slash, no trailing slash,
/// empty, `.` and `..` components resolved
fn normalize(raw: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in raw.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            part => parts.push(part),
        }
    }
    format!("/{}", parts.join("/"))
}

/// Whether raw input ends with a separator (directory semantics)
pub fn has_trailing_slash(raw: &str) -> bool {
    raw.ends_with('/') || raw.ends_with(std::path::MAIN_SEPARATOR)
}

/// Path that is either on the local filesystem or in the store
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedPath {
    /// Local filesystem path
    Local(PathBuf),
    /// Remote store path
    Remote(RemotePath),
}

impl ParsedPath {
    /// Classify raw input by local existence: anything that exists on the
    /// local filesystem is local, everything else is remote
    pub fn detect(raw: &str) -> Self {
        let local = Path::new(raw);
        if std::fs::metadata(local).is_ok() {
            ParsedPath::Local(local.to_path_buf())
        } else {
            ParsedPath::Remote(RemotePath::new(raw))
        }
    }

    /// Check if this is a remote path
    pub fn is_remote(&self) -> bool {
        matches!(self, ParsedPath::Remote(_))
    }

    /// Check if this is a local path
    pub fn is_local(&self) -> bool {
        matches!(self, ParsedPath::Local(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(RemotePath::new("").name(), "/");
        assert_eq!(RemotePath::new("/").name(), "/");
        assert_eq!(RemotePath::new("photos").name(), "/photos");
        assert_eq!(RemotePath::new("photos/").name(), "/photos");
        assert_eq!(RemotePath::new("//photos//2014/").name(), "/photos/2014");
        assert_eq!(RemotePath::new("/photos/./2014/../2015").name(), "/photos/2015");
    }

    #[test]
    fn test_container_and_prefix() {
        let path = RemotePath::new("/photos/2014/summer");
        assert_eq!(path.container(), "photos");
        assert_eq!(path.key(), Some("2014/summer"));
        assert_eq!(path.prefix(), "2014/summer/");
        assert_eq!(path.base_name(), "summer");

        let container = RemotePath::new("photos/");
        assert_eq!(container.container(), "photos");
        assert_eq!(container.key(), None);
        assert_eq!(container.prefix(), "");
        assert_eq!(container.base_name(), "photos");

        let root = RemotePath::new("/");
        assert!(root.is_root());
        assert_eq!(root.container(), "");
        assert_eq!(root.key(), None);
        assert_eq!(root.base_name(), "/");
    }

    #[test]
    fn test_join() {
        let path = RemotePath::new("/photos");
        assert_eq!(path.join("2014").name(), "/photos/2014");
        assert_eq!(path.join("2014/img.jpg").name(), "/photos/2014/img.jpg");
        assert_eq!(RemotePath::root().join("photos").name(), "/photos");
        assert_eq!(path.join("2014").container_path().name(), "/photos");
    }

    #[test]
    fn test_listed_keeps_key_verbatim() {
        let marker = RemotePath::listed("photos", "2014/");
        assert_eq!(marker.resource(), "/photos/2014/");
        assert_eq!(marker.key(), Some("2014/"));
        assert_eq!(marker.container(), "photos");
        assert!(marker.is_marker());

        let odd = RemotePath::listed("photos", "a//b/./c");
        assert_eq!(odd.key(), Some("a//b/./c"));
        assert!(!odd.is_marker());
        assert!(!RemotePath::new("/photos/2014/").is_marker());
    }

    #[test]
    fn test_kind_is_set_once() {
        let mut path = RemotePath::new("/photos");
        assert_eq!(path.kind(), None);
        assert_eq!(path.settle_kind(PathKind::Container), PathKind::Container);
        assert_eq!(path.settle_kind(PathKind::Object), PathKind::Container);
        assert_eq!(path.kind(), Some(PathKind::Container));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(PathKind::VirtualFolder.to_string(), "vfolder");
        assert!(PathKind::Container.is_folder_like());
        assert!(!PathKind::Object.is_folder_like());
    }

    #[test]
    fn test_trailing_slash() {
        assert!(has_trailing_slash("photos/"));
        assert!(!has_trailing_slash("photos"));
    }

    #[test]
    fn test_detect_local_and_remote() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let local = temp_dir.path().to_string_lossy().to_string();
        assert!(ParsedPath::detect(&local).is_local());

        let missing = temp_dir.path().join("nope").to_string_lossy().to_string();
        let parsed = ParsedPath::detect(&missing);
        assert!(parsed.is_remote());
    }
}
