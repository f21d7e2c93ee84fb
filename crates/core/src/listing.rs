//! Directory listing emulation
//!
//! The store only knows flat keys. Listing a container or a virtual folder
//! fetches every key under the path's prefix and folds them into a single
//! hierarchy level: `a/b/c.txt` and `a/b/d.txt` listed under `a` become one
//! virtual folder `b`.

use std::collections::HashMap;

use jiff::Timestamp;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::path::{PathKind, RemotePath};
use crate::traits::{ObjectStore, Request};

/// Keys requested per listing call
pub const LISTING_PAGE_SIZE: usize = 10_000;

/// Content type the store gives zero-byte "directory" placeholder objects.
///
/// A zero-byte object with this type is shown as a folder. This is a
/// heuristic: a genuinely empty binary file looks exactly the same.
pub const PLACEHOLDER_CONTENT_TYPE: &str = "application/octet-stream";

/// One row of a container listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingEntry {
    /// Full object key
    pub name: String,
    /// MD5 of the content
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub bytes: u64,
    #[serde(default)]
    pub content_type: String,
    /// `None` when absent or not in the listing date format
    #[serde(default, deserialize_with = "deserialize_listing_date")]
    pub last_modified: Option<Timestamp>,
}

/// One row of the account listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerEntry {
    pub name: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub bytes: u64,
}

fn deserialize_listing_date<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_listing_date))
}

/// Listing dates are UTC without zone: `2014-10-27T16:35:40.140480`
pub(crate) fn parse_listing_date(value: &str) -> Option<Timestamp> {
    let datetime: jiff::civil::DateTime = value.parse().ok()?;
    datetime
        .to_zoned(jiff::tz::TimeZone::UTC)
        .ok()
        .map(|zoned| zoned.timestamp())
}

impl RemotePath {
    /// List one hierarchy level below this path
    ///
    /// The root lists containers, containers and virtual folders list the
    /// folded keys below them, and an object lists itself.
    pub async fn list_children(&mut self, store: &dyn ObjectStore) -> Result<Vec<RemotePath>> {
        match self.classify(store).await? {
            PathKind::Root => {
                let containers = list_containers(store).await?;
                Ok(containers
                    .into_iter()
                    .map(|entry| {
                        let mut child = RemotePath::with_kind(&entry.name, PathKind::Container);
                        child.count = entry.count;
                        child.bytes = entry.bytes;
                        child
                    })
                    .collect())
            }
            PathKind::Container | PathKind::VirtualFolder => {
                let prefix = self.prefix();
                let entries = list_container(store, self.container(), &prefix)
                    .await?
                    .ok_or_else(|| Error::NotFound(self.name().to_string()))?;
                debug!(path = %self, keys = entries.len(), "folding listing");
                Ok(fold_listing(self, &prefix, entries))
            }
            PathKind::Object => {
                let response = store.call(Request::head(self.resource())).await?;
                response.expect(&[200, 203])?;
                let mut child = RemotePath::with_kind(self.name(), PathKind::Object);
                child.absorb_probe(PathKind::Object, &response);
                Ok(vec![child])
            }
        }
    }

    /// Every object stored below this path, flat and recursive
    pub async fn children_objects(&self, store: &dyn ObjectStore) -> Result<Vec<ListingEntry>> {
        let prefix = self.prefix();
        let entries = list_container(store, self.container(), &prefix)
            .await?
            .ok_or_else(|| Error::NotFound(self.name().to_string()))?;
        Ok(entries
            .into_iter()
            .filter(|entry| entry.name.starts_with(&prefix))
            .collect())
    }
}

/// Account listing
pub async fn list_containers(store: &dyn ObjectStore) -> Result<Vec<ContainerEntry>> {
    let response = store
        .call(Request::get("").query("format", "json"))
        .await?;
    response.expect(&[200, 203, 204])?;
    response.json_list().await
}

/// Full listing of `container` under `prefix`; `None` when the container is absent
pub(crate) async fn list_container(
    store: &dyn ObjectStore,
    container: &str,
    prefix: &str,
) -> Result<Option<Vec<ListingEntry>>> {
    list_container_paged(store, container, prefix, LISTING_PAGE_SIZE).await
}

async fn list_container_paged(
    store: &dyn ObjectStore,
    container: &str,
    prefix: &str,
    page_size: usize,
) -> Result<Option<Vec<ListingEntry>>> {
    let mut entries = Vec::new();
    let mut marker: Option<String> = None;

    loop {
        let Some(page) =
            list_container_page(store, container, prefix, marker.as_deref(), Some(page_size))
                .await?
        else {
            return Ok(None);
        };

        let full = page.len() >= page_size;
        marker = page.last().map(|entry| entry.name.clone());
        entries.extend(page);

        if !full || marker.is_none() {
            break;
        }
    }

    Ok(Some(entries))
}

/// One listing call; `None` when the container is absent
pub(crate) async fn list_container_page(
    store: &dyn ObjectStore,
    container: &str,
    prefix: &str,
    marker: Option<&str>,
    limit: Option<usize>,
) -> Result<Option<Vec<ListingEntry>>> {
    let mut request = Request::get(format!("/{container}")).query("format", "json");
    if !prefix.is_empty() {
        request = request.query("prefix", prefix);
    }
    if let Some(marker) = marker {
        request = request.query("marker", marker);
    }
    if let Some(limit) = limit {
        request = request.query("limit", limit.to_string());
    }

    let response = store.call(request).await?;
    response.expect(&[200, 203, 204, 404])?;
    if response.is_not_found() {
        return Ok(None);
    }
    Ok(Some(response.json_list().await?))
}

/// A child being assembled from one or more listing rows
struct Folded {
    name: String,
    folder: bool,
    bytes: u64,
    count: u64,
    hash: Option<String>,
    content_type: Option<String>,
    last_modified: Option<Timestamp>,
}

impl Folded {
    fn make_folder(&mut self) {
        self.folder = true;
        self.hash = None;
        self.content_type = None;
    }
}

/// Collapse flat keys below `prefix` into the direct children of `parent`
///
/// Names keep the order of their first appearance. Keys that collapse to the
/// same name merge into one folder whose size is the sum of its objects.
pub(crate) fn fold_listing(
    parent: &RemotePath,
    prefix: &str,
    entries: Vec<ListingEntry>,
) -> Vec<RemotePath> {
    let mut folded: Vec<Folded> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for entry in entries {
        let Some(stripped) = entry.name.strip_prefix(prefix) else {
            continue;
        };
        let (name, nested) = match stripped.split_once('/') {
            Some((head, _)) => (head, true),
            None => (stripped, false),
        };
        if name.is_empty() {
            continue;
        }

        if let Some(&position) = positions.get(name) {
            let existing = &mut folded[position];
            existing.bytes += entry.bytes;
            existing.count += 1;
            existing.make_folder();
            continue;
        }

        let placeholder = entry.bytes == 0 && entry.content_type == PLACEHOLDER_CONTENT_TYPE;
        let mut child = Folded {
            name: name.to_string(),
            folder: false,
            bytes: entry.bytes,
            count: 0,
            hash: Some(entry.hash),
            content_type: Some(entry.content_type),
            last_modified: entry.last_modified,
        };
        if nested || placeholder {
            child.count = u64::from(nested);
            child.make_folder();
        }
        positions.insert(child.name.clone(), folded.len());
        folded.push(child);
    }

    folded
        .into_iter()
        .map(|f| {
            let kind = if f.folder {
                PathKind::VirtualFolder
            } else {
                PathKind::Object
            };
            let mut child = RemotePath::with_kind(parent.join(&f.name).name(), kind);
            child.bytes = f.bytes;
            child.count = f.count;
            child.etag = f.hash.filter(|hash| !hash.is_empty());
            child.content_type = f.content_type.filter(|ct| !ct.is_empty());
            child.last_modified = f.last_modified;
            child
        })
        .collect()
}
