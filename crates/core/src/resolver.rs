//! Path type resolution
//!
//! A path is classified with a metadata probe. The response headers tell the
//! account, a container and an object apart. A path that probes absent may
//! still be a virtual folder: a key prefix that only exists because objects
//! are stored below it.

use jiff::Timestamp;
use tracing::debug;

use crate::error::{Error, Result};
use crate::listing::{ListingEntry, list_container_page};
use crate::path::{PathKind, RemotePath};
use crate::traits::{
    ACCOUNT_BYTES_USED, ACCOUNT_CONTAINER_COUNT, CONTAINER_BYTES_USED, CONTAINER_OBJECT_COUNT,
    CONTENT_LENGTH, CONTENT_TYPE, ETAG, LAST_MODIFIED, ObjectStore, Request, Response,
};

/// Statuses a probe may answer with: exists (200, 203, 204) or absent (404)
const PROBE_STATUSES: [u16; 4] = [200, 203, 204, 404];

impl RemotePath {
    /// Determine what this path denotes
    ///
    /// The first successful classification is cached on the path; later calls
    /// return it without touching the network. Metadata found in the probe
    /// response (sizes, counts, hash, dates) is recorded as well.
    pub async fn classify(&mut self, store: &dyn ObjectStore) -> Result<PathKind> {
        if let Some(kind) = self.kind() {
            return Ok(kind);
        }

        let response = store.call(Request::head(self.resource())).await?;
        response.expect(&PROBE_STATUSES)?;

        let kind = if response.is_not_found() {
            self.probe_virtual_folder(store).await?
        } else {
            let kind = kind_from_headers(&response)
                .ok_or_else(|| Error::ClassificationAmbiguous(self.name().to_string()))?;
            self.absorb_probe(kind, &response);
            kind
        };

        debug!(path = %self, %kind, "classified path");
        Ok(self.settle_kind(kind))
    }

    /// Look for objects stored below this path's prefix
    async fn probe_virtual_folder(&self, store: &dyn ObjectStore) -> Result<PathKind> {
        let prefix = self.prefix();
        if prefix.is_empty() {
            return Err(Error::NotFound(self.name().to_string()));
        }

        let entries: Vec<ListingEntry> =
            list_container_page(store, self.container(), &prefix, None, Some(1))
                .await?
                .ok_or_else(|| Error::NotFound(self.name().to_string()))?;

        if entries.iter().any(|entry| entry.name.starts_with(&prefix)) {
            Ok(PathKind::VirtualFolder)
        } else {
            Err(Error::NotFound(self.name().to_string()))
        }
    }

    /// Copy the metadata a probe answered with onto the path
    pub(crate) fn absorb_probe(&mut self, kind: PathKind, response: &Response) {
        match kind {
            PathKind::Root => {
                self.count = response.header_u64(ACCOUNT_CONTAINER_COUNT).unwrap_or(0);
                self.bytes = response.header_u64(ACCOUNT_BYTES_USED).unwrap_or(0);
            }
            PathKind::Container => {
                self.count = response.header_u64(CONTAINER_OBJECT_COUNT).unwrap_or(0);
                self.bytes = response.header_u64(CONTAINER_BYTES_USED).unwrap_or(0);
            }
            PathKind::Object => {
                self.etag = response.header_str(ETAG).map(trim_etag);
                self.bytes = response.header_u64(CONTENT_LENGTH).unwrap_or(0);
                self.content_type = response.header_str(CONTENT_TYPE).map(str::to_string);
                self.last_modified = response.header_str(LAST_MODIFIED).and_then(parse_http_date);
            }
            PathKind::VirtualFolder => {}
        }
    }
}

/// Map probe headers to a kind; `None` when no known signature matches
fn kind_from_headers(response: &Response) -> Option<PathKind> {
    if response.has_header(ACCOUNT_CONTAINER_COUNT) {
        Some(PathKind::Root)
    } else if response.has_header(CONTAINER_BYTES_USED)
        || response.has_header(CONTAINER_OBJECT_COUNT)
    {
        Some(PathKind::Container)
    } else if response.has_header(ETAG) {
        Some(PathKind::Object)
    } else {
        None
    }
}

/// Parse an RFC 1123 date such as `Mon, 02 Jan 2006 15:04:05 GMT`
pub(crate) fn parse_http_date(value: &str) -> Option<Timestamp> {
    jiff::fmt::rfc2822::DateTimeParser::new()
        .parse_timestamp(value.trim())
        .ok()
}

/// Etags may come back quoted
pub(crate) fn trim_etag(value: &str) -> String {
    value.trim().trim_matches('"').to_string()
}
