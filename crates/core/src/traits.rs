//! ObjectStore trait definition
//!
//! This trait is the seam between the core and the HTTP transport: one
//! authenticated endpoint that takes a method, a store path, headers and an
//! optional body, and answers with a status, headers and a body that is
//! either buffered or streamed. Everything above it (classification, listing
//! emulation, bulk transfers) only speaks this interface, so it can be
//! mocked for testing.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, StreamExt};
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Account-level container count, only present on the storage root
pub const ACCOUNT_CONTAINER_COUNT: &str = "x-account-container-count";
/// Account-level byte count
pub const ACCOUNT_BYTES_USED: &str = "x-account-bytes-used";
/// Container-level byte count
pub const CONTAINER_BYTES_USED: &str = "x-container-bytes-used";
/// Container-level object count
pub const CONTAINER_OBJECT_COUNT: &str = "x-container-object-count";
/// Object content hash (MD5, lowercase hex)
pub const ETAG: &str = "etag";
/// Last modification date, RFC 1123
pub const LAST_MODIFIED: &str = "last-modified";
/// Body length
pub const CONTENT_LENGTH: &str = "content-length";
/// Body media type
pub const CONTENT_TYPE: &str = "content-type";

/// Body sent with a request
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    /// No body
    #[default]
    Empty,
    /// In-memory payload
    Bytes(Bytes),
    /// Local file, streamed by the gateway
    File(PathBuf),
}

/// A single call against the store endpoint
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method
    pub method: Method,
    /// Unescaped store path: "" for the account, "/container", "/container/key"
    pub resource: String,
    /// Query parameters, encoded by the gateway
    pub query: Vec<(String, String)>,
    /// Extra headers
    pub headers: HeaderMap,
    /// Request body
    pub body: RequestBody,
    /// Return the response body as a stream instead of buffering it
    pub stream_response: bool,
}

impl Request {
    /// Create a request without body or extra headers
    pub fn new(method: Method, resource: impl Into<String>) -> Self {
        Self {
            method,
            resource: resource.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            stream_response: false,
        }
    }

    /// Metadata probe
    pub fn head(resource: impl Into<String>) -> Self {
        Self::new(Method::HEAD, resource)
    }

    pub fn get(resource: impl Into<String>) -> Self {
        Self::new(Method::GET, resource)
    }

    pub fn put(resource: impl Into<String>) -> Self {
        Self::new(Method::PUT, resource)
    }

    pub fn delete(resource: impl Into<String>) -> Self {
        Self::new(Method::DELETE, resource)
    }

    /// Append a query parameter
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Set a header, rejecting values that are not valid header text
    pub fn header(mut self, name: &'static str, value: impl AsRef<str>) -> Result<Self> {
        let value = HeaderValue::from_str(value.as_ref())
            .map_err(|e| Error::General(format!("Invalid value for header {name}: {e}")))?;
        self.headers.insert(HeaderName::from_static(name), value);
        Ok(self)
    }

    /// Attach a body
    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Ask the gateway for a streamed response body
    pub fn streaming(mut self) -> Self {
        self.stream_response = true;
        self
    }

    /// Value of a query parameter, if set
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Body of a response
pub enum ResponseBody {
    /// Whole body already in memory
    Buffered(Bytes),
    /// Body chunks as they arrive
    Stream(BoxStream<'static, Result<Bytes>>),
}

impl ResponseBody {
    /// Collect the whole body
    pub async fn bytes(self) -> Result<Bytes> {
        match self {
            ResponseBody::Buffered(bytes) => Ok(bytes),
            ResponseBody::Stream(mut stream) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(buf.freeze())
            }
        }
    }

    /// Body as a chunk stream, whatever the representation
    pub fn into_stream(self) -> BoxStream<'static, Result<Bytes>> {
        match self {
            ResponseBody::Buffered(bytes) => stream::once(async move { Ok(bytes) }).boxed(),
            ResponseBody::Stream(stream) => stream,
        }
    }
}

impl Default for ResponseBody {
    fn default() -> Self {
        ResponseBody::Buffered(Bytes::new())
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Buffered(bytes) => write!(f, "Buffered({} bytes)", bytes.len()),
            ResponseBody::Stream(_) => f.write_str("Stream"),
        }
    }
}

/// Answer of the store
#[derive(Debug, Default)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ResponseBody,
}

impl Response {
    /// Empty response with the given status
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: ResponseBody::default(),
        }
    }

    /// Builder-style header setter, used by gateways and fakes
    pub fn with_header(mut self, name: &'static str, value: impl AsRef<str>) -> Self {
        if let Ok(value) = HeaderValue::from_str(value.as_ref()) {
            self.headers.insert(HeaderName::from_static(name), value);
        }
        self
    }

    /// Builder-style buffered body setter
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = ResponseBody::Buffered(body.into());
        self
    }

    /// Fail unless the status is one of `accepted`
    ///
    /// 409 becomes `Error::Conflict`, any other status `Error::Transport`.
    pub fn expect(&self, accepted: &[u16]) -> Result<()> {
        if accepted.contains(&self.status.as_u16()) {
            return Ok(());
        }
        let status = format!(
            "{} - {}",
            self.status.as_u16(),
            self.status.canonical_reason().unwrap_or("Unknown")
        );
        if self.status == StatusCode::CONFLICT {
            Err(Error::Conflict(status))
        } else {
            Err(Error::Transport(status))
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }

    /// Header value as text, `None` when absent or not valid UTF-8
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Header value parsed as an unsigned integer
    pub fn header_u64(&self, name: &str) -> Option<u64> {
        self.header_str(name).and_then(|v| v.trim().parse().ok())
    }

    /// Decode a JSON array body; an empty body is an empty list
    pub async fn json_list<T: DeserializeOwned>(self) -> Result<Vec<T>> {
        let bytes = self.body.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Trait for the authenticated object store endpoint
///
/// This trait is implemented by the Swift adapter and can be mocked for testing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Issue one request and return the raw response
    ///
    /// Network failures are reported as `Error::Transport`; every status code,
    /// including 404, is returned as a response for the caller to interpret.
    async fn call(&self, request: Request) -> Result<Response>;
}
