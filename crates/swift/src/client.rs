//! Swift HTTP client
//!
//! Issues authenticated requests against the object storage endpoint found
//! in the keyring's service catalog and implements the ObjectStore trait from
//! sfs-core.

use async_trait::async_trait;
use futures::StreamExt;
use http::HeaderValue;
use reqwest::Body;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};
use url::Url;

use sfs_core::{
    Error, Keyring, OBJECT_STORE_SERVICE, ObjectStore, Request, RequestBody, Response,
    ResponseBody, Result,
};

const AUTH_TOKEN_HEADER: &str = "x-auth-token";
const USER_AGENT: &str = concat!("sfs/", env!("CARGO_PKG_VERSION"));

/// Swift endpoint bound to one token
pub struct SwiftClient {
    http: reqwest::Client,
    endpoint: Url,
    token: HeaderValue,
}

impl SwiftClient {
    /// Create a client for the object store of `region` listed in the keyring
    pub fn new(keyring: &Keyring, region: &str) -> Result<Self> {
        if keyring.is_expired() {
            warn!("keyring token is expired, requests will likely be rejected");
        }
        let endpoint = keyring.endpoint_url(OBJECT_STORE_SERVICE, region)?;
        Self::with_endpoint(endpoint, &keyring.auth_token)
    }

    /// Create a client for an explicit endpoint URL and token
    pub fn with_endpoint(endpoint: &str, token: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint)?;
        if endpoint.cannot_be_a_base() {
            return Err(Error::Config(format!("Endpoint cannot be a base URL: {endpoint}")));
        }

        let mut token = HeaderValue::from_str(token)
            .map_err(|e| Error::Auth(format!("Invalid auth token: {e}")))?;
        token.set_sensitive(true);

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Transport(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint,
            token,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Full URL of a request: every path segment escaped, query appended
    ///
    /// Segments are kept verbatim, empty ones included, so `/c/p/` and
    /// `/c/p` stay distinct objects.
    pub fn request_url(&self, request: &Request) -> Result<Url> {
        let mut url = self.endpoint.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::Config(format!("Invalid endpoint: {}", self.endpoint)))?;
            segments.pop_if_empty();
            let resource = request.resource.strip_prefix('/').unwrap_or(&request.resource);
            if !resource.is_empty() {
                segments.extend(resource.split('/'));
            }
        }
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(request.query.iter());
        }
        Ok(url)
    }
}

#[async_trait]
impl ObjectStore for SwiftClient {
    async fn call(&self, request: Request) -> Result<Response> {
        let url = self.request_url(&request)?;
        debug!(method = %request.method, %url, "swift request");

        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .headers(request.headers.clone())
            .header(AUTH_TOKEN_HEADER, self.token.clone());

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Bytes(bytes) => builder.body(bytes),
            RequestBody::File(path) => {
                let file = tokio::fs::File::open(&path).await.map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        Error::NotFound(path.display().to_string())
                    } else {
                        Error::Io(e)
                    }
                })?;
                builder.body(Body::wrap_stream(ReaderStream::new(file)))
            }
        };

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        let headers = response.headers().clone();
        debug!(status = status.as_u16(), "swift response");

        let body = if request.stream_response {
            ResponseBody::Stream(
                response
                    .bytes_stream()
                    .map(|chunk| chunk.map_err(transport_error))
                    .boxed(),
            )
        } else {
            ResponseBody::Buffered(response.bytes().await.map_err(transport_error)?)
        };

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

fn transport_error(error: reqwest::Error) -> Error {
    Error::Transport(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SwiftClient {
        SwiftClient::with_endpoint("https://storage.example.net/v1/AUTH_abc", "token").unwrap()
    }

    #[test]
    fn test_account_url() {
        let request = Request::get("").query("format", "json");
        assert_eq!(
            client().request_url(&request).unwrap().as_str(),
            "https://storage.example.net/v1/AUTH_abc?format=json"
        );
    }

    #[test]
    fn test_segments_are_escaped() {
        let request = Request::head("/my photos/2014/été #1.jpg");
        assert_eq!(
            client().request_url(&request).unwrap().as_str(),
            "https://storage.example.net/v1/AUTH_abc/my%20photos/2014/%C3%A9t%C3%A9%20%231.jpg"
        );
    }

    #[test]
    fn test_marker_keys_keep_separators() {
        let marker = Request::delete("/box/photos/");
        assert_eq!(
            client().request_url(&marker).unwrap().as_str(),
            "https://storage.example.net/v1/AUTH_abc/box/photos/"
        );
        let doubled = Request::get("/box/a//b");
        assert_eq!(
            client().request_url(&doubled).unwrap().as_str(),
            "https://storage.example.net/v1/AUTH_abc/box/a//b"
        );
    }

    #[test]
    fn test_query_is_encoded() {
        let request = Request::get("/box")
            .query("format", "json")
            .query("prefix", "a b/");
        assert_eq!(
            client().request_url(&request).unwrap().as_str(),
            "https://storage.example.net/v1/AUTH_abc/box?format=json&prefix=a+b%2F"
        );
    }

    #[test]
    fn test_trailing_slash_endpoint() {
        let client =
            SwiftClient::with_endpoint("https://storage.example.net/v1/AUTH_abc/", "t").unwrap();
        let request = Request::delete("/box/key");
        assert_eq!(
            client.request_url(&request).unwrap().as_str(),
            "https://storage.example.net/v1/AUTH_abc/box/key"
        );
    }

    #[test]
    fn test_rejects_bad_endpoint() {
        assert!(matches!(
            SwiftClient::with_endpoint("not a url", "t"),
            Err(Error::InvalidUrl(_))
        ));
        assert!(matches!(
            SwiftClient::with_endpoint("https://storage.example.net/v1", "bad\ntoken"),
            Err(Error::Auth(_))
        ));
    }

    #[test]
    fn test_new_from_keyring() {
        let keyring = Keyring::from_json(
            r#"{"token": {"catalog": [{"type": "object-store", "endpoints": [
                {"region": "GRA1", "url": "https://storage.gra1.example.net/v1/AUTH_x"}]}]},
                "X-Auth-Token": "abc"}"#,
        )
        .unwrap();
        let client = SwiftClient::new(&keyring, "GRA1").unwrap();
        assert_eq!(client.endpoint().host_str(), Some("storage.gra1.example.net"));
        assert!(matches!(SwiftClient::new(&keyring, "SBG1"), Err(Error::Auth(_))));
    }
}
