//! In-memory Swift emulator for integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use http::{Method, StatusCode};
use md5::{Digest, Md5};
use serde_json::json;

use sfs_core::traits::{
    ACCOUNT_BYTES_USED, ACCOUNT_CONTAINER_COUNT, CONTAINER_BYTES_USED, CONTAINER_OBJECT_COUNT,
    CONTENT_LENGTH, CONTENT_TYPE, ETAG, LAST_MODIFIED,
};
use sfs_core::{ObjectStore, Request, RequestBody, Response, ResponseBody, Result};

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    pub etag: String,
    pub content_type: String,
}

type Containers = BTreeMap<String, BTreeMap<String, StoredObject>>;

#[derive(Default)]
pub struct MemoryStore {
    containers: Mutex<Containers>,
    calls: Mutex<Vec<(Method, String)>>,
    failures: Mutex<Vec<(Method, String)>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps for `delay` before being answered
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn create_container(&self, name: &str) {
        self.containers
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default();
    }

    pub fn insert(&self, container: &str, key: &str, data: &[u8]) {
        self.insert_typed(container, key, data, "text/plain");
    }

    pub fn insert_typed(&self, container: &str, key: &str, data: &[u8], content_type: &str) {
        self.containers
            .lock()
            .unwrap()
            .entry(container.to_string())
            .or_default()
            .insert(
                key.to_string(),
                StoredObject {
                    data: Bytes::copy_from_slice(data),
                    etag: md5_hex(data),
                    content_type: content_type.to_string(),
                },
            );
    }

    pub fn object(&self, container: &str, key: &str) -> Option<StoredObject> {
        self.containers
            .lock()
            .unwrap()
            .get(container)
            .and_then(|objects| objects.get(key).cloned())
    }

    pub fn keys(&self, container: &str) -> Vec<String> {
        self.containers
            .lock()
            .unwrap()
            .get(container)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn has_container(&self, name: &str) -> bool {
        self.containers.lock().unwrap().contains_key(name)
    }

    /// Answer `method` on `resource` with a 500
    pub fn fail_on(&self, method: Method, resource: &str) {
        self.failures
            .lock()
            .unwrap()
            .push((method, resource.to_string()));
    }

    pub fn calls(&self) -> Vec<(Method, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, method: &Method, resource: &str) -> usize {
        self.calls()
            .iter()
            .filter(|(m, r)| m == method && r == resource)
            .count()
    }

    /// Highest number of calls answered at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn handle(&self, request: &Request, body: Option<Bytes>) -> Response {
        let mut parts = request.resource.trim_start_matches('/').splitn(2, '/');
        let container = parts.next().unwrap_or_default().to_string();
        let key = parts.next().map(str::to_string);

        match (container.is_empty(), key) {
            (true, _) => self.account(request),
            (false, None) => self.container(request, &container),
            (false, Some(key)) => self.handle_object(request, &container, &key, body),
        }
    }

    fn account(&self, request: &Request) -> Response {
        let containers = self.containers.lock().unwrap();
        match request.method {
            Method::HEAD => {
                let bytes: usize = containers
                    .values()
                    .flat_map(|objects| objects.values())
                    .map(|o| o.data.len())
                    .sum();
                Response::new(StatusCode::NO_CONTENT)
                    .with_header(ACCOUNT_CONTAINER_COUNT, containers.len().to_string())
                    .with_header(ACCOUNT_BYTES_USED, bytes.to_string())
            }
            Method::GET => {
                let listing: Vec<_> = containers
                    .iter()
                    .map(|(name, objects)| {
                        json!({
                            "name": name,
                            "count": objects.len(),
                            "bytes": objects.values().map(|o| o.data.len()).sum::<usize>(),
                        })
                    })
                    .collect();
                Response::new(StatusCode::OK).with_body(json!(listing).to_string())
            }
            _ => Response::new(StatusCode::METHOD_NOT_ALLOWED),
        }
    }

    fn container(&self, request: &Request, name: &str) -> Response {
        let mut containers = self.containers.lock().unwrap();
        match request.method {
            Method::HEAD => match containers.get(name) {
                Some(objects) => Response::new(StatusCode::NO_CONTENT)
                    .with_header(CONTAINER_OBJECT_COUNT, objects.len().to_string())
                    .with_header(
                        CONTAINER_BYTES_USED,
                        objects
                            .values()
                            .map(|o| o.data.len())
                            .sum::<usize>()
                            .to_string(),
                    ),
                None => Response::new(StatusCode::NOT_FOUND),
            },
            Method::PUT => {
                if containers.contains_key(name) {
                    Response::new(StatusCode::ACCEPTED)
                } else {
                    containers.insert(name.to_string(), BTreeMap::new());
                    Response::new(StatusCode::CREATED)
                }
            }
            Method::DELETE => match containers.get(name) {
                None => Response::new(StatusCode::NOT_FOUND),
                Some(objects) if !objects.is_empty() => Response::new(StatusCode::CONFLICT),
                Some(_) => {
                    containers.remove(name);
                    Response::new(StatusCode::NO_CONTENT)
                }
            },
            Method::GET => {
                let Some(objects) = containers.get(name) else {
                    return Response::new(StatusCode::NOT_FOUND);
                };
                let prefix = request.query_value("prefix").unwrap_or_default();
                let marker = request.query_value("marker");
                let limit = request
                    .query_value("limit")
                    .and_then(|l| l.parse::<usize>().ok())
                    .unwrap_or(usize::MAX);

                let listing: Vec<_> = objects
                    .iter()
                    .filter(|(key, _)| key.starts_with(prefix))
                    .filter(|(key, _)| marker.is_none_or(|m| key.as_str() > m))
                    .take(limit)
                    .map(|(key, o)| {
                        json!({
                            "name": key,
                            "hash": o.etag,
                            "bytes": o.data.len(),
                            "content_type": o.content_type,
                            "last_modified": "2014-10-27T16:35:40.140480",
                        })
                    })
                    .collect();
                Response::new(StatusCode::OK).with_body(json!(listing).to_string())
            }
            _ => Response::new(StatusCode::METHOD_NOT_ALLOWED),
        }
    }

    fn handle_object(
        &self,
        request: &Request,
        container: &str,
        key: &str,
        body: Option<Bytes>,
    ) -> Response {
        let mut containers = self.containers.lock().unwrap();
        let Some(objects) = containers.get_mut(container) else {
            return Response::new(StatusCode::NOT_FOUND);
        };

        match request.method {
            Method::HEAD => match objects.get(key) {
                Some(o) => Response::new(StatusCode::OK)
                    .with_header(ETAG, &o.etag)
                    .with_header(CONTENT_LENGTH, o.data.len().to_string())
                    .with_header(CONTENT_TYPE, &o.content_type)
                    .with_header(LAST_MODIFIED, "Mon, 27 Oct 2014 16:35:40 GMT"),
                None => Response::new(StatusCode::NOT_FOUND),
            },
            Method::GET => match objects.get(key) {
                Some(o) if request.stream_response => {
                    let chunks: Vec<Result<Bytes>> = o
                        .data
                        .chunks(4)
                        .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
                        .collect();
                    let mut response = Response::new(StatusCode::OK);
                    response.body = ResponseBody::Stream(futures::stream::iter(chunks).boxed());
                    response
                }
                Some(o) => Response::new(StatusCode::OK).with_body(o.data.clone()),
                None => Response::new(StatusCode::NOT_FOUND),
            },
            Method::PUT => {
                let data = body.unwrap_or_default();
                let content_type = request
                    .headers
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("application/octet-stream")
                    .to_string();
                objects.insert(
                    key.to_string(),
                    StoredObject {
                        etag: md5_hex(&data),
                        data,
                        content_type,
                    },
                );
                Response::new(StatusCode::CREATED)
            }
            Method::DELETE => match objects.remove(key) {
                Some(_) => Response::new(StatusCode::NO_CONTENT),
                None => Response::new(StatusCode::NOT_FOUND),
            },
            _ => Response::new(StatusCode::METHOD_NOT_ALLOWED),
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn call(&self, request: Request) -> Result<Response> {
        self.calls
            .lock()
            .unwrap()
            .push((request.method.clone(), request.resource.clone()));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let body = match &request.body {
            RequestBody::Empty => None,
            RequestBody::Bytes(bytes) => Some(bytes.clone()),
            RequestBody::File(path) => Some(Bytes::from(tokio::fs::read(path).await?)),
        };

        let failing = self
            .failures
            .lock()
            .unwrap()
            .iter()
            .any(|(m, r)| *m == request.method && *r == request.resource);
        let response = if failing {
            Response::new(StatusCode::INTERNAL_SERVER_ERROR)
        } else {
            self.handle(&request, body)
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(response)
    }
}

pub fn md5_hex(data: &[u8]) -> String {
    format!("{:x}", Md5::digest(data))
}
