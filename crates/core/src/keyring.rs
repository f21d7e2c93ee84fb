//! Keyring handling
//!
//! A keyring is the JSON document saved after authenticating against the
//! identity service: the issued token, its service catalog, and the value to
//! send as `X-Auth-Token`. The catalog maps a service type and a region to
//! the endpoint URL every request is issued against.

use std::path::Path;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Catalog type of the object storage service
pub const OBJECT_STORE_SERVICE: &str = "object-store";

/// One endpoint of a catalog entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub interface: String,
    #[serde(default)]
    pub legacy_endpoint_id: String,
    pub region: String,
    pub url: String,
}

/// A service and the endpoints it is reachable at
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    #[serde(rename = "type")]
    pub service_type: String,
}

/// Name and id of a token's project or user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Principal {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Issued token as returned by the identity service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    #[serde(default)]
    pub catalog: Vec<CatalogEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<Timestamp>,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub project: Principal,
    #[serde(default)]
    pub roles: Vec<Principal>,
    #[serde(default)]
    pub user: Principal,
}

/// Credentials and catalog needed to talk to the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keyring {
    pub token: Token,
    #[serde(rename = "X-Auth-Token")]
    pub auth_token: String,
}

impl Keyring {
    /// Read a keyring from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(path.display().to_string())
            } else {
                Error::Io(e)
            }
        })?;
        Self::from_json(&content)
    }

    /// Parse a keyring from its JSON text
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// URL of the first `service_type` endpoint in `region`
    pub fn endpoint_url(&self, service_type: &str, region: &str) -> Result<&str> {
        self.token
            .catalog
            .iter()
            .filter(|entry| entry.service_type == service_type)
            .flat_map(|entry| entry.endpoints.iter())
            .find(|endpoint| endpoint.region == region)
            .map(|endpoint| endpoint.url.as_str())
            .ok_or_else(|| {
                Error::Auth(format!(
                    "No endpoint found for service '{service_type}' in region '{region}'"
                ))
            })
    }

    /// Whether the token expired before `now`
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.token.expires_at.is_some_and(|expires| expires <= now)
    }

    /// Whether the token is already expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Timestamp::now())
    }
}
