//! sfs-core: Core library for the sfs object storage CLI
//!
//! This crate presents a flat OpenStack Swift store as a hierarchy:
//! - Configuration and keyring handling
//! - Path parsing and path type resolution
//! - Directory listing emulation over flat keys
//! - Bounded, fail-fast bulk transfers
//!
//! All network access goes through the `ObjectStore` trait, so the core can
//! be tested without a live store.

pub mod config;
pub mod error;
pub mod keyring;
pub mod listing;
pub mod path;
pub mod resolver;
pub mod traits;
pub mod transfer;

pub use config::{Config, ConfigManager, TransferLimits};
pub use error::{Error, Result};
pub use keyring::{Keyring, OBJECT_STORE_SERVICE};
pub use listing::{ContainerEntry, ListingEntry};
pub use path::{ParsedPath, PathKind, RemotePath, has_trailing_slash};
pub use traits::{ObjectStore, Request, RequestBody, Response, ResponseBody};
pub use transfer::{ProgressFn, TransferJob, Transfers};
