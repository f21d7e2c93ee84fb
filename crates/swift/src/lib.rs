//! sfs-swift: OpenStack Swift adapter for sfs
//!
//! This crate provides the implementation of the ObjectStore trait over the
//! Swift REST API using reqwest. It is the only crate that speaks HTTP.

pub mod client;

pub use client::SwiftClient;
