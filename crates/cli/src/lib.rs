//! sfs CLI library
//!
//! Exposes the command tree and output helpers for integration tests.

pub mod commands;
pub mod exit_code;
pub mod output;
