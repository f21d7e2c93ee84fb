//! Output formatting utilities
//!
//! Formatters for human-readable and JSON output, and the spinner shown
//! during bulk transfers.

mod formatter;
mod progress;

pub use formatter::{Formatter, human_size, listing_date};
pub use progress::TransferSpinner;

/// Output configuration derived from CLI flags
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Use JSON output format
    pub json: bool,
    /// Disable colored output
    pub no_color: bool,
    /// Disable progress spinner
    pub no_progress: bool,
    /// Suppress non-error output
    pub quiet: bool,
}
