//! Spinner for bulk transfers
//!
//! The number of jobs of a batch is only known once it has been enumerated,
//! so transfers show a spinner counting completed jobs rather than a bar.

use std::sync::Arc;
use std::time::Duration;

use sfs_core::{ProgressFn, TransferJob};

use super::OutputConfig;

/// Spinner wrapper, hidden in quiet, JSON and no-progress modes
#[derive(Debug)]
pub struct TransferSpinner {
    bar: Option<indicatif::ProgressBar>,
}

impl TransferSpinner {
    pub fn new(config: &OutputConfig, message: &str) -> Self {
        let bar = if config.quiet || config.json || config.no_progress {
            None
        } else {
            let bar = indicatif::ProgressBar::new_spinner();
            let template = "{spinner:.green} {msg} ({pos} done)";
            if let Ok(style) = indicatif::ProgressStyle::default_spinner().template(template) {
                bar.set_style(style);
            }
            bar.set_message(message.to_string());
            bar.enable_steady_tick(Duration::from_millis(100));
            Some(bar)
        };

        Self { bar }
    }

    /// Callback advancing the spinner after each completed job
    pub fn progress_fn(&self) -> Option<ProgressFn> {
        let bar = self.bar.clone()?;
        Some(Arc::new(move |job: &TransferJob| {
            bar.inc(1);
            bar.set_message(job.to_string());
        }))
    }

    pub fn finish_and_clear(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }

    pub fn is_visible(&self) -> bool {
        self.bar.is_some()
    }
}

impl Drop for TransferSpinner {
    fn drop(&mut self) {
        self.finish_and_clear();
    }
}
