//! Output formatter for human-readable and JSON output
//!
//! Every command prints through a `Formatter` so that `--json`, `--quiet` and
//! `--no-color` behave the same everywhere.

use jiff::Timestamp;
use serde::Serialize;

use super::OutputConfig;

/// Width of a formatted listing date, used to pad rows without one
const DATE_WIDTH: usize = 19;

/// Formatter for CLI output
///
/// In JSON mode all output is strict JSON without colors or progress.
#[derive(Debug, Clone)]
pub struct Formatter {
    config: OutputConfig,
}

impl Formatter {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn is_json(&self) -> bool {
        self.config.json
    }

    pub fn is_quiet(&self) -> bool {
        self.config.quiet
    }

    pub fn colors_enabled(&self) -> bool {
        !self.config.no_color && !self.config.json
    }

    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    /// `✓ message` on stdout; silent in JSON mode, where the exit code speaks
    pub fn success(&self, message: &str) {
        if !self.config.quiet && !self.config.json {
            println!("{}", self.marked("32", '✓', message));
        }
    }

    /// Errors are printed even in quiet mode, as `{"error": ...}` in JSON mode
    pub fn error(&self, message: &str) {
        if self.config.json {
            let error = serde_json::json!({ "error": message });
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&error).unwrap_or_else(|_| message.to_string())
            );
        } else {
            eprintln!("{}", self.marked("31", '✗', message));
        }
    }

    pub fn warning(&self, message: &str) {
        if !self.config.quiet && !self.config.json {
            eprintln!("{}", self.marked("33", '⚠', message));
        }
    }

    fn marked(&self, color: &str, mark: char, message: &str) -> String {
        if self.colors_enabled() {
            format!("\x1b[{color}m{mark}\x1b[0m {message}")
        } else {
            format!("{mark} {message}")
        }
    }

    /// Output a pre-built JSON value
    pub fn json<T: Serialize>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("Error serializing output: {e}"),
        }
    }

    /// Print a line of text (respects quiet mode)
    pub fn println(&self, message: &str) {
        if self.config.quiet {
            return;
        }
        println!("{message}");
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(OutputConfig::default())
    }
}

pub fn human_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// `2014-10-27 16:35:40`, or blanks of the same width when unknown
pub fn listing_date(timestamp: Option<Timestamp>) -> String {
    match timestamp {
        Some(ts) => ts.strftime("%Y-%m-%d %H:%M:%S").to_string(),
        None => " ".repeat(DATE_WIDTH),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatter_default() {
        let formatter = Formatter::default();
        assert!(!formatter.is_json());
        assert!(!formatter.is_quiet());
        assert!(formatter.colors_enabled());
    }

    #[test]
    fn test_formatter_json_mode() {
        let formatter = Formatter::new(OutputConfig {
            json: true,
            ..Default::default()
        });
        assert!(formatter.is_json());
        assert!(!formatter.colors_enabled());
    }

    #[test]
    fn test_formatter_no_color() {
        let formatter = Formatter::new(OutputConfig {
            no_color: true,
            ..Default::default()
        });
        assert!(!formatter.colors_enabled());
    }

    #[test]
    fn test_marked() {
        let plain = Formatter::new(OutputConfig {
            no_color: true,
            ..Default::default()
        });
        assert_eq!(plain.marked("32", '✓', "done"), "✓ done");
        assert_eq!(
            Formatter::default().marked("31", '✗', "failed"),
            "\x1b[31m✗\x1b[0m failed"
        );
    }

    #[test]
    fn test_listing_date() {
        let ts: Timestamp = "2014-10-27T16:35:40.140480Z".parse().unwrap();
        assert_eq!(listing_date(Some(ts)), "2014-10-27 16:35:40");
        assert_eq!(listing_date(None).len(), listing_date(Some(ts)).len());
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(0), "0 B");
        assert_eq!(human_size(2048), "2 KiB");
    }
}
