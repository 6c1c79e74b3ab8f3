use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Prefix put in front of the original file name of every output artifact.
pub const DEFAULT_OUTPUT_PREFIX: &str = "unlocked_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Number of pool threads running unlock jobs.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default = "default_output_prefix")]
    pub output_prefix: String,
    /// Replace existing output files instead of reporting them as errors.
    #[serde(default)]
    pub overwrite: bool,
    /// Where failed files are recorded. Falls back to the per-user config directory.
    #[serde(default)]
    pub error_log_path: Option<PathBuf>,
    /// Buffer size of the event channel handed to subscribers.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_worker_count() -> usize {
    num_cpus::get()
}

fn default_output_prefix() -> String {
    DEFAULT_OUTPUT_PREFIX.to_string()
}

fn default_event_capacity() -> usize {
    1024
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            output_prefix: default_output_prefix(),
            overwrite: false,
            error_log_path: None,
            event_capacity: default_event_capacity(),
        }
    }
}

impl Config {
    /// Resolves the error log location, preferring the configured path.
    pub fn resolved_error_log_path(&self) -> PathBuf {
        self.error_log_path
            .clone()
            .or_else(crate::error_log::ErrorLog::default_path)
            .unwrap_or_else(|| std::env::temp_dir().join("pdfunlock").join("error_log.txt"))
    }
}
