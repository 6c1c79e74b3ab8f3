//! Persistent, append-only record of files that failed to unlock.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};

use crate::error::ErrorLogError;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Error log file shared by every batch of the process.
///
/// The file is only created on the first [`append`](ErrorLog::append) and is
/// never truncated or rotated. Each entry is a single line:
/// `[YYYY-MM-DD HH:MM:SS] <path>: <message>`.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Default per-user location of the log.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("pdfunlock").join("error_log.txt"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Appends one entry stamped with the current local time.
    pub fn append(&self, file: &Path, message: &str) -> Result<(), ErrorLogError> {
        self.append_at(Local::now(), file, message)
    }

    pub fn append_at<Tz: TimeZone>(
        &self,
        timestamp: DateTime<Tz>,
        file: &Path,
        message: &str,
    ) -> Result<(), ErrorLogError>
    where
        Tz::Offset: std::fmt::Display,
    {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| ErrorLogError::CreateDirectory {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        let line = format_entry(&timestamp.format(TIMESTAMP_FORMAT).to_string(), file, message);

        let mut handle = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| ErrorLogError::Write {
                path: self.path.clone(),
                source: e,
            })?;

        handle
            .write_all(line.as_bytes())
            .map_err(|e| ErrorLogError::Write {
                path: self.path.clone(),
                source: e,
            })
    }

    /// Reads back every entry, oldest first. A log that was never written is empty.
    pub fn read_entries(&self) -> Result<Vec<String>, ErrorLogError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(content.lines().map(str::to_string).collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(ErrorLogError::Read {
                path: self.path.clone(),
                source: e,
            }),
        }
    }
}

fn format_entry(timestamp: &str, file: &Path, message: &str) -> String {
    // One entry per line, whatever the codec put in its message
    let message = message.replace(['\r', '\n'], " ");
    format!("[{}] {}: {}\n", timestamp, file.display(), message.trim())
}
