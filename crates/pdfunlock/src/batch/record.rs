use std::fmt;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::BatchError;

/// Lifecycle of a queued file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Success,
    Error,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Error)
    }

    /// `Pending -> Processing -> {Success, Error}`; nothing else.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Success)
                | (JobStatus::Processing, JobStatus::Error)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Success => write!(f, "success"),
            JobStatus::Error => write!(f, "error"),
        }
    }
}

/// Per-file state owned by the batch processor.
pub struct JobRecord {
    path: PathBuf,
    encrypted: bool,
    password: Option<SecretString>,
    status: JobStatus,
    error_message: Option<String>,
}

impl JobRecord {
    pub(crate) fn new(path: PathBuf, encrypted: bool, password: Option<SecretString>) -> Self {
        Self {
            path,
            encrypted,
            password,
            status: JobStatus::Pending,
            error_message: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn encrypted(&self) -> bool {
        self.encrypted
    }

    /// `Some("")` when the file opened with the empty password.
    pub fn password(&self) -> Option<&str> {
        self.password.as_ref().map(|p| p.expose_secret())
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Present exactly when the status is [`JobStatus::Error`].
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn file_name(&self) -> String {
        display_name(&self.path)
    }

    pub(crate) fn begin_processing(&mut self) -> Result<(), BatchError> {
        self.transition(JobStatus::Processing)
    }

    pub(crate) fn succeed(&mut self) -> Result<(), BatchError> {
        self.transition(JobStatus::Success)
    }

    pub(crate) fn fail(&mut self, message: String) -> Result<(), BatchError> {
        self.transition(JobStatus::Error)?;
        self.error_message = Some(message);
        Ok(())
    }

    fn transition(&mut self, next: JobStatus) -> Result<(), BatchError> {
        if !self.status.can_transition_to(next) {
            return Err(BatchError::InvalidTransition {
                path: self.path.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

impl fmt::Debug for JobRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobRecord")
            .field("path", &self.path)
            .field("encrypted", &self.encrypted)
            .field("has_password", &self.password.is_some())
            .field("status", &self.status)
            .field("error_message", &self.error_message)
            .finish()
    }
}

/// File name used in prompts and messages; falls back to the full path.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
