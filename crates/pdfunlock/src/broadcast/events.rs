use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;

use crate::batch::{FileError, JobStatus};

/// Notification emitted by the batch processor.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchEvent {
    StatusChanged {
        path: PathBuf,
        status: JobStatus,
    },
    /// Percentage in `0..=100`, never decreasing for one file within a run.
    Progress {
        path: PathBuf,
        percent: u8,
    },
    Error {
        path: PathBuf,
        message: String,
    },
    BatchComplete {
        success: usize,
        error: usize,
        total: usize,
    },
    /// Every failure of the run, sent once after `BatchComplete` when non-empty.
    ErrorsReported {
        errors: Vec<FileError>,
    },
}

impl BatchEvent {
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            BatchEvent::StatusChanged { path, .. }
            | BatchEvent::Progress { path, .. }
            | BatchEvent::Error { path, .. } => Some(path),
            BatchEvent::BatchComplete { .. } | BatchEvent::ErrorsReported { .. } => None,
        }
    }
}

/// Broadcasts batch events for UI shells.
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: Arc<broadcast::Sender<BatchEvent>>,
}

impl EventBroadcaster {
    /// Creates a new broadcaster with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Sends an event to all subscribers.
    pub fn send(&self, event: BatchEvent) {
        // Ignore errors - no active receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BatchEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(1024)
    }
}
