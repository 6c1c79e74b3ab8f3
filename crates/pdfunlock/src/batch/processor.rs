//! The batch processor: owns every queued file and drives runs to completion.
//!
//! All mutation happens on the thread that owns the processor. Workers only
//! see an [`UnlockJob`] and report back through the pool's message channel,
//! which this type drains in [`BatchProcessor::poll`],
//! [`BatchProcessor::wait_timeout`] and [`BatchProcessor::wait_for_completion`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use indexmap::{IndexMap, IndexSet};
use log::{debug, error, info, warn};
use secrecy::SecretString;
use tokio::sync::broadcast;

use crate::batch::admission::{self, PasswordPrompt};
use crate::batch::record::{JobRecord, JobStatus};
use crate::batch::summary::{BatchSummary, FileError};
use crate::broadcast::{BatchEvent, EventBroadcaster};
use crate::codec::{LopdfCodec, PdfCodec};
use crate::config::Config;
use crate::error::{AdmissionError, BatchError, CodecError};
use crate::error_log::ErrorLog;
use crate::worker::{JobFailure, JobMessage, UnlockJob, WorkerPool};

/// Result of a successful [`BatchProcessor::admit_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// The path was already in the batch; nothing changed.
    AlreadyQueued,
}

/// Bookkeeping for the run in progress.
#[derive(Default)]
struct RunState {
    dispatched: IndexSet<PathBuf>,
    in_flight: usize,
    success: usize,
    errors: Vec<FileError>,
    placeholders: usize,
}

impl RunState {
    fn contains(&self, path: &Path) -> bool {
        self.dispatched.contains(path)
    }
}

pub struct BatchProcessor {
    records: IndexMap<PathBuf, JobRecord>,
    codec: Arc<dyn PdfCodec>,
    pool: Option<WorkerPool>,
    events: EventBroadcaster,
    error_log: ErrorLog,
    output_prefix: String,
    run: Option<RunState>,
    last_summary: Option<BatchSummary>,
}

impl BatchProcessor {
    /// Creates a processor backed by [`LopdfCodec`].
    pub fn new(config: &Config) -> crate::Result<Self> {
        Self::with_codec(config, Arc::new(LopdfCodec::new()))
    }

    pub fn with_codec(config: &Config, codec: Arc<dyn PdfCodec>) -> crate::Result<Self> {
        let pool = WorkerPool::new(Arc::clone(&codec), config.worker_count)?;
        let error_log = ErrorLog::new(config.resolved_error_log_path());
        debug!("Error log at {}", error_log.path().display());

        Ok(Self {
            records: IndexMap::new(),
            codec,
            pool: Some(pool),
            events: EventBroadcaster::new(config.event_capacity),
            error_log,
            output_prefix: config.output_prefix.clone(),
            run: None,
            last_summary: None,
        })
    }

    /// Inspects `path` and queues it as `Pending`, asking `prompt` at most once
    /// when the file needs a password. Rejected files are never queued.
    pub fn admit_file<P: AsRef<Path>>(
        &mut self,
        path: P,
        prompt: &mut dyn PasswordPrompt,
    ) -> Result<Admission, AdmissionError> {
        let path = normalize(path.as_ref()).map_err(|source| AdmissionError::Unreadable {
            filename: crate::batch::record::display_name(path.as_ref()),
            source,
        })?;

        if self.records.contains_key(&path) {
            debug!("{} is already queued", path.display());
            return Ok(Admission::AlreadyQueued);
        }

        let classification = admission::classify(self.codec.as_ref(), &path, prompt)?;
        info!(
            "Queued {} ({})",
            path.display(),
            if classification.encrypted {
                "encrypted"
            } else {
                "not encrypted"
            }
        );

        let record = JobRecord::new(
            path.clone(),
            classification.encrypted,
            classification.password,
        );
        self.records.insert(path, record);
        Ok(Admission::Admitted)
    }

    /// Drops a record. Files belonging to the run in progress cannot be
    /// removed, even once they have finished.
    pub fn remove_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), BatchError> {
        let path = normalize(path.as_ref()).unwrap_or_else(|_| path.as_ref().to_path_buf());
        match self.records.get(&path).map(JobRecord::status) {
            None => Err(BatchError::UnknownFile(path)),
            Some(JobStatus::Processing) => Err(BatchError::FileBusy(path)),
            Some(_) if self.run.as_ref().is_some_and(|run| run.contains(&path)) => {
                Err(BatchError::FileBusy(path))
            }
            Some(_) => {
                self.records.shift_remove(&path);
                debug!("Removed {}", path.display());
                Ok(())
            }
        }
    }

    /// Empties the batch. Refused while a run is in progress.
    pub fn clear(&mut self) -> Result<usize, BatchError> {
        if let Some(busy) = self.run.as_ref().and_then(|run| run.dispatched.first()) {
            return Err(BatchError::FileBusy(busy.clone()));
        }
        let removed = self.records.len();
        self.records.clear();
        debug!("Cleared {} records", removed);
        Ok(removed)
    }

    /// Records in admission order.
    pub fn records(&self) -> impl Iterator<Item = &JobRecord> {
        self.records.values()
    }

    pub fn record<P: AsRef<Path>>(&self, path: P) -> Option<&JobRecord> {
        let path = path.as_ref();
        self.records.get(path).or_else(|| {
            normalize(path)
                .ok()
                .and_then(|normalized| self.records.get(&normalized))
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.count(JobStatus::Pending)
    }

    /// `true` while dispatched files have not all reported back.
    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BatchEvent> {
        self.events.subscribe()
    }

    pub fn error_log(&self) -> &ErrorLog {
        &self.error_log
    }

    /// Summary of the most recently completed run.
    pub fn last_summary(&self) -> Option<&BatchSummary> {
        self.last_summary.as_ref()
    }

    /// Moves every pending record to processing and submits one job per file.
    /// Returns the number of files dispatched.
    ///
    /// Starting again while a run is in progress adds the new pending files
    /// to that run.
    pub fn start_batch(
        &mut self,
        output_directory: Option<&Path>,
        overwrite: bool,
    ) -> Result<usize, BatchError> {
        if self.records.is_empty() {
            info!("No files to process");
            return Err(BatchError::NothingToDo);
        }
        let Some(output_directory) = output_directory else {
            warn!("No output directory selected");
            return Err(BatchError::NoOutputDirectory);
        };
        if !output_directory.is_dir() {
            return Err(BatchError::OutputDirectoryMissing(
                output_directory.to_path_buf(),
            ));
        }
        let output_directory = normalize(output_directory)
            .unwrap_or_else(|_| output_directory.to_path_buf());

        let pending: Vec<PathBuf> = self
            .records
            .values()
            .filter(|r| r.status() == JobStatus::Pending)
            .map(|r| r.path().to_path_buf())
            .collect();
        if pending.is_empty() {
            info!("No pending files to process");
            return Err(BatchError::NothingToDo);
        }

        let _span = tracing::info_span!("batch.start", files = pending.len()).entered();
        info!(
            "Starting batch of {} files into {}",
            pending.len(),
            output_directory.display()
        );

        let mut jobs = Vec::with_capacity(pending.len());
        let run = self.run.get_or_insert_with(RunState::default);
        for path in &pending {
            let Some(record) = self.records.get_mut(path) else {
                continue;
            };
            record.begin_processing()?;
            run.dispatched.insert(path.clone());
            run.in_flight += 1;
            self.events.send(BatchEvent::StatusChanged {
                path: path.clone(),
                status: JobStatus::Processing,
            });

            jobs.push(UnlockJob {
                source_path: path.clone(),
                password: record
                    .password()
                    .map(|p| SecretString::from(p.to_string())),
                output_directory: output_directory.clone(),
                overwrite,
                output_prefix: self.output_prefix.clone(),
            });
        }

        let dispatched = jobs.len();
        for job in jobs {
            let path = job.source_path.clone();
            let submitted = match self.pool.as_ref() {
                Some(pool) => pool.submit(job),
                None => Err(crate::error::WorkerError::ChannelClosed),
            };
            if let Err(e) = submitted {
                error!("Failed to submit {}: {}", path.display(), e);
                self.handle_message(JobMessage::Failed {
                    path,
                    failure: JobFailure::Failed(e.to_string()),
                });
            }
        }

        Ok(dispatched)
    }

    /// Handles every message already waiting. Returns the summary when the
    /// run completed during this call.
    pub fn poll(&mut self) -> Option<BatchSummary> {
        let mut summary = None;
        while let Some(message) = self.pool.as_ref().and_then(WorkerPool::try_recv_message) {
            summary = self.handle_message(message).or(summary);
        }
        summary
    }

    /// Blocks up to `timeout` for the next message, then drains the rest.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Option<BatchSummary> {
        if self.run.is_none() {
            return None;
        }
        let first = self
            .pool
            .as_ref()
            .and_then(|pool| pool.recv_message_timeout(timeout));
        let summary = first.and_then(|message| self.handle_message(message));
        summary.or_else(|| self.poll())
    }

    /// Blocks until the current run completes. Returns `None` when no run is
    /// in progress.
    pub fn wait_for_completion(&mut self) -> Option<BatchSummary> {
        while self.run.is_some() {
            let Some(message) = self.pool.as_ref().and_then(WorkerPool::recv_message) else {
                error!("Worker channel closed with files still processing");
                return None;
            };
            if let Some(summary) = self.handle_message(message) {
                return Some(summary);
            }
        }
        None
    }

    fn handle_message(&mut self, message: JobMessage) -> Option<BatchSummary> {
        match message {
            JobMessage::Progress { path, percent } => {
                if self.record(&path).map(JobRecord::status) == Some(JobStatus::Processing) {
                    self.events.send(BatchEvent::Progress { path, percent });
                }
                None
            }
            JobMessage::Finished { path, output_path } => {
                debug!("{} written to {}", path.display(), output_path.display());
                if let Some(record) = self.records.get_mut(&path) {
                    match record.succeed() {
                        Ok(()) => self.events.send(BatchEvent::StatusChanged {
                            path: path.clone(),
                            status: JobStatus::Success,
                        }),
                        Err(e) => {
                            warn!("{}", e);
                            return None;
                        }
                    }
                }
                if let Some(run) = self.run.as_mut().filter(|run| run.contains(&path)) {
                    run.success += 1;
                }
                self.finish_one(&path)
            }
            JobMessage::Failed { path, failure } => {
                self.record_failure(&path, &failure);
                self.finish_one(&path)
            }
        }
    }

    fn record_failure(&mut self, path: &Path, failure: &JobFailure) {
        let message = failure.to_string();
        warn!("{} failed: {}", path.display(), message);

        if let Some(record) = self.records.get_mut(path) {
            if let Err(e) = record.fail(message.clone()) {
                warn!("{}", e);
                return;
            }
        }

        if let Err(e) = self.error_log.append(path, &message) {
            error!("Could not record failure of {}: {}", path.display(), e);
        }

        self.events.send(BatchEvent::StatusChanged {
            path: path.to_path_buf(),
            status: JobStatus::Error,
        });
        self.events.send(BatchEvent::Error {
            path: path.to_path_buf(),
            message: message.clone(),
        });

        if let Some(run) = self.run.as_mut().filter(|run| run.contains(path)) {
            if matches!(failure, JobFailure::Placeholder { .. }) {
                run.placeholders += 1;
            }
            run.errors.push(FileError {
                path: path.to_path_buf(),
                message,
            });
        }
    }

    /// Counts down the run; emits the summary once every dispatched file is terminal.
    fn finish_one(&mut self, path: &Path) -> Option<BatchSummary> {
        let run = self.run.as_mut()?;
        if !run.dispatched.contains(path) {
            warn!("Ignoring result for {}, not part of this run", path.display());
            return None;
        }
        run.in_flight = run.in_flight.saturating_sub(1);
        if run.in_flight > 0 {
            return None;
        }

        let run = self.run.take()?;
        let summary = BatchSummary {
            success: run.success,
            error: run.errors.len(),
            placeholders: run.placeholders,
            total: run.dispatched.len(),
            errors: run.errors,
        };

        info!(
            "Batch complete: {} succeeded, {} failed, {} total",
            summary.success, summary.error, summary.total
        );
        self.events.send(BatchEvent::BatchComplete {
            success: summary.success,
            error: summary.error,
            total: summary.total,
        });
        if !summary.errors.is_empty() {
            info!("Failed files are recorded in {}", self.error_log.path().display());
            self.events.send(BatchEvent::ErrorsReported {
                errors: summary.errors.clone(),
            });
        }

        self.last_summary = Some(summary.clone());
        Some(summary)
    }

    fn count(&self, status: JobStatus) -> usize {
        self.records
            .values()
            .filter(|r| r.status() == status)
            .count()
    }
}

impl Drop for BatchProcessor {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.shutdown();
            pool.wait();
        }
    }
}

/// Absolute form of `path`, used as the record key.
fn normalize(path: &Path) -> Result<PathBuf, CodecError> {
    std::path::absolute(path).map_err(|source| CodecError::Read {
        path: path.to_path_buf(),
        source,
    })
}
