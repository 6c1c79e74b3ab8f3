use std::cell::Cell;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use secrecy::{ExposeSecret, SecretString};

use crate::codec::{PdfCodec, PLACEHOLDER_TEXT};

pub const PROGRESS_OPENED: u8 = 10;
pub const PROGRESS_ENCRYPTION_CHECKED: u8 = 30;
pub const PROGRESS_COPY_STARTED: u8 = 50;
pub const PROGRESS_COPY_FINISHED: u8 = 90;
pub const PROGRESS_DONE: u8 = 100;

/// Everything a worker needs to unlock one file. Nothing here is shared.
pub struct UnlockJob {
    pub source_path: PathBuf,
    /// Password resolved at admission, `None` when none was needed.
    pub password: Option<SecretString>,
    pub output_directory: PathBuf,
    pub overwrite: bool,
    pub output_prefix: String,
}

impl UnlockJob {
    /// `<output_directory>/<prefix><file name>`.
    pub fn destination(&self) -> Option<PathBuf> {
        let name = self.source_path.file_name()?;
        let mut file_name = std::ffi::OsString::from(&self.output_prefix);
        file_name.push(name);
        Some(self.output_directory.join(file_name))
    }
}

impl fmt::Debug for UnlockJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnlockJob")
            .field("source_path", &self.source_path)
            .field("has_password", &self.password.is_some())
            .field("output_directory", &self.output_directory)
            .field("overwrite", &self.overwrite)
            .field("output_prefix", &self.output_prefix)
            .finish()
    }
}

/// Why a job ended without an unlocked copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobFailure {
    /// Destination exists and overwriting is off; the source was not read.
    AlreadyExists,
    /// No password opened the file; a placeholder was written instead.
    Placeholder { output_path: PathBuf },
    /// I/O or codec failure; nothing was left at the destination.
    Failed(String),
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobFailure::AlreadyExists => write!(f, "File already exists"),
            JobFailure::Placeholder { .. } => write!(
                f,
                "Could not be unlocked (missing or incorrect password); placeholder written"
            ),
            JobFailure::Failed(message) => write!(f, "{}", message),
        }
    }
}

/// Messages sent from a worker back to the control thread.
#[derive(Debug, Clone)]
pub enum JobMessage {
    Progress { path: PathBuf, percent: u8 },
    Finished { path: PathBuf, output_path: PathBuf },
    Failed { path: PathBuf, failure: JobFailure },
}

impl JobMessage {
    pub fn path(&self) -> &Path {
        match self {
            JobMessage::Progress { path, .. }
            | JobMessage::Finished { path, .. }
            | JobMessage::Failed { path, .. } => path,
        }
    }
}

pub trait ProgressReporter {
    fn report(&self, percent: u8);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _percent: u8) {}
}

/// Drops any value lower than or equal to the last one reported.
pub struct MonotonicProgress<R> {
    inner: R,
    last: Cell<Option<u8>>,
}

impl<R: ProgressReporter> MonotonicProgress<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            last: Cell::new(None),
        }
    }
}

impl<R: ProgressReporter> ProgressReporter for MonotonicProgress<R> {
    fn report(&self, percent: u8) {
        let percent = percent.min(PROGRESS_DONE);
        if self.last.get().is_some_and(|last| percent <= last) {
            return;
        }
        self.last.set(Some(percent));
        self.inner.report(percent);
    }
}

/// Unlocks one file and writes its copy (or a placeholder) to the destination.
pub fn run(
    job: &UnlockJob,
    codec: &dyn PdfCodec,
    progress: &dyn ProgressReporter,
) -> Result<PathBuf, JobFailure> {
    let _span = tracing::info_span!("job.unlock", file = %job.source_path.display()).entered();

    let destination = job.destination().ok_or_else(|| {
        JobFailure::Failed(format!(
            "'{}' has no file name",
            job.source_path.display()
        ))
    })?;

    if !job.overwrite && destination.exists() {
        debug!("Skipping {}: destination exists", job.source_path.display());
        return Err(JobFailure::AlreadyExists);
    }

    let mut document = match codec.open(&job.source_path) {
        Ok(document) => Some(document),
        Err(crate::error::CodecError::Locked) => None,
        Err(e) => return Err(JobFailure::Failed(e.to_string())),
    };
    progress.report(PROGRESS_OPENED);

    let unlocked = match document.as_mut() {
        None => false,
        Some(document) if !document.is_encrypted() => true,
        Some(document) => {
            let stored = job.password.as_ref().map(|p| p.expose_secret());
            let with_stored = stored.is_some_and(|password| document.decrypt(password));
            // Admission already validated the stored password; retrying the
            // empty one only covers codecs that disagree with themselves
            with_stored || {
                let opened = document.decrypt("");
                if opened && stored.is_some_and(|p| !p.is_empty()) {
                    warn!(
                        "{} rejected its stored password but opened with the empty one",
                        job.source_path.display()
                    );
                }
                opened
            }
        }
    };
    progress.report(PROGRESS_ENCRYPTION_CHECKED);

    let document = match document {
        Some(document) if unlocked => document,
        _ => {
            let bytes = codec
                .placeholder(PLACEHOLDER_TEXT)
                .map_err(|e| JobFailure::Failed(e.to_string()))?;
            write_output(&destination, &bytes, job.overwrite)?;
            info!(
                "Wrote placeholder for {} to {}",
                job.source_path.display(),
                destination.display()
            );
            return Err(JobFailure::Placeholder {
                output_path: destination,
            });
        }
    };

    progress.report(PROGRESS_COPY_STARTED);
    let span = usize::from(PROGRESS_COPY_FINISHED - PROGRESS_COPY_STARTED);
    let bytes = document
        .copy_pages(&mut |copied, total| {
            let step = span * copied / total.max(1);
            progress.report(PROGRESS_COPY_STARTED + step as u8);
        })
        .map_err(|e| JobFailure::Failed(e.to_string()))?;

    write_output(&destination, &bytes, job.overwrite)?;
    progress.report(PROGRESS_DONE);

    info!(
        "Unlocked {} -> {}",
        job.source_path.display(),
        destination.display()
    );
    Ok(destination)
}

/// Writes to a temporary file beside the destination and renames it into
/// place, so a failure never leaves a truncated file at `destination`.
fn write_output(destination: &Path, content: &[u8], overwrite: bool) -> Result<(), JobFailure> {
    let directory = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp = tempfile::Builder::new()
        .prefix(".pdfunlock-")
        .suffix(".partial")
        .tempfile_in(directory)
        .map_err(|e| {
            JobFailure::Failed(format!(
                "Failed to create temporary file in '{}': {}",
                directory.display(),
                e
            ))
        })?;

    temp.write_all(content)
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| {
            JobFailure::Failed(format!(
                "Failed to write '{}': {}",
                destination.display(),
                e
            ))
        })?;

    let persisted = if overwrite {
        temp.persist(destination)
    } else {
        // Atomic check-and-create, another writer may have raced us here
        temp.persist_noclobber(destination)
    };

    match persisted {
        Ok(_) => Ok(()),
        Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
            Err(JobFailure::AlreadyExists)
        }
        Err(e) => Err(JobFailure::Failed(format!(
            "Failed to write '{}': {}",
            destination.display(),
            e.error
        ))),
    }
}
