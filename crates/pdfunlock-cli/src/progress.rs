use std::collections::HashMap;
use std::path::PathBuf;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use pdfunlock::{BatchEvent, JobRecord, JobStatus};
use tokio::sync::broadcast::{self, error::TryRecvError};

const TEMPLATE: &str = "{prefix:>24.bold} [{bar:30.cyan/blue}] {pos:>3}% {msg}";

/// One progress bar per dispatched file, driven by batch events.
pub struct BatchProgress {
    bars: HashMap<PathBuf, ProgressBar>,
}

impl BatchProgress {
    pub fn new<'a>(records: impl Iterator<Item = &'a JobRecord>) -> Self {
        let multi = MultiProgress::new();
        let style = ProgressStyle::with_template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");

        let bars = records
            .filter(|record| record.status() == JobStatus::Processing)
            .map(|record| {
                let bar = multi.add(ProgressBar::new(100));
                bar.set_style(style.clone());
                bar.set_prefix(record.file_name());
                bar.set_message("queued");
                (record.path().to_path_buf(), bar)
            })
            .collect();

        Self { bars }
    }

    /// Applies every buffered event.
    pub fn drain(&self, rx: &mut broadcast::Receiver<BatchEvent>) {
        loop {
            match rx.try_recv() {
                Ok(event) => self.apply(&event),
                Err(TryRecvError::Lagged(skipped)) => {
                    log::debug!("Progress display skipped {} events", skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
    }

    fn apply(&self, event: &BatchEvent) {
        let Some(bar) = event.path().and_then(|path| self.bars.get(path)) else {
            return;
        };
        match event {
            BatchEvent::Progress { percent, .. } => {
                bar.set_position(u64::from(*percent));
                bar.set_message("unlocking");
            }
            BatchEvent::StatusChanged {
                status: JobStatus::Success,
                ..
            } => settle(bar, JobStatus::Success, None),
            BatchEvent::Error { message, .. } => {
                settle(bar, JobStatus::Error, Some(message.as_str()))
            }
            _ => {}
        }
    }

    /// Brings every bar in line with the final records, covering events the
    /// receiver lagged past.
    pub fn finish<'a>(self, records: impl Iterator<Item = &'a JobRecord>) {
        for record in records {
            if let Some(bar) = self.bars.get(record.path()) {
                settle(bar, record.status(), record.error_message());
            }
        }
        for bar in self.bars.values() {
            if !bar.is_finished() {
                bar.abandon();
            }
        }
    }
}

fn settle(bar: &ProgressBar, status: JobStatus, error: Option<&str>) {
    match status {
        JobStatus::Success => {
            bar.set_position(100);
            bar.finish_with_message("done");
        }
        JobStatus::Error => bar.abandon_with_message(error.unwrap_or("failed").to_string()),
        JobStatus::Pending | JobStatus::Processing => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn display(paths: &[&str]) -> BatchProgress {
        let bars = paths
            .iter()
            .map(|path| (PathBuf::from(path), ProgressBar::hidden()))
            .collect();
        BatchProgress { bars }
    }

    #[test]
    fn test_events_drive_bars() {
        let progress = display(&["/in/a.pdf"]);
        let path = PathBuf::from("/in/a.pdf");

        progress.apply(&BatchEvent::Progress {
            path: path.clone(),
            percent: 30,
        });
        let bar = &progress.bars[&path];
        assert_eq!(bar.position(), 30);
        assert!(!bar.is_finished());

        progress.apply(&BatchEvent::StatusChanged {
            path,
            status: JobStatus::Success,
        });
        assert!(bar.is_finished());
        assert_eq!(bar.message(), "done");
    }

    #[test]
    fn test_settle_covers_missed_events() {
        let progress = display(&["/in/a.pdf", "/in/b.pdf"]);
        let a = &progress.bars[&PathBuf::from("/in/a.pdf")];
        let b = &progress.bars[&PathBuf::from("/in/b.pdf")];
        a.set_position(50);

        // No terminal events were seen; the final statuses arrive afterwards
        settle(a, JobStatus::Success, None);
        settle(b, JobStatus::Error, Some("File already exists"));

        assert!(a.is_finished());
        assert_eq!(a.position(), 100);
        assert_eq!(a.message(), "done");
        assert!(b.is_finished());
        assert_eq!(b.message(), "File already exists");
    }
}
