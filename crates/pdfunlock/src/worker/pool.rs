use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info};

use crate::codec::PdfCodec;
use crate::error::WorkerError;
use crate::worker::job::{
    self, JobFailure, JobMessage, MonotonicProgress, ProgressReporter, UnlockJob,
};

/// Fixed set of threads running unlock jobs. Results come back as
/// [`JobMessage`]s; the pool itself keeps no per-file state.
pub struct WorkerPool {
    job_sender: Sender<UnlockJob>,
    message_receiver: Receiver<JobMessage>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerPool {
    pub fn new(codec: Arc<dyn PdfCodec>, worker_count: usize) -> Result<Self, WorkerError> {
        let worker_count = worker_count.max(1);
        // Unbounded: neither side may block on the other
        let (job_sender, job_receiver) = unbounded::<UnlockJob>();
        let (message_sender, message_receiver) = unbounded::<JobMessage>();
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let job_rx = job_receiver.clone();
            let message_tx = message_sender.clone();
            let shutdown_flag = Arc::clone(&shutdown);
            let worker_codec = Arc::clone(&codec);

            let handle = thread::Builder::new()
                .name(format!("pdfunlock-worker-{}", worker_id))
                .spawn(move || {
                    run_worker(worker_id, job_rx, message_tx, shutdown_flag, worker_codec);
                })
                .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;

            workers.push(handle);
        }

        info!("Started {} workers", worker_count);

        Ok(Self {
            job_sender,
            message_receiver,
            workers,
            shutdown,
        })
    }

    pub fn submit(&self, job: UnlockJob) -> Result<(), WorkerError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(WorkerError::ChannelClosed);
        }

        self.job_sender
            .send(job)
            .map_err(|_| WorkerError::ChannelClosed)
    }

    pub fn try_recv_message(&self) -> Option<JobMessage> {
        self.message_receiver.try_recv().ok()
    }

    pub fn recv_message(&self) -> Option<JobMessage> {
        self.message_receiver.recv().ok()
    }

    pub fn recv_message_timeout(&self, timeout: Duration) -> Option<JobMessage> {
        self.message_receiver.recv_timeout(timeout).ok()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn wait(self) {
        // Drop sender to signal workers to exit
        drop(self.job_sender);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All workers have stopped");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

/// Forwards progress values to the control thread.
struct ChannelProgress<'a> {
    path: PathBuf,
    sender: &'a Sender<JobMessage>,
}

impl ProgressReporter for ChannelProgress<'_> {
    fn report(&self, percent: u8) {
        let _ = self.sender.send(JobMessage::Progress {
            path: self.path.clone(),
            percent,
        });
    }
}

fn run_worker(
    worker_id: usize,
    job_receiver: Receiver<UnlockJob>,
    message_sender: Sender<JobMessage>,
    shutdown: Arc<AtomicBool>,
    codec: Arc<dyn PdfCodec>,
) {
    debug!("Worker {} started", worker_id);

    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!("Worker {} received shutdown signal", worker_id);
            break;
        }

        match job_receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(job) => {
                debug!("Worker {} processing {:?}", worker_id, job.source_path);
                let message = execute(&job, codec.as_ref(), &message_sender);

                if let Err(e) = message_sender.send(message) {
                    error!("Worker {} failed to send result: {}", worker_id, e);
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                debug!("Worker {} job channel disconnected", worker_id);
                break;
            }
        }
    }

    debug!("Worker {} stopped", worker_id);
}

/// Runs one job to a terminal message. A panic inside the codec becomes a
/// failure for that file and the worker keeps going.
fn execute(job: &UnlockJob, codec: &dyn PdfCodec, sender: &Sender<JobMessage>) -> JobMessage {
    let progress = MonotonicProgress::new(ChannelProgress {
        path: job.source_path.clone(),
        sender,
    });

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| job::run(job, codec, &progress)));

    let path = job.source_path.clone();
    match outcome {
        Ok(Ok(output_path)) => JobMessage::Finished { path, output_path },
        Ok(Err(failure)) => JobMessage::Failed { path, failure },
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!("Job for {} panicked: {}", path.display(), reason);
            JobMessage::Failed {
                path,
                failure: JobFailure::Failed(format!("Internal error: {}", reason)),
            }
        }
    }
}
