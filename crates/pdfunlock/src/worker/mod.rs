pub mod job;
pub mod pool;

pub use job::{JobFailure, JobMessage, ProgressReporter, UnlockJob};
pub use pool::WorkerPool;
