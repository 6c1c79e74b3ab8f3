pub mod batch;
pub mod broadcast;
pub mod codec;
pub mod config;
pub mod error;
pub mod error_log;
pub mod worker;

pub use batch::{
    discover_pdfs, Admission, BatchProcessor, BatchSummary, FileError, JobRecord, JobStatus,
    NoPrompt, PasswordPrompt,
};
pub use broadcast::{BatchEvent, EventBroadcaster};
pub use codec::{LopdfCodec, PdfCodec, PdfDocument};
pub use config::{load_config, Config};
pub use error::{
    AdmissionError, BatchError, CodecError, ConfigError, ErrorLogError, Result, UnlockError,
    WorkerError,
};
pub use error_log::ErrorLog;
