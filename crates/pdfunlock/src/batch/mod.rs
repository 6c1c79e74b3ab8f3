pub mod admission;
pub mod discovery;
pub mod processor;
pub mod record;
pub mod summary;

pub use admission::{NoPrompt, PasswordPrompt};
pub use discovery::discover_pdfs;
pub use processor::{Admission, BatchProcessor};
pub use record::{JobRecord, JobStatus};
pub use summary::{BatchSummary, FileError};
