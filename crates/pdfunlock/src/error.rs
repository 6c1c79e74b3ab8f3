use std::path::PathBuf;
use thiserror::Error;

use crate::batch::JobStatus;

#[derive(Error, Debug)]
pub enum UnlockError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("PDF error: {0}")]
    Codec(#[from] CodecError),

    #[error("Admission error: {0}")]
    Admission(#[from] AdmissionError),

    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),

    #[error("Error log: {0}")]
    ErrorLog(#[from] ErrorLogError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is encrypted and has not been decrypted yet.
    #[error("File has not been decrypted")]
    Locked,

    #[error("Failed to parse PDF: {0}")]
    Parse(String),

    #[error("Unreadable page tree: {0}")]
    PageTree(String),

    #[error("Failed to write PDF: {0}")]
    Write(String),
}

#[derive(Error, Debug)]
pub enum AdmissionError {
    #[error("Error reading {filename}: {source}")]
    Unreadable {
        filename: String,
        #[source]
        source: CodecError,
    },

    #[error("Incorrect password for {0}")]
    IncorrectPassword(String),

    #[error("Password entry cancelled for {0}")]
    PromptCancelled(String),
}

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("No files to process")]
    NothingToDo,

    #[error("No output directory selected")]
    NoOutputDirectory,

    #[error("Output directory '{0}' does not exist")]
    OutputDirectoryMissing(PathBuf),

    #[error("'{0}' is not part of the batch")]
    UnknownFile(PathBuf),

    #[error("'{0}' is still being processed")]
    FileBusy(PathBuf),

    #[error("Invalid status change for '{path}': {from} -> {to}")]
    InvalidTransition {
        path: PathBuf,
        from: JobStatus,
        to: JobStatus,
    },
}

#[derive(Error, Debug)]
pub enum ErrorLogError {
    #[error("Failed to create log directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write error log '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read error log '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(String),

    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, UnlockError>;
