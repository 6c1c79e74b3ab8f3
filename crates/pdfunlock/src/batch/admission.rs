//! Classifies a newly submitted file before it may join a batch.

use std::path::Path;

use log::{debug, info, warn};
use secrecy::SecretString;

use crate::batch::record::display_name;
use crate::codec::PdfCodec;
use crate::error::{AdmissionError, CodecError};

/// Supplies passwords for encrypted files. Implemented by the UI shell.
pub trait PasswordPrompt {
    /// Asks once for the password of `filename`. `None` means the user cancelled.
    fn prompt_password(&mut self, filename: &str) -> Option<String>;
}

/// Prompt that always cancels, for non-interactive callers.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPrompt;

impl PasswordPrompt for NoPrompt {
    fn prompt_password(&mut self, _filename: &str) -> Option<String> {
        None
    }
}

impl<F> PasswordPrompt for F
where
    F: FnMut(&str) -> Option<String>,
{
    fn prompt_password(&mut self, filename: &str) -> Option<String> {
        self(filename)
    }
}

/// Outcome of inspecting a file: what the job will need to open it.
pub struct Classification {
    pub encrypted: bool,
    pub password: Option<SecretString>,
}

pub fn classify(
    codec: &dyn PdfCodec,
    path: &Path,
    prompt: &mut dyn PasswordPrompt,
) -> Result<Classification, AdmissionError> {
    let _span = tracing::info_span!("batch.admit", file = %path.display()).entered();
    let filename = display_name(path);

    let mut document = match codec.open(path) {
        Ok(document) => document,
        Err(CodecError::Locked) => {
            debug!("{} refused to parse without a password", filename);
            return resolve_with_prompt(codec, path, &filename, prompt);
        }
        Err(source) => return Err(AdmissionError::Unreadable { filename, source }),
    };

    if !document.is_encrypted() {
        return Ok(Classification {
            encrypted: false,
            password: None,
        });
    }

    // Some codecs report success for the empty password on files they cannot
    // actually read, so the page table must be readable as well
    if document.decrypt("") && document.page_count().is_ok() {
        info!("{} opened with the empty password", filename);
        return Ok(Classification {
            encrypted: true,
            password: Some(SecretString::from(String::new())),
        });
    }

    resolve_with_prompt(codec, path, &filename, prompt)
}

fn resolve_with_prompt(
    codec: &dyn PdfCodec,
    path: &Path,
    filename: &str,
    prompt: &mut dyn PasswordPrompt,
) -> Result<Classification, AdmissionError> {
    let Some(password) = prompt.prompt_password(filename) else {
        return Err(AdmissionError::PromptCancelled(filename.to_string()));
    };

    let mut document = codec.open(path).map_err(|source| match source {
        CodecError::Locked => AdmissionError::IncorrectPassword(filename.to_string()),
        source => AdmissionError::Unreadable {
            filename: filename.to_string(),
            source,
        },
    })?;

    if document.decrypt(&password) && document.page_count().is_ok() {
        info!("{} unlocked with the supplied password", filename);
        Ok(Classification {
            encrypted: true,
            password: Some(SecretString::from(password)),
        })
    } else {
        warn!("Incorrect password supplied for {}", filename);
        Err(AdmissionError::IncorrectPassword(filename.to_string()))
    }
}
