//! Narrow seam around the PDF library.
//!
//! The batch pipeline only needs to open a file, learn whether it is
//! encrypted, try passwords, count pages, and write a fresh document made of
//! the source pages. Everything else stays inside the codec implementation.

#[cfg(test)]
pub(crate) mod fake;
pub mod lopdf_codec;
pub mod placeholder;

use std::path::Path;

use crate::error::CodecError;

pub use lopdf_codec::LopdfCodec;

/// Text written on the single page of a placeholder artifact.
pub const PLACEHOLDER_TEXT: &str =
    "This PDF was encrypted and couldn't be decrypted due to missing or incorrect password.";

/// An opened source document. Each handle is owned by exactly one caller.
pub trait PdfDocument: Send {
    fn is_encrypted(&self) -> bool;

    /// Attempts to open the document with `password`. The empty string is a
    /// valid attempt. Returns `true` when the contents are readable afterwards.
    /// Unencrypted documents accept any password.
    fn decrypt(&mut self, password: &str) -> bool;

    fn page_count(&self) -> Result<usize, CodecError>;

    /// Copies every page, in order, into a fresh document and serializes it.
    /// `on_page(copied, total)` is called after each page.
    fn copy_pages(&self, on_page: &mut dyn FnMut(usize, usize)) -> Result<Vec<u8>, CodecError>;
}

pub trait PdfCodec: Send + Sync {
    /// Opens `path`. [`CodecError::Locked`] means the file is encrypted and the
    /// library refused to parse it without a password.
    fn open(&self, path: &Path) -> Result<Box<dyn PdfDocument>, CodecError>;

    /// Renders a one-page document showing `message`.
    fn placeholder(&self, message: &str) -> Result<Vec<u8>, CodecError>;
}
