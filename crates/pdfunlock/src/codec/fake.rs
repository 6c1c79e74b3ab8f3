//! In-memory codec for unit tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crossbeam_channel::Receiver;

use crate::codec::{PdfCodec, PdfDocument};
use crate::error::CodecError;

#[derive(Debug, Clone)]
pub struct FakeFile {
    /// `None` for unencrypted files.
    pub password: Option<String>,
    pub pages: usize,
    /// Open fails with [`CodecError::Locked`].
    pub locked_on_open: bool,
    /// Open fails with a parse error.
    pub corrupt: bool,
    /// Decrypt with any password "succeeds" but the page table stays unreadable.
    pub lies_about_decrypt: bool,
    /// Page copy panics, to model a codec bug.
    pub panics_on_copy: bool,
    /// Page copy blocks until a value (or disconnect) arrives here.
    pub gate: Option<Receiver<()>>,
}

impl FakeFile {
    pub fn plain(pages: usize) -> Self {
        Self {
            password: None,
            pages,
            locked_on_open: false,
            corrupt: false,
            lies_about_decrypt: false,
            panics_on_copy: false,
            gate: None,
        }
    }

    pub fn encrypted(password: &str, pages: usize) -> Self {
        Self {
            password: Some(password.to_string()),
            ..Self::plain(pages)
        }
    }
}

#[derive(Default)]
pub struct FakeCodec {
    files: Mutex<HashMap<PathBuf, FakeFile>>,
    opens: AtomicUsize,
}

impl FakeCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<P: AsRef<Path>>(&self, path: P, file: FakeFile) {
        self.files
            .lock()
            .unwrap()
            .insert(path.as_ref().to_path_buf(), file);
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Bytes the fake writes for an unlocked copy.
    pub fn copy_bytes(pages: usize) -> Vec<u8> {
        format!("%PDF-fake pages={}", pages).into_bytes()
    }
}

impl PdfCodec for FakeCodec {
    fn open(&self, path: &Path) -> Result<Box<dyn PdfDocument>, CodecError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let file = self
            .files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| CodecError::Read {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            })?;

        if file.corrupt {
            return Err(CodecError::Parse("invalid cross-reference table".to_string()));
        }
        if file.locked_on_open {
            return Err(CodecError::Locked);
        }
        Ok(Box::new(FakeDocument {
            file,
            unlocked: false,
        }))
    }

    fn placeholder(&self, message: &str) -> Result<Vec<u8>, CodecError> {
        Ok(format!("%PDF-fake placeholder: {}", message).into_bytes())
    }
}

struct FakeDocument {
    file: FakeFile,
    unlocked: bool,
}

impl PdfDocument for FakeDocument {
    fn is_encrypted(&self) -> bool {
        self.file.password.is_some()
    }

    fn decrypt(&mut self, password: &str) -> bool {
        if self.file.lies_about_decrypt {
            return true;
        }
        match &self.file.password {
            None => true,
            Some(expected) if expected == password => {
                self.unlocked = true;
                true
            }
            Some(_) => false,
        }
    }

    fn page_count(&self) -> Result<usize, CodecError> {
        if self.file.password.is_some() && !self.unlocked {
            return Err(CodecError::Locked);
        }
        Ok(self.file.pages)
    }

    fn copy_pages(&self, on_page: &mut dyn FnMut(usize, usize)) -> Result<Vec<u8>, CodecError> {
        let total = self.page_count()?;
        if self.file.panics_on_copy {
            panic!("codec exploded");
        }
        if let Some(gate) = &self.file.gate {
            let _ = gate.recv();
        }
        for done in 1..=total {
            on_page(done, total);
        }
        Ok(FakeCodec::copy_bytes(total))
    }
}
