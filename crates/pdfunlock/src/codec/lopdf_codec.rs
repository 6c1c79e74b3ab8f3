use std::collections::BTreeMap;
use std::path::Path;

use log::debug;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};

use crate::codec::{placeholder, PdfCodec, PdfDocument};
use crate::error::CodecError;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guards against cyclic /Parent chains in broken files.
const MAX_TREE_DEPTH: usize = 64;

/// [`PdfCodec`] backed by `lopdf`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfCodec;

impl LopdfCodec {
    pub fn new() -> Self {
        Self
    }
}

impl PdfCodec for LopdfCodec {
    fn open(&self, path: &Path) -> Result<Box<dyn PdfDocument>, CodecError> {
        let bytes = std::fs::read(path).map_err(|e| CodecError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        let inner = load(&bytes)?;
        // The reader may already have opened an empty-password file, in which
        // case the trailer can lose its /Encrypt entry.
        let encrypted = inner.is_encrypted() || inner.encryption_state.is_some();

        Ok(Box::new(LopdfDocument {
            bytes,
            inner,
            encrypted,
            unlocked: false,
        }))
    }

    fn placeholder(&self, message: &str) -> Result<Vec<u8>, CodecError> {
        placeholder::render(message)
    }
}

fn load(bytes: &[u8]) -> Result<Document, CodecError> {
    Document::load_mem(bytes).map_err(|e| match e {
        lopdf::Error::Decryption(_) => CodecError::Locked,
        other => CodecError::Parse(other.to_string()),
    })
}

struct LopdfDocument {
    /// Raw file contents; every decryption attempt starts from these.
    bytes: Vec<u8>,
    inner: Document,
    encrypted: bool,
    unlocked: bool,
}

impl LopdfDocument {
    fn readable(&self) -> Result<&Document, CodecError> {
        if self.encrypted && !self.unlocked {
            return Err(CodecError::Locked);
        }
        Ok(&self.inner)
    }
}

impl PdfDocument for LopdfDocument {
    fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    fn decrypt(&mut self, password: &str) -> bool {
        if !self.encrypted || self.unlocked {
            return true;
        }

        // Work on a fresh parse so a failed attempt leaves no half-decrypted objects behind
        let mut candidate = match load(&self.bytes) {
            Ok(doc) => doc,
            Err(e) => {
                debug!("Reload for decryption failed: {}", e);
                return false;
            }
        };

        let accepted = if candidate.encryption_state.is_some() {
            // Already opened by the reader with the empty user password
            password.is_empty() || candidate.authenticate_password(password).is_ok()
        } else {
            match candidate.decrypt(password) {
                Ok(()) => true,
                Err(e) => {
                    debug!("Decryption attempt rejected: {}", e);
                    false
                }
            }
        };

        if accepted {
            self.inner = candidate;
            self.unlocked = true;
        }
        accepted
    }

    fn page_count(&self) -> Result<usize, CodecError> {
        let doc = self.readable()?;
        let count = doc.get_pages().len();
        if count == 0 {
            return Err(CodecError::PageTree("document has no pages".to_string()));
        }
        Ok(count)
    }

    fn copy_pages(&self, on_page: &mut dyn FnMut(usize, usize)) -> Result<Vec<u8>, CodecError> {
        let source = self.readable()?;
        let pages = source.get_pages();
        let total = pages.len();
        if total == 0 {
            return Err(CodecError::PageTree("document has no pages".to_string()));
        }

        let mut target = Document::with_version(source.version.clone());
        let pages_id = target.new_object_id();
        let mut copier = ObjectCopier::new(source);

        // Page ids are reserved up front so links between pages land on the copies
        for &page_id in pages.values() {
            let copy_id = target.new_object_id();
            copier.map.insert(page_id, copy_id);
        }

        let mut kids = Vec::with_capacity(total);
        for (index, &page_id) in pages.values().enumerate() {
            let dict = source
                .get_dictionary(page_id)
                .map_err(|e| CodecError::PageTree(format!("page {}: {}", index + 1, e)))?;

            let mut page = Dictionary::new();
            for (key, value) in dict.iter() {
                if key.as_slice() == b"Parent" {
                    continue;
                }
                page.set(key.clone(), copier.copy(&mut target, value));
            }
            for key in INHERITABLE_KEYS {
                if page.has(key) {
                    continue;
                }
                if let Some(value) = inherited(source, page_id, key) {
                    page.set(key, copier.copy(&mut target, value));
                }
            }
            page.set("Parent", pages_id);

            let copy_id = copier.map[&page_id];
            target.objects.insert(copy_id, Object::Dictionary(page));
            kids.push(Object::Reference(copy_id));
            on_page(index + 1, total);
        }

        target.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => total as i64,
            }),
        );
        let catalog_id = target.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        target.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        target
            .save_to(&mut buffer)
            .map_err(|e| CodecError::Write(e.to_string()))?;
        Ok(buffer)
    }
}

/// Walks the /Parent chain of a page looking for an inherited attribute.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc
        .get_dictionary(page_id)
        .ok()?
        .get(b"Parent")
        .and_then(Object::as_reference)
        .ok()?;

    for _ in 0..MAX_TREE_DEPTH {
        let dict = doc.get_dictionary(current).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
    }
    None
}

/// Deep-copies objects from one document into another, renumbering references.
struct ObjectCopier<'a> {
    source: &'a Document,
    map: BTreeMap<ObjectId, ObjectId>,
}

impl<'a> ObjectCopier<'a> {
    fn new(source: &'a Document) -> Self {
        Self {
            source,
            map: BTreeMap::new(),
        }
    }

    fn copy(&mut self, target: &mut Document, object: &Object) -> Object {
        match object {
            Object::Reference(id) => Object::Reference(self.copy_reference(target, *id)),
            Object::Array(items) => {
                Object::Array(items.iter().map(|item| self.copy(target, item)).collect())
            }
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dictionary(target, dict)),
            Object::Stream(stream) => {
                let mut copy = stream.clone();
                copy.dict = self.copy_dictionary(target, &stream.dict);
                Object::Stream(copy)
            }
            other => other.clone(),
        }
    }

    fn copy_dictionary(&mut self, target: &mut Document, dict: &Dictionary) -> Dictionary {
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            copy.set(key.clone(), self.copy(target, value));
        }
        copy
    }

    fn copy_reference(&mut self, target: &mut Document, id: ObjectId) -> ObjectId {
        if let Some(&mapped) = self.map.get(&id) {
            return mapped;
        }

        // Register before descending so cycles resolve to the same copy
        let copy_id = target.new_object_id();
        self.map.insert(id, copy_id);

        let copied = match self.source.get_object(id) {
            Ok(object) => self.copy(target, object),
            // Dangling references become null, as readers treat them anyway
            Err(_) => Object::Null,
        };
        target.objects.insert(copy_id, copied);
        copy_id
    }
}
