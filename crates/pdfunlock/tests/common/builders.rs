//! Builders for PDF fixtures and configurations.

#![allow(dead_code)]

use std::path::PathBuf;

use lopdf::content::{Content, Operation};
use lopdf::{
    dictionary, Document, EncryptionState, EncryptionVersion, Object, Permissions, Stream,
    StringFormat,
};

use pdfunlock::Config;

/// Builder for generated PDF documents. Page N shows the text `Page N`.
pub struct PdfBuilder {
    pages: usize,
    user_password: Option<String>,
}

impl PdfBuilder {
    pub fn new(pages: usize) -> Self {
        Self {
            pages,
            user_password: None,
        }
    }

    /// Encrypt with RC4-128 and the given user password.
    pub fn encrypted(mut self, user_password: &str) -> Self {
        self.user_password = Some(user_password.to_string());
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids = Vec::with_capacity(self.pages);
        for number in 1..=self.pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![72.into(), 700.into()]),
                    Operation::new(
                        "Tj",
                        vec![Object::string_literal(format!("Page {}", number))],
                    ),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                content.encode().expect("Failed to encode content"),
            ));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            });
            kids.push(Object::Reference(page_id));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => self.pages as i64,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        if let Some(user_password) = &self.user_password {
            encrypt(&mut doc, user_password);
        }

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).expect("Failed to serialize PDF");
        buffer
    }
}

fn encrypt(doc: &mut Document, user_password: &str) {
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(vec![7u8; 16], StringFormat::Literal),
            Object::String(vec![9u8; 16], StringFormat::Literal),
        ]),
    );
    let version = EncryptionVersion::V2 {
        document: &*doc,
        owner_password: "fixture-owner",
        user_password,
        key_length: 128,
        permissions: Permissions::all(),
    };
    let state = EncryptionState::try_from(version).expect("Failed to derive encryption state");
    doc.encrypt(&state).expect("Failed to encrypt fixture");
}

/// Unencrypted document with `pages` pages.
pub fn plain_pdf(pages: usize) -> Vec<u8> {
    PdfBuilder::new(pages).build()
}

/// Document encrypted with `password` as its user password.
pub fn encrypted_pdf(pages: usize, password: &str) -> Vec<u8> {
    PdfBuilder::new(pages).encrypted(password).build()
}

/// Page texts of an unencrypted PDF, in page order.
pub fn page_texts(bytes: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(bytes).expect("Output is not a readable PDF");
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let content = doc.get_page_content(page_id).unwrap_or_default();
            String::from_utf8_lossy(&content).to_string()
        })
        .collect()
}

/// Builder for creating `Config` instances.
pub struct ConfigBuilder {
    worker_count: usize,
    output_prefix: String,
    overwrite: bool,
    error_log_path: Option<PathBuf>,
    event_capacity: usize,
}

impl ConfigBuilder {
    /// Create a new builder with sensible defaults for testing.
    pub fn new() -> Self {
        Self {
            worker_count: 2,
            output_prefix: "unlocked_".to_string(),
            overwrite: false,
            error_log_path: None,
            event_capacity: 1024,
        }
    }

    pub fn worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    pub fn output_prefix(mut self, prefix: &str) -> Self {
        self.output_prefix = prefix.to_string();
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn error_log_path(mut self, path: PathBuf) -> Self {
        self.error_log_path = Some(path);
        self
    }

    pub fn build(self) -> Config {
        Config {
            worker_count: self.worker_count,
            output_prefix: self.output_prefix,
            overwrite: self.overwrite,
            error_log_path: self.error_log_path,
            event_capacity: self.event_capacity,
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
