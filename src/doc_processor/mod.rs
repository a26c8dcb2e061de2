mod docx;
mod pdf;
mod xlsx;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ExtractError;
use crate::state::models::UploadedFile;

pub const PDF_MEDIA_TYPE: &str = "application/pdf";
pub const DOCX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const XLSX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const UNKNOWN_MEDIA_TYPE: &str = "application/octet-stream";

/// Text produced for a file no extractor understands.
pub const UNSUPPORTED_TEXT: &str = "Unsupported file format.";

/// Document family, decided from the declared media type only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Docx,
    Xlsx,
    Unsupported,
}

impl FileKind {
    pub fn from_media_type(media_type: &str) -> Self {
        match media_type {
            PDF_MEDIA_TYPE => FileKind::Pdf,
            DOCX_MEDIA_TYPE => FileKind::Docx,
            XLSX_MEDIA_TYPE => FileKind::Xlsx,
            _ => FileKind::Unsupported,
        }
    }

    pub fn is_supported(self) -> bool {
        self != FileKind::Unsupported
    }
}

/// Media type a file picker would declare for `path`, judged by extension.
pub fn media_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "pdf" => PDF_MEDIA_TYPE,
        "docx" => DOCX_MEDIA_TYPE,
        "xlsx" => XLSX_MEDIA_TYPE,
        _ => UNKNOWN_MEDIA_TYPE,
    }
}

/// Extract plain text from one document buffer.
pub fn extract_text(kind: FileKind, bytes: &[u8]) -> Result<String, ExtractError> {
    match kind {
        FileKind::Pdf => pdf::extract(bytes),
        FileKind::Docx => docx::extract(bytes),
        FileKind::Xlsx => xlsx::extract(bytes),
        FileKind::Unsupported => Ok(UNSUPPORTED_TEXT.to_string()),
    }
}

/// Concatenate per-file texts in order, each followed by a single space.
pub fn join_corpus<S: AsRef<str>>(texts: &[S]) -> String {
    let mut corpus = String::new();
    for text in texts {
        corpus.push_str(text.as_ref());
        corpus.push(' ');
    }
    corpus
}

/// Turns one uploaded file into text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, file: &UploadedFile) -> Result<String, ExtractError>;
}

/// Extractor backed by the format parsers in this module.
///
/// Parsing is CPU bound, so each file is handed to the blocking pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentExtractor;

#[async_trait]
impl TextExtractor for DocumentExtractor {
    async fn extract(&self, file: &UploadedFile) -> Result<String, ExtractError> {
        let kind = file.kind();
        let bytes = Arc::clone(&file.bytes);
        let text = tokio::task::spawn_blocking(move || extract_text(kind, &bytes)).await??;
        tracing::debug!(file = %file.name, ?kind, chars = text.len(), "extracted text");
        Ok(text)
    }
}
