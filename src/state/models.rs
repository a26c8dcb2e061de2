use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::doc_processor::{self, FileKind};

/// A selected file: raw bytes plus the media type the picker declared.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub media_type: String,
    pub bytes: Arc<[u8]>,
}

impl UploadedFile {
    pub fn new(
        name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes: bytes.into(),
        }
    }

    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        Ok(Self::new(name, doc_processor::media_type_for_path(path), bytes))
    }

    pub fn kind(&self) -> FileKind {
        FileKind::from_media_type(&self.media_type)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct QaEntry {
    pub question: String,
    pub answer: String,
}

/// Append-only question/answer history, oldest first.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct ConversationLog {
    entries: Vec<QaEntry>,
}

impl ConversationLog {
    pub fn append(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.entries.push(QaEntry {
            question: question.into(),
            answer: answer.into(),
        });
    }

    pub fn entries(&self) -> &[QaEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
