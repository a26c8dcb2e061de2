use thiserror::Error;

/// Rejections surfaced to the user before any I/O happens.
///
/// The display strings are the messages shown in the error banner.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please upload at least one file.")]
    NoFiles,
    #[error("Only PDF, DOCX, and XLSX files are allowed.")]
    UnsupportedType,
    #[error("Please upload a document before asking a question.")]
    NoDocument,
    #[error("Question cannot be empty.")]
    EmptyQuestion,
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("PDF parse error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("DOCX parse error: {0}")]
    Docx(String),
    #[error("XLSX parse error: {0}")]
    Xlsx(#[from] calamine::XlsxError),
    #[error("CSV conversion error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("extraction worker failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{file}: {source}")]
    Extract {
        file: String,
        #[source]
        source: ExtractError,
    },
}
