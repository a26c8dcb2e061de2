use std::path::PathBuf;

use crate::doc_processor::{self, TextExtractor};
use crate::error::{UploadError, ValidationError};
use crate::pipeline::run_sequential;
use crate::state::models::UploadedFile;
use crate::state::{Event, Store};

/// Read files from disk as a picker would hand them over.
pub async fn open_files(paths: &[PathBuf]) -> std::io::Result<Vec<UploadedFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        files.push(UploadedFile::from_path(path).await?);
    }
    Ok(files)
}

/// Replace the selection. One disallowed type rejects the whole batch and the
/// previous selection stays.
pub fn select_files(store: &Store, files: Vec<UploadedFile>) -> Result<(), ValidationError> {
    if let Some(bad) = files.iter().find(|f| !f.kind().is_supported()) {
        tracing::warn!(file = %bad.name, media_type = %bad.media_type, "rejected selection");
        let err = ValidationError::UnsupportedType;
        store.dispatch(Event::Rejected(err.clone()));
        return Err(err);
    }
    store.dispatch(Event::FilesSelected(files));
    Ok(())
}

/// Extract every selected file in selection order and replace the corpus.
///
/// A failing file aborts the batch; the corpus then keeps the previous batch.
pub async fn upload(store: &Store, extractor: &dyn TextExtractor) -> Result<String, UploadError> {
    let files = store.read(|s| s.files.clone());
    if files.is_empty() {
        let err = ValidationError::NoFiles;
        store.dispatch(Event::Rejected(err.clone()));
        return Err(err.into());
    }

    store.dispatch(Event::UploadStarted);
    tracing::info!(files = files.len(), "Loading...");

    let extracted = run_sequential(files, |file| async move {
        extractor
            .extract(&file)
            .await
            .map_err(|source| UploadError::Extract {
                file: file.name.clone(),
                source,
            })
    })
    .await;

    match extracted {
        Ok(texts) => {
            let corpus = doc_processor::join_corpus(&texts);
            tracing::info!(chars = corpus.len(), "corpus ready");
            store.dispatch(Event::UploadCompleted {
                corpus: corpus.clone(),
            });
            Ok(corpus)
        }
        Err(err) => {
            tracing::error!("upload failed: {}", err);
            store.dispatch(Event::UploadFailed);
            Err(err)
        }
    }
}
