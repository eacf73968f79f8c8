//! Loading source documents from disk.
//!
//! Plain text is read as UTF-8; PDFs go through `pdf-extract`, which parses
//! synchronously and therefore runs on the blocking pool.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::document::Document;
use crate::error::{RagError, Result};

fn io_error(path: &Path, error: std::io::Error) -> RagError {
    match error.kind() {
        std::io::ErrorKind::NotFound => RagError::DocumentNotFound { path: path.to_path_buf() },
        _ => RagError::Load { path: path.to_path_buf(), message: error.to_string() },
    }
}

/// Read a UTF-8 text file.
///
/// # Errors
///
/// Returns [`RagError::DocumentNotFound`] if the file is missing and
/// [`RagError::Load`] for any other read failure.
pub async fn load_text_file(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path).await.map_err(|e| io_error(path, e))?;
    debug!(path = %path.display(), chars = text.len(), "loaded text file");
    Ok(Document::new(path, text))
}

/// Extract the text of every page of a PDF.
///
/// # Errors
///
/// Returns [`RagError::DocumentNotFound`] if the file is missing and
/// [`RagError::Load`] if it cannot be parsed.
pub async fn load_pdf(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref().to_path_buf();
    if !tokio::fs::try_exists(&path).await.map_err(|e| io_error(&path, e))? {
        return Err(RagError::DocumentNotFound { path });
    }

    let parse_path = path.clone();
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text(&parse_path))
        .await
        .map_err(|e| RagError::Load { path: path.clone(), message: e.to_string() })?
        .map_err(|e| RagError::Load { path: path.clone(), message: e.to_string() })?;

    info!(path = %path.display(), chars = text.len(), "extracted pdf text");
    Ok(Document::new(path, text))
}

/// Load a document, choosing the parser by file extension (`.pdf` or text).
pub async fn load_document(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref();
    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if is_pdf { load_pdf(path).await } else { load_text_file(path).await }
}

/// Load every `.txt` file directly inside `dir`, sorted by file name.
///
/// # Errors
///
/// Returns [`RagError::DocumentNotFound`] if `dir` does not exist.
pub async fn load_text_folder(dir: impl AsRef<Path>) -> Result<Vec<Document>> {
    let dir = dir.as_ref();
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| io_error(dir, e))?;

    let mut paths: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(dir, e))? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "txt") && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        documents.push(load_text_file(&path).await?);
    }
    info!(dir = %dir.display(), document_count = documents.len(), "loaded text folder");
    Ok(documents)
}
