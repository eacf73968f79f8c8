//! Error types for the `docqa-rag` crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading, indexing, or answering over documents.
#[derive(Debug, Error)]
pub enum RagError {
    /// The source document does not exist.
    #[error("Document not found: {}", path.display())]
    DocumentNotFound {
        /// The path that was looked up.
        path: PathBuf,
    },

    /// The source document exists but could not be read or parsed.
    #[error("Failed to load {}: {message}", path.display())]
    Load {
        /// The path that failed to load.
        path: PathBuf,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector index.
    #[error("Index error: {0}")]
    IndexError(String),

    /// An error occurred during document chunking.
    #[error("Chunking error: {0}")]
    ChunkingError(String),

    /// The question-answering model failed.
    #[error("Answer error ({provider}): {message}")]
    AnswerError {
        /// The answering backend that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Saving or loading a persisted index failed.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
