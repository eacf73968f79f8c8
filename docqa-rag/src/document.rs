//! Data types for documents, chunks, retrieval hits and answers.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Raw text extracted from a single source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Where the text was loaded from.
    pub source: PathBuf,
    /// The extracted text.
    pub text: String,
}

impl Document {
    /// Create a document from a source path and its text.
    pub fn new(source: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self { source: source.into(), text: text.into() }
    }

    /// File name of the source, or the full path when it has none.
    pub fn name(&self) -> String {
        self.source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source.display().to_string())
    }
}

/// One nearest-neighbor hit: squared L2 distance and the position of the
/// stored vector (which is also the position of its chunk).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Neighbor {
    /// Squared Euclidean distance to the query.
    pub distance: f32,
    /// Position of the matching chunk.
    pub index: usize,
}

/// A span extracted by a question-answering model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    /// The extracted answer text.
    pub answer: String,
    /// Model confidence in `[0, 1]`.
    pub score: f32,
    /// Character offset of the span start within the context, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    /// Character offset of the span end within the context, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
}
