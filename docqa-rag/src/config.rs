//! Configuration for the RAG pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Configuration parameters for the RAG pipeline.
///
/// `chunk_size` is measured in words for [`WordChunker`](crate::WordChunker)
/// and in characters for [`RecursiveChunker`](crate::RecursiveChunker);
/// `chunk_overlap` only applies to the latter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk size.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks (recursive splitter only).
    pub chunk_overlap: usize,
    /// Number of chunks retrieved per question.
    pub top_k: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self { chunk_size: 400, chunk_overlap: 0, top_k: 3 }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Settings used by the HTTP service: 500-character windows with
    /// 50 characters of overlap.
    pub fn service_defaults() -> Self {
        Self { chunk_size: 500, chunk_overlap: 50, top_k: 3 }
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of chunks retrieved per question.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    pub fn build(self) -> Result<RagConfig> {
        if self.config.chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if self.config.chunk_overlap >= self.config.chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.config.chunk_overlap, self.config.chunk_size
            )));
        }
        if self.config.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_script_constants() {
        let config = RagConfig::default();
        assert_eq!(config.chunk_size, 400);
        assert_eq!(config.top_k, 3);
        assert_eq!(config.chunk_overlap, 0);
    }

    #[test]
    fn builder_accepts_custom_values() {
        let config = RagConfig::builder().chunk_size(500).chunk_overlap(50).top_k(5).build().unwrap();
        assert_eq!(config, RagConfig { chunk_size: 500, chunk_overlap: 50, top_k: 5 });
    }

    #[test]
    fn rejects_zero_chunk_size() {
        assert!(RagConfig::builder().chunk_size(0).build().is_err());
    }

    #[test]
    fn rejects_overlap_not_smaller_than_chunk_size() {
        assert!(RagConfig::builder().chunk_size(100).chunk_overlap(100).build().is_err());
    }

    #[test]
    fn rejects_zero_top_k() {
        assert!(RagConfig::builder().top_k(0).build().is_err());
    }
}
