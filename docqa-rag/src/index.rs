//! Flat nearest-neighbor index over chunk embeddings.
//!
//! [`FlatL2Index`] is an exhaustive index: every search scores every stored
//! vector by squared Euclidean distance. [`ChunkIndex`] pairs it with the
//! chunk texts so that vector `i` always belongs to `chunks[i]`.
//!
//! Both are built once and never mutated; there is no incremental insert or
//! delete.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::Neighbor;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// An exhaustive squared-L2 index over fixed-dimension vectors.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FlatL2Index {
    dimensions: usize,
    vectors: Vec<Vec<f32>>,
}

/// Squared Euclidean distance between two equal-length vectors.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

impl FlatL2Index {
    /// Build an index from vectors that all share one dimension.
    ///
    /// An empty input yields an empty index with dimension zero.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexError`] if the vectors differ in length or
    /// have zero length.
    pub fn from_vectors(vectors: Vec<Vec<f32>>) -> Result<Self> {
        let Some(first) = vectors.first() else {
            return Ok(Self::default());
        };
        let dimensions = first.len();
        if dimensions == 0 {
            return Err(RagError::IndexError("embeddings must not be empty".into()));
        }
        if let Some((position, bad)) =
            vectors.iter().enumerate().find(|(_, v)| v.len() != dimensions)
        {
            return Err(RagError::IndexError(format!(
                "vector {position} has dimension {}, expected {dimensions}",
                bad.len()
            )));
        }
        Ok(Self { dimensions, vectors })
    }

    /// Dimension of the stored vectors (zero for an empty index).
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Whether the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Return the `k` stored vectors closest to `query`, nearest first.
    ///
    /// Returns `min(k, len)` neighbors. The sort is stable, so vectors at equal
    /// distance come back in insertion order; callers should treat tie order
    /// as unspecified.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexError`] if the index is non-empty and `query`
    /// has a different dimension.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimensions {
            return Err(RagError::IndexError(format!(
                "query has dimension {}, index has {}",
                query.len(),
                self.dimensions
            )));
        }

        let mut scored: Vec<Neighbor> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(index, vector)| Neighbor { distance: squared_l2(vector, query), index })
            .collect();

        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(k);
        Ok(scored)
    }
}

/// Chunk texts plus the index over their embeddings.
///
/// Invariant: vector `i` of the index is the embedding of `chunks[i]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChunkIndex {
    chunks: Vec<String>,
    index: FlatL2Index,
}

impl ChunkIndex {
    /// Embed every chunk in one batch call and index the results.
    ///
    /// # Errors
    ///
    /// Propagates embedding failures, and returns [`RagError::IndexError`] if
    /// the provider returns a different number of vectors than chunks.
    pub async fn build(chunks: Vec<String>, embedder: &dyn EmbeddingProvider) -> Result<Self> {
        if chunks.is_empty() {
            return Ok(Self::default());
        }

        let texts: Vec<&str> = chunks.iter().map(String::as_str).collect();
        let vectors = embedder.embed_batch(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(RagError::IndexError(format!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let index = FlatL2Index::from_vectors(vectors)?;
        debug!(chunk_count = chunks.len(), dimensions = index.dimensions(), "built chunk index");
        Ok(Self { chunks, index })
    }

    /// Assemble an index from chunks and precomputed vectors.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexError`] if the counts differ.
    pub fn from_parts(chunks: Vec<String>, index: FlatL2Index) -> Result<Self> {
        if chunks.len() != index.len() {
            return Err(RagError::IndexError(format!(
                "{} chunks but {} vectors",
                chunks.len(),
                index.len()
            )));
        }
        Ok(Self { chunks, index })
    }

    /// The indexed chunks, in original order.
    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    /// The chunk at `position`, if any.
    pub fn chunk(&self, position: usize) -> Option<&str> {
        self.chunks.get(position).map(String::as_str)
    }

    /// The underlying vector index.
    pub fn vectors(&self) -> &FlatL2Index {
        &self.index
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether no chunks are indexed.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Nearest chunks to an already-embedded query.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        self.index.search(query, k)
    }

    /// Embed `query` and return the nearest chunks.
    pub async fn retrieve(
        &self,
        query: &str,
        embedder: &dyn EmbeddingProvider,
        k: usize,
    ) -> Result<Vec<Neighbor>> {
        let query_vector = embedder.embed(query).await?;
        self.search(&query_vector, k)
    }
}
