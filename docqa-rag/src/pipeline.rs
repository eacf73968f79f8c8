//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] runs the linear load → chunk → embed+index → retrieve →
//! concatenate → answer flow by composing a [`Chunker`], an
//! [`EmbeddingProvider`] and an [`Answerer`]. There are no retries: the first
//! failing step ends the run and its error is returned unchanged.
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::{RagPipeline, RagConfig, WordChunker};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(embedder))
//!     .answerer(Arc::new(answerer))
//!     .chunker(Arc::new(WordChunker::new(400)?))
//!     .build()?;
//!
//! let outcome = pipeline.answer_from_path("sample.pdf", "What is this about?").await?;
//! println!("{}", outcome.answer.answer);
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::answer::Answerer;
use crate::chunking::Chunker;
use crate::config::RagConfig;
use crate::document::{Answer, Document, Neighbor};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::ChunkIndex;
use crate::loader::load_document;
use crate::store::{IndexSettings, IndexStore, SourceFingerprint};

/// Number of context characters reported in a snippet.
pub const SNIPPET_CHARS: usize = 400;

/// The first [`SNIPPET_CHARS`] characters of `context` followed by `...`.
pub fn context_snippet(context: &str) -> String {
    let mut snippet: String = context.chars().take(SNIPPET_CHARS).collect();
    snippet.push_str("...");
    snippet
}

/// Everything produced by answering one question.
#[derive(Debug, Clone, Serialize)]
pub struct AskOutcome {
    /// The question as asked.
    pub question: String,
    /// The extracted answer.
    pub answer: Answer,
    /// Retrieved chunks joined with single spaces, in retrieval order.
    pub context: String,
    /// Retrieval hits, nearest first.
    pub neighbors: Vec<Neighbor>,
}

/// The RAG pipeline orchestrator.
///
/// Construct one via [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    answerer: Arc<dyn Answerer>,
    chunker: Arc<dyn Chunker>,
}

impl std::fmt::Debug for RagPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagPipeline").field("config", &self.config).finish_non_exhaustive()
    }
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// The settings an index built by this pipeline is recorded with.
    ///
    /// Chunk size and overlap come from the configuration, which is expected
    /// to describe the chunker.
    pub fn index_settings(&self) -> IndexSettings {
        IndexSettings {
            chunk_size: self.config.chunk_size,
            chunk_overlap: self.config.chunk_overlap,
            embedding_model: self.embedding_provider.model_name().to_string(),
        }
    }

    /// Chunk a document and index every chunk.
    ///
    /// # Errors
    ///
    /// Propagates embedding and index construction failures.
    pub async fn index_document(&self, document: &Document) -> Result<ChunkIndex> {
        let chunks = self.chunker.chunk(&document.text);
        let chunk_count = chunks.len();

        let index = ChunkIndex::build(chunks, self.embedding_provider.as_ref())
            .await
            .inspect_err(|e| {
                error!(source = %document.source.display(), error = %e, "indexing failed");
            })?;

        info!(source = %document.source.display(), chunk_count, "indexed document");
        Ok(index)
    }

    /// Load the document at `path` and index it.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DocumentNotFound`] if the file is missing, and
    /// propagates load, embedding, and index failures.
    pub async fn index_path(&self, path: impl AsRef<Path>) -> Result<ChunkIndex> {
        let document = load_document(path).await?;
        self.index_document(&document).await
    }

    /// Answer a question over an existing index: embed → retrieve top-k →
    /// concatenate → answer.
    ///
    /// # Errors
    ///
    /// Propagates embedding, search, and answering failures.
    pub async fn ask(&self, index: &ChunkIndex, question: &str) -> Result<AskOutcome> {
        let neighbors = index
            .retrieve(question, self.embedding_provider.as_ref(), self.config.top_k)
            .await
            .inspect_err(|e| error!(error = %e, "retrieval failed"))?;

        let context = neighbors
            .iter()
            .filter_map(|n| index.chunk(n.index))
            .collect::<Vec<_>>()
            .join(" ");

        let answer = self
            .answerer
            .answer(question, &context)
            .await
            .inspect_err(|e| error!(error = %e, "answering failed"))?;

        info!(retrieved = neighbors.len(), score = answer.score, "answered question");
        Ok(AskOutcome { question: question.to_string(), answer, context, neighbors })
    }

    /// Run the whole flow for one document and one question, with nothing
    /// cached between calls.
    pub async fn answer_from_path(
        &self,
        path: impl AsRef<Path>,
        question: &str,
    ) -> Result<AskOutcome> {
        let index = self.index_path(path).await?;
        self.ask(&index, question).await
    }

    /// Reuse the index persisted in `store` when it was built from the
    /// current version of `source` with the current settings; otherwise build
    /// it and save it.
    ///
    /// A stored index whose source fingerprint or [`IndexSettings`] are
    /// missing or differ from the current ones is treated as stale and
    /// rebuilt. When `source` itself is missing but a stored index exists, the
    /// stored index is served with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DocumentNotFound`] when neither the source nor a
    /// stored index exists, and propagates build and save failures.
    pub async fn load_or_build_index(
        &self,
        source: impl AsRef<Path>,
        store: &IndexStore,
    ) -> Result<ChunkIndex> {
        let source = source.as_ref();
        let current = match SourceFingerprint::of(source).await {
            Ok(fingerprint) => Some(fingerprint),
            Err(RagError::DocumentNotFound { .. }) => None,
            Err(e) => return Err(e),
        };

        let settings = self.index_settings();

        if store.exists().await {
            match store.load().await {
                Ok(stored) => match (current, stored.source) {
                    (Some(now), Some(then))
                        if now == then && stored.settings.as_ref() == Some(&settings) =>
                    {
                        info!(dir = %store.dir().display(), "loading existing index");
                        return Ok(stored.index);
                    }
                    (None, _) => {
                        warn!(
                            source = %source.display(),
                            "source document missing; serving stored index as-is"
                        );
                        return Ok(stored.index);
                    }
                    _ => {
                        warn!(
                            source = %source.display(),
                            dir = %store.dir().display(),
                            "stored index is stale; rebuilding"
                        );
                    }
                },
                Err(e) => warn!(error = %e, "stored index unreadable; rebuilding"),
            }
        }

        if current.is_none() {
            return Err(RagError::DocumentNotFound { path: source.to_path_buf() });
        }

        let index = self.index_path(source).await?;
        store.save(&index, current, Some(settings)).await?;
        Ok(index)
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// All fields except `config` are required; `config` defaults to
/// [`RagConfig::default()`].
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    answerer: Option<Arc<dyn Answerer>>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the question-answering model.
    pub fn answerer(mut self, answerer: Arc<dyn Answerer>) -> Self {
        self.answerer = Some(answerer);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if any required field is missing or
    /// `top_k` is zero.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        if config.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let answerer =
            self.answerer.ok_or_else(|| RagError::ConfigError("answerer is required".to_string()))?;
        let chunker =
            self.chunker.ok_or_else(|| RagError::ConfigError("chunker is required".to_string()))?;

        Ok(RagPipeline { config, embedding_provider, answerer, chunker })
    }
}
