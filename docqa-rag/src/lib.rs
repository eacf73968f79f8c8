//! # docqa-rag
//!
//! Retrieval-augmented question answering over a single document.
//!
//! The crate provides the pieces of the load → chunk → embed → index →
//! retrieve → answer flow and an orchestrator that runs them in order:
//!
//! - [`loader`]: text files, folders of `.txt` files, and PDFs
//! - [`chunking`]: [`WordChunker`], [`RecursiveChunker`], and [`clean_text`]
//! - [`EmbeddingProvider`] and [`Answerer`]: the model seams
//! - [`FlatL2Index`] / [`ChunkIndex`]: exhaustive squared-L2 search
//! - [`IndexStore`]: a persisted index with source staleness detection
//! - [`RagPipeline`]: the orchestrator
//! - [`inference`]: sentiment, summarization and generation seams with the
//!   prompt flows built on them
//!
//! ## Features
//!
//! - `hf`: hosted embedding, QA, sentiment, summarization and generation
//!   backends over the Hugging Face Inference API

pub mod answer;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod index;
pub mod inference;
pub mod loader;
pub mod pipeline;
pub mod store;

#[cfg(feature = "hf")]
pub mod hf;

pub use answer::Answerer;
pub use chunking::{Chunker, Cleaned, RecursiveChunker, WordChunker, chunk_words, clean_text};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Answer, Document, Neighbor};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use index::{ChunkIndex, FlatL2Index};
pub use pipeline::{AskOutcome, RagPipeline, RagPipelineBuilder, context_snippet};
pub use store::{IndexSettings, IndexStore, SourceFingerprint, StoredIndex};
