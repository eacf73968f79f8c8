use std::sync::Arc;

use docqa_rag::inference::{SentimentAnalyzer, Summarizer, TextGenerator};
use docqa_rag::{AskOutcome, ChunkIndex, RagPipeline};

use crate::access_log::AccessLogQueue;

/// A pipeline paired with the index it serves. Built before the listener binds.
#[derive(Debug)]
pub struct RagService {
    pipeline: RagPipeline,
    index: ChunkIndex,
}

impl RagService {
    pub fn new(pipeline: RagPipeline, index: ChunkIndex) -> Self {
        Self { pipeline, index }
    }

    pub fn chunk_count(&self) -> usize {
        self.index.len()
    }

    pub async fn ask(&self, question: &str) -> docqa_rag::Result<AskOutcome> {
        self.pipeline.ask(&self.index, question).await
    }
}

/// The models behind the non-retrieval endpoints.
#[derive(Clone)]
pub struct InferenceModels {
    pub sentiment: Arc<dyn SentimentAnalyzer>,
    pub summarizer: Arc<dyn Summarizer>,
    /// Causal model for `/qa`.
    pub generator: Arc<dyn TextGenerator>,
    /// Text-to-text model for `/summarize`.
    pub text2text: Arc<dyn TextGenerator>,
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppContext {
    models: InferenceModels,
    rag: Option<Arc<RagService>>,
    api_key: Arc<str>,
    access_log: Option<AccessLogQueue>,
}

impl AppContext {
    pub fn new(models: InferenceModels, api_key: impl Into<Arc<str>>) -> Self {
        Self { models, rag: None, api_key: api_key.into(), access_log: None }
    }

    pub fn with_rag(mut self, service: RagService) -> Self {
        self.rag = Some(Arc::new(service));
        self
    }

    pub fn with_access_log(mut self, queue: AccessLogQueue) -> Self {
        self.access_log = Some(queue);
        self
    }

    pub fn models(&self) -> &InferenceModels {
        &self.models
    }

    pub fn rag(&self) -> Option<&RagService> {
        self.rag.as_deref()
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn access_log(&self) -> Option<&AccessLogQueue> {
        self.access_log.as_ref()
    }
}
