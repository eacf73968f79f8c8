//! Hosted-model backends speaking the Hugging Face Inference API wire format.
//!
//! This module is only available when the `hf` feature is enabled.
//!
//! Every task is a `POST {base_url}/models/{model}` with a JSON body of the
//! form `{"inputs": ..., "parameters": ...}`. [`HfClient`] handles transport,
//! auth and error decoding; the providers and task backends here only shape
//! requests and responses.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use crate::answer::Answerer;
use crate::document::Answer;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::inference::{
    GenerationParams, InferenceError, InferenceResult, Sentiment, SentimentAnalyzer, SummaryParams,
    Summarizer, TextGenerator,
};

/// The public Hugging Face inference endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";

/// Sentence-embedding model used by default.
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Extractive QA model used by default.
pub const DEFAULT_QA_MODEL: &str = "deepset/roberta-base-squad2";

pub const DEFAULT_SENTIMENT_MODEL: &str = "distilbert-base-uncased-finetuned-sst-2-english";
pub const DEFAULT_SUMMARY_MODEL: &str = "facebook/bart-large-cnn";
pub const DEFAULT_GENERATION_MODEL: &str = "bigscience/bloom-560m";
pub const DEFAULT_TEXT2TEXT_MODEL: &str = "google/flan-t5-base";

/// Failures talking to an inference endpoint.
#[derive(Debug, Error)]
pub enum HfError {
    /// The request could not be sent or the connection failed.
    #[error("request failed: {0}")]
    Request(String),

    /// The endpoint answered with a non-success status.
    #[error("API returned {status}: {detail}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error text reported by the endpoint.
        detail: String,
    },

    /// The response body did not have the expected shape.
    #[error("failed to parse response: {0}")]
    Decode(String),
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Shared HTTP transport for inference calls.
#[derive(Debug, Clone)]
pub struct HfClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl Default for HfClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl HfClient {
    /// Create a client against `base_url` with no token.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http: reqwest::Client::new(), base_url, token: None }
    }

    /// Create a client from `HF_API_BASE` (optional) and `HF_API_TOKEN` (optional).
    pub fn from_env() -> Self {
        let base = std::env::var("HF_API_BASE").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let client = Self::new(base);
        match std::env::var("HF_API_TOKEN") {
            Ok(token) if !token.is_empty() => client.with_token(token),
            _ => client,
        }
    }

    /// Send `Authorization: Bearer <token>` with every call.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// The endpoint root.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run `model` on `body` and decode the JSON response.
    pub async fn infer<B, R>(&self, model: &str, body: &B) -> std::result::Result<R, HfError>
    where
        B: Serialize + Sync + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/models/{model}", self.base_url);
        debug!(%url, "inference request");

        let mut request = self.http.post(&url).json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            error!(model, error = %e, "request failed");
            HfError::Request(e.to_string())
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail =
                serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error).unwrap_or(body);
            error!(model, %status, "API error");
            return Err(HfError::Status { status: status.as_u16(), detail });
        }

        response.json::<R>().await.map_err(|e| {
            error!(model, error = %e, "failed to parse response");
            HfError::Decode(e.to_string())
        })
    }
}

// ── Request/response types ─────────────────────────────────────────

#[derive(Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: &'a [&'a str],
}

#[derive(Serialize)]
struct QuestionAnsweringInputs<'a> {
    question: &'a str,
    context: &'a str,
}

#[derive(Serialize)]
struct QuestionAnsweringRequest<'a> {
    inputs: QuestionAnsweringInputs<'a>,
}

#[derive(Serialize)]
struct TaskRequest<'a, P: Serialize> {
    inputs: &'a str,
    parameters: &'a P,
}

#[derive(Serialize)]
struct TextOnlyRequest<'a> {
    inputs: &'a str,
}

/// Classifiers answer either `[[{label, score}, ...]]` or `[{label, score}, ...]`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ClassificationResponse {
    Nested(Vec<Vec<Sentiment>>),
    Flat(Vec<Sentiment>),
}

impl ClassificationResponse {
    fn top(self) -> Option<Sentiment> {
        let labels = match self {
            Self::Nested(batches) => batches.into_iter().next().unwrap_or_default(),
            Self::Flat(labels) => labels,
        };
        labels.into_iter().max_by(|a, b| a.score.total_cmp(&b.score))
    }
}

#[derive(Deserialize)]
struct SummaryOutput {
    summary_text: String,
}

#[derive(Deserialize)]
struct GeneratedOutput {
    generated_text: String,
}

// ── Providers ──────────────────────────────────────────────────────

/// An [`EmbeddingProvider`] backed by a hosted sentence-embedding model.
#[derive(Debug, Clone)]
pub struct HfEmbeddingProvider {
    client: HfClient,
    model: String,
}

impl HfEmbeddingProvider {
    /// Use `all-MiniLM-L6-v2` through `client`.
    pub fn new(client: HfClient) -> Self {
        Self { client, model: DEFAULT_EMBEDDING_MODEL.into() }
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn failure(&self, e: HfError) -> RagError {
        RagError::EmbeddingError { provider: format!("hf:{}", self.model), message: e.to_string() }
    }
}

#[async_trait]
impl EmbeddingProvider for HfEmbeddingProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| RagError::EmbeddingError {
            provider: format!("hf:{}", self.model),
            message: "API returned empty response".into(),
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(model = %self.model, batch_size = texts.len(), "embedding batch");

        let vectors: Vec<Vec<f32>> = self
            .client
            .infer(&self.model, &FeatureExtractionRequest { inputs: texts })
            .await
            .map_err(|e| self.failure(e))?;

        if vectors.len() != texts.len() {
            return Err(self.failure(HfError::Decode(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            ))));
        }
        Ok(vectors)
    }
}

/// An [`Answerer`] backed by a hosted extractive QA model.
#[derive(Debug, Clone)]
pub struct HfAnswerer {
    client: HfClient,
    model: String,
}

impl HfAnswerer {
    /// Use `roberta-base-squad2` through `client`.
    pub fn new(client: HfClient) -> Self {
        Self { client, model: DEFAULT_QA_MODEL.into() }
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl Answerer for HfAnswerer {
    async fn answer(&self, question: &str, context: &str) -> Result<Answer> {
        let request = QuestionAnsweringRequest { inputs: QuestionAnsweringInputs { question, context } };
        self.client.infer(&self.model, &request).await.map_err(|e| RagError::AnswerError {
            provider: format!("hf:{}", self.model),
            message: e.to_string(),
        })
    }
}

// ── Task backends ──────────────────────────────────────────────────

fn backend(task: &'static str) -> impl Fn(HfError) -> InferenceError {
    move |e| InferenceError::Backend { task, message: e.to_string() }
}

/// A [`SentimentAnalyzer`] backed by a hosted text classifier.
#[derive(Debug, Clone)]
pub struct HfSentimentAnalyzer {
    client: HfClient,
    model: String,
}

impl HfSentimentAnalyzer {
    pub fn new(client: HfClient) -> Self {
        Self { client, model: DEFAULT_SENTIMENT_MODEL.into() }
    }
}

#[async_trait]
impl SentimentAnalyzer for HfSentimentAnalyzer {
    async fn analyze(&self, text: &str) -> InferenceResult<Sentiment> {
        let response: ClassificationResponse = self
            .client
            .infer(&self.model, &TextOnlyRequest { inputs: text })
            .await
            .map_err(backend("sentiment"))?;
        response.top().ok_or(InferenceError::EmptyOutput { task: "sentiment" })
    }
}

/// A [`Summarizer`] backed by a hosted summarization model.
#[derive(Debug, Clone)]
pub struct HfSummarizer {
    client: HfClient,
    model: String,
}

impl HfSummarizer {
    pub fn new(client: HfClient) -> Self {
        Self { client, model: DEFAULT_SUMMARY_MODEL.into() }
    }
}

#[async_trait]
impl Summarizer for HfSummarizer {
    async fn summarize(&self, text: &str, params: &SummaryParams) -> InferenceResult<String> {
        let outputs: Vec<SummaryOutput> = self
            .client
            .infer(&self.model, &TaskRequest { inputs: text, parameters: params })
            .await
            .map_err(backend("summarization"))?;
        outputs
            .into_iter()
            .next()
            .map(|o| o.summary_text)
            .ok_or(InferenceError::EmptyOutput { task: "summarization" })
    }
}

/// Text generation against a causal or text-to-text model.
///
/// `generated_text` is returned untouched. Causal models echo the prompt at
/// its start, so a causal answer reads as the prompt followed by the
/// continuation.
#[derive(Debug, Clone)]
pub struct HfTextGenerator {
    client: HfClient,
    model: String,
}

impl HfTextGenerator {
    /// `bloom-560m`, used for free-form answers.
    pub fn causal(client: HfClient) -> Self {
        Self { client, model: DEFAULT_GENERATION_MODEL.into() }
    }

    /// `flan-t5-base`, used for summaries, keywords and rewrites.
    pub fn text2text(client: HfClient) -> Self {
        Self { client, model: DEFAULT_TEXT2TEXT_MODEL.into() }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl TextGenerator for HfTextGenerator {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> InferenceResult<String> {
        debug!(model = %self.model, max_new_tokens = params.max_new_tokens, "generation request");
        let outputs: Vec<GeneratedOutput> = self
            .client
            .infer(&self.model, &TaskRequest { inputs: prompt, parameters: params })
            .await
            .map_err(backend("generation"))?;
        outputs
            .into_iter()
            .next()
            .map(|o| o.generated_text)
            .ok_or(InferenceError::EmptyOutput { task: "generation" })
    }
}
