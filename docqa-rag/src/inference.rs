//! Model seams for the non-retrieval tasks: sentiment, summarization and
//! free-form generation, plus the prompt flows built on them.
//!
//! Each task is a trait so the service and the CLI can run against hosted
//! models in production and in-process stand-ins under test.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a hosted inference call.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("{task} backend failed: {message}")]
    Backend { task: &'static str, message: String },

    #[error("{task} backend returned no output")]
    EmptyOutput { task: &'static str },
}

pub type InferenceResult<T> = std::result::Result<T, InferenceError>;

/// Top label of a sentiment classifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sentiment {
    pub label: String,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct SummaryParams {
    pub max_length: usize,
    pub min_length: usize,
    pub do_sample: bool,
}

impl Default for SummaryParams {
    fn default() -> Self {
        Self { max_length: 130, min_length: 30, do_sample: false }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct GenerationParams {
    pub max_new_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    pub do_sample: bool,
}

impl GenerationParams {
    /// Greedy decoding, as used for free-form question answering.
    pub fn greedy(max_new_tokens: usize) -> Self {
        Self { max_new_tokens, temperature: None, do_sample: false }
    }

    /// Sampled decoding at the given temperature.
    pub fn sampled(max_new_tokens: usize, temperature: f32) -> Self {
        Self { max_new_tokens, temperature: Some(temperature), do_sample: true }
    }
}

#[async_trait]
pub trait SentimentAnalyzer: Send + Sync {
    async fn analyze(&self, text: &str) -> InferenceResult<Sentiment>;
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str, params: &SummaryParams) -> InferenceResult<String>;
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> InferenceResult<String>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeywordSummary {
    pub summary: String,
    pub keywords: String,
}

pub fn summary_prompt(text: &str) -> String {
    format!("Summarize the following text in 3 concise sentences:\n\n{text}")
}

pub fn keywords_prompt(summary: &str) -> String {
    format!("Extract 5 important keywords from this summary:\n\n{summary}\n\nKeywords:")
}

pub fn polite_prompt(sentence: &str) -> String {
    format!("Rewrite the following sentence politely:\n{sentence}")
}

/// Summarize `text`, then extract keywords from the summary (not the text).
pub async fn summarize_with_keywords(
    generator: &dyn TextGenerator,
    text: &str,
) -> InferenceResult<KeywordSummary> {
    let params = GenerationParams::sampled(150, 0.7);
    let summary = generator.generate(&summary_prompt(text), &params).await?;
    let keywords = generator.generate(&keywords_prompt(&summary), &params).await?;
    Ok(KeywordSummary { summary, keywords })
}

/// Ask the generator for a polite rewording of `sentence`.
pub async fn rewrite_politely(generator: &dyn TextGenerator, sentence: &str) -> InferenceResult<String> {
    generator.generate(&polite_prompt(sentence), &GenerationParams::sampled(100, 0.7)).await
}

/// Consecutive windows of at most `window` characters. A zero window yields nothing.
pub fn char_windows(text: &str, window: usize) -> Vec<String> {
    if window == 0 {
        return Vec::new();
    }
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(window).map(|w| w.iter().collect()).collect()
}

/// The first `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}

/// Summarize a long text piecewise: each `window`-character slice is
/// summarized on its own, then the joined partial summaries are summarized
/// once more.
pub async fn summarize_in_windows(
    generator: &dyn TextGenerator,
    text: &str,
    window: usize,
) -> InferenceResult<String> {
    let params = GenerationParams::greedy(150);
    let mut partials = Vec::new();
    for piece in char_windows(text, window) {
        let prompt = format!("Summarize the following text:\n\n{piece}");
        partials.push(generator.generate(&prompt, &params).await?);
    }
    let combined = partials.join(" ");
    generator.generate(&format!("Summarize this text concisely:\n\n{combined}"), &params).await
}
