//! Extractive question answering over a context string.

use async_trait::async_trait;

use crate::document::Answer;
use crate::error::Result;

/// A model that locates the answer to a question as a span of a context.
///
/// The returned [`Answer::answer`] is whatever the model extracts; callers
/// should not assume it appears verbatim in the context.
#[async_trait]
pub trait Answerer: Send + Sync {
    /// Answer `question` using only `context`.
    async fn answer(&self, question: &str, context: &str) -> Result<Answer>;
}
