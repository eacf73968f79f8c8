use axum::{
    Json,
    body::Bytes,
    extract::State,
    response::IntoResponse,
};
use serde::Serialize;
use serde_json::json;
use tracing::error;

use docqa_rag::RagError;
use docqa_rag::inference::{
    GenerationParams, KeywordSummary, Sentiment, SummaryParams, summarize_with_keywords,
};

use crate::error::ApiError;
use crate::state::AppContext;
use crate::validation::RequestShape;

const SENTENCE: RequestShape = RequestShape::checked("sentence");
const QA_QUESTION: RequestShape = RequestShape::typed("question").reject_blank("Question cannot be empty");
const SUMMARIZE_TEXT: RequestShape =
    RequestShape::typed("text").reject_blank("Input text cannot be empty.").trimmed();
const ASK_QUESTION: RequestShape = RequestShape::typed("question");

const QA_MAX_NEW_TOKENS: usize = 100;

const STORE_NOT_READY: &str = "Vector store not initialized.";

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summary_text: String,
}

#[derive(Debug, Serialize)]
pub struct QaResponse {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub question: String,
    pub answer: String,
    pub context_snippet: String,
}

/// Body of a `/ask` response. Failures past validation are reported in an
/// `error` field with status 200.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AskReply {
    Answered(AskResponse),
    Failed { error: String },
}

impl AskReply {
    fn failed(message: impl Into<String>) -> Self {
        Self::Failed { error: message.into() }
    }
}

/// The model's own message for backend failures, the full error otherwise.
fn failure_message(err: &RagError) -> String {
    match err {
        RagError::AnswerError { message, .. } | RagError::EmbeddingError { message, .. } => {
            message.clone()
        }
        other => other.to_string(),
    }
}

pub async fn root() -> impl IntoResponse {
    Json(json!({"msg": "Hello World"}))
}

pub async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok", "service": "docqa-server"}))
}

pub async fn sentiment(
    State(ctx): State<AppContext>,
    body: Bytes,
) -> Result<Json<Sentiment>, ApiError> {
    let sentence = SENTENCE.extract(&body)?;
    let result = ctx.models().sentiment.analyze(&sentence).await.map_err(|e| {
        error!(error = %e, "sentiment analysis failed");
        ApiError::internal("Error processing sentence")
    })?;
    Ok(Json(result))
}

pub async fn summary(
    State(ctx): State<AppContext>,
    body: Bytes,
) -> Result<Json<SummaryResponse>, ApiError> {
    let sentence = SENTENCE.extract(&body)?;
    let summary_text = ctx
        .models()
        .summarizer
        .summarize(&sentence, &SummaryParams::default())
        .await
        .map_err(|e| {
            error!(error = %e, "summarization failed");
            ApiError::internal("Error processing sentence")
        })?;
    Ok(Json(SummaryResponse { summary_text }))
}

pub async fn qa(State(ctx): State<AppContext>, body: Bytes) -> Result<Json<QaResponse>, ApiError> {
    let question = QA_QUESTION.extract(&body)?;
    let answer = ctx
        .models()
        .generator
        .generate(&question, &GenerationParams::greedy(QA_MAX_NEW_TOKENS))
        .await
        .map_err(|e| {
            error!(error = %e, "generation failed");
            ApiError::internal(e.to_string())
        })?;
    Ok(Json(QaResponse { question, answer }))
}

pub async fn summarize(
    State(ctx): State<AppContext>,
    body: Bytes,
) -> Result<Json<KeywordSummary>, ApiError> {
    let text = SUMMARIZE_TEXT.extract(&body)?;
    let result = summarize_with_keywords(ctx.models().text2text.as_ref(), &text).await.map_err(|e| {
        error!(error = %e, "keyword summary failed");
        ApiError::internal(e.to_string())
    })?;
    Ok(Json(result))
}

pub async fn ask(State(ctx): State<AppContext>, body: Bytes) -> Result<Json<AskReply>, ApiError> {
    let question = ASK_QUESTION.extract(&body)?;
    let Some(rag) = ctx.rag() else {
        return Ok(Json(AskReply::failed(STORE_NOT_READY)));
    };

    let reply = match rag.ask(&question).await {
        Ok(outcome) => AskReply::Answered(AskResponse {
            context_snippet: docqa_rag::context_snippet(&outcome.context),
            question: outcome.question,
            answer: outcome.answer.answer,
        }),
        Err(e) => {
            error!(error = %e, "ask failed");
            AskReply::failed(failure_message(&e))
        }
    };
    Ok(Json(reply))
}
