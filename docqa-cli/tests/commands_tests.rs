use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use docqa_cli::commands::{
    self, AskArgs, IndexArgs, REVIEW_CHARS, RewriteArgs, SentimentSampleArgs, SummarizePdfArgs,
};
use docqa_rag::inference::{
    GenerationParams, InferenceResult, Sentiment, SentimentAnalyzer, TextGenerator,
};
use docqa_rag::{Answer, Answerer, EmbeddingProvider, RagError};
use rand::SeedableRng;
use rand::rngs::StdRng;

const VOCABULARY: [&str; 4] = ["neural", "network", "recipe", "garden"];

struct BagOfWordsEmbedder;

#[async_trait]
impl EmbeddingProvider for BagOfWordsEmbedder {
    async fn embed(&self, text: &str) -> docqa_rag::Result<Vec<f32>> {
        let lower = text.to_lowercase();
        Ok(VOCABULARY.iter().map(|w| lower.matches(w).count() as f32).collect())
    }
}

struct FirstWordAnswerer;

#[async_trait]
impl Answerer for FirstWordAnswerer {
    async fn answer(&self, _question: &str, context: &str) -> docqa_rag::Result<Answer> {
        let answer = context.split_whitespace().next().unwrap_or_default().to_string();
        Ok(Answer { answer, score: 0.9, start: None, end: None })
    }
}

/// Returns one vector more than it was asked for.
struct SurplusEmbedder;

#[async_trait]
impl EmbeddingProvider for SurplusEmbedder {
    async fn embed(&self, text: &str) -> docqa_rag::Result<Vec<f32>> {
        BagOfWordsEmbedder.embed(text).await
    }

    async fn embed_batch(&self, texts: &[&str]) -> docqa_rag::Result<Vec<Vec<f32>>> {
        let mut vectors = BagOfWordsEmbedder.embed_batch(texts).await?;
        vectors.push(vec![1.0, 1.0, 0.0, 0.0]);
        Ok(vectors)
    }
}

/// Records what it classified; reviews mentioning "bad" are negative.
#[derive(Default)]
struct RecordingAnalyzer {
    seen: Mutex<Vec<String>>,
}

#[async_trait]
impl SentimentAnalyzer for RecordingAnalyzer {
    async fn analyze(&self, text: &str) -> InferenceResult<Sentiment> {
        self.seen.lock().unwrap().push(text.to_string());
        let label = if text.contains("bad") { "NEGATIVE" } else { "POSITIVE" };
        Ok(Sentiment { label: label.into(), score: 0.9 })
    }
}

/// Returns the prompt it was given.
struct PromptEcho;

#[async_trait]
impl TextGenerator for PromptEcho {
    async fn generate(&self, prompt: &str, _params: &GenerationParams) -> InferenceResult<String> {
        Ok(prompt.to_string())
    }
}

struct UnusedGenerator;

#[async_trait]
impl TextGenerator for UnusedGenerator {
    async fn generate(&self, _prompt: &str, _params: &GenerationParams) -> InferenceResult<String> {
        panic!("generator should not be called");
    }
}

#[tokio::test]
async fn ask_answers_from_the_closest_chunk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("paper.txt");
    std::fs::write(&path, "recipe garden recipe neural network network").unwrap();

    let args = AskArgs {
        pdf: path,
        question: "Which neural network?".into(),
        chunk_size: 3,
        top_k: 1,
    };
    let outcome =
        commands::ask(&args, Arc::new(BagOfWordsEmbedder), Arc::new(FirstWordAnswerer)).await.unwrap();

    assert_eq!(outcome.context, "neural network network");
    assert_eq!(outcome.answer.answer, "neural");
}

#[tokio::test]
async fn ask_rejects_zero_chunk_size() {
    let args = AskArgs { chunk_size: 0, ..AskArgs::default() };
    let result = commands::ask(&args, Arc::new(BagOfWordsEmbedder), Arc::new(FirstWordAnswerer)).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn ask_reports_missing_document() {
    let args = AskArgs { pdf: PathBuf::from("no/such/sample.pdf"), ..AskArgs::default() };
    let err = commands::ask(&args, Arc::new(BagOfWordsEmbedder), Arc::new(FirstWordAnswerer))
        .await
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<RagError>(), Some(RagError::DocumentNotFound { .. })));
}

#[tokio::test]
async fn rank_folder_orders_files_by_distance() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("ai.txt"), "neural network training").unwrap();
    std::fs::write(dir.path().join("cooking.txt"), "a recipe for soup").unwrap();
    std::fs::write(dir.path().join("plants.txt"), "garden garden").unwrap();
    std::fs::write(dir.path().join("ignored.md"), "neural network neural").unwrap();

    let args = IndexArgs {
        dir: dir.path().to_path_buf(),
        query: "neural network".into(),
        top_k: 2,
    };
    let matches = commands::rank_folder(&args, &BagOfWordsEmbedder).await.unwrap();

    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].name, "ai.txt");
    assert_eq!(matches[0].distance, 0.0);
    assert!(matches[1].distance >= matches[0].distance);
}

#[tokio::test]
async fn rank_folder_needs_text_files() {
    let dir = tempfile::tempdir().unwrap();
    let args = IndexArgs { dir: dir.path().to_path_buf(), query: "q".into(), top_k: 3 };
    let err = commands::rank_folder(&args, &BagOfWordsEmbedder).await.unwrap_err();
    assert!(err.to_string().contains("no .txt files"));
}

#[tokio::test]
async fn summarize_pdf_reports_missing_file() {
    let args = SummarizePdfArgs { pdf: PathBuf::from("no/such/example.pdf"), window: 1000 };
    let err = commands::summarize_pdf(&args, &UnusedGenerator).await.unwrap_err();
    assert!(matches!(err.downcast_ref::<RagError>(), Some(RagError::DocumentNotFound { .. })));
}

#[tokio::test]
async fn rank_folder_rejects_mismatched_vector_count() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("ai.txt"), "neural network").unwrap();
    std::fs::write(dir.path().join("plants.txt"), "garden").unwrap();

    let args = IndexArgs { dir: dir.path().to_path_buf(), query: "neural network".into(), top_k: 3 };
    let err = commands::rank_folder(&args, &SurplusEmbedder).await.unwrap_err();
    assert!(err.to_string().contains("3 vectors for 2 documents"));
}

#[tokio::test]
async fn sentiment_sample_classifies_distinct_truncated_reviews() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reviews.txt");
    let long_review = format!("bad {}", "x".repeat(600));
    let lines = ["great film", "", "bad acting", long_review.as_str(), "loved it", "fine"];
    std::fs::write(&path, lines.join("\n")).unwrap();

    let args = SentimentSampleArgs { file: path, sample_size: 5 };
    let analyzer = RecordingAnalyzer::default();
    let results =
        commands::sentiment_sample(&args, &analyzer, &mut StdRng::seed_from_u64(7)).await.unwrap();

    assert_eq!(results.len(), 5);
    let mut reviews: Vec<_> = results.iter().map(|r| r.review.as_str()).collect();
    reviews.sort_unstable();
    reviews.dedup();
    assert_eq!(reviews.len(), 5, "reviews are sampled without replacement");

    let seen = analyzer.seen.lock().unwrap();
    assert!(seen.iter().all(|text| text.chars().count() <= REVIEW_CHARS));
    let long = results.iter().find(|r| r.review == long_review).unwrap();
    assert_eq!(long.sentiment.label, "NEGATIVE");
    assert_eq!(long.review.chars().count(), 604, "printed review is not truncated");
}

#[tokio::test]
async fn sentiment_sample_caps_at_available_reviews() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("imdb.jsonl");
    std::fs::write(
        &path,
        "{\"text\": \"a bad movie\", \"label\": 0}\n{\"text\": \"a good movie\", \"label\": 1}\n",
    )
    .unwrap();

    let args = SentimentSampleArgs { file: path, sample_size: 5 };
    let results = commands::sentiment_sample(
        &args,
        &RecordingAnalyzer::default(),
        &mut StdRng::seed_from_u64(1),
    )
    .await
    .unwrap();

    assert_eq!(results.len(), 2);
    let labels: Vec<_> = results
        .iter()
        .map(|r| (r.review.as_str(), r.sentiment.label.as_str()))
        .collect();
    assert!(labels.contains(&("a bad movie", "NEGATIVE")));
    assert!(labels.contains(&("a good movie", "POSITIVE")));
}

#[tokio::test]
async fn sentiment_sample_rejects_malformed_jsonl() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("imdb.jsonl");
    std::fs::write(&path, "{\"label\": 1}\n").unwrap();

    let args = SentimentSampleArgs { file: path, sample_size: 5 };
    let err = commands::sentiment_sample(
        &args,
        &RecordingAnalyzer::default(),
        &mut StdRng::seed_from_u64(1),
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("missing string 'text'"));
}

#[tokio::test]
async fn rewrite_prompts_for_a_polite_sentence() {
    let args = RewriteArgs { sentence: "Send it now.".into() };
    let rewritten = commands::rewrite(&args, &PromptEcho).await.unwrap();
    assert_eq!(rewritten, "Rewrite the following sentence politely:\nSend it now.");
}
