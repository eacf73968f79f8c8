//! The script flows. Each takes its models as trait objects so it can run
//! against hosted backends or stand-ins.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Args;
use docqa_rag::inference::{
    Sentiment, SentimentAnalyzer, TextGenerator, rewrite_politely, summarize_in_windows,
    truncate_chars,
};
use docqa_rag::loader::{load_pdf, load_text_folder};
use docqa_rag::{
    Answerer, AskOutcome, EmbeddingProvider, FlatL2Index, RagConfig, RagPipeline, WordChunker,
};
use rand::Rng;
use rand::seq::SliceRandom;
use serde_json::Value;
use tracing::info;

pub const DEFAULT_PDF: &str = "sample.pdf";
pub const DEFAULT_QUESTION: &str = "What architecture does this paper introduce?";
pub const DEFAULT_DATA_DIR: &str = "Data";
pub const DEFAULT_QUERY: &str = "Which files talk about AI?";
pub const DEFAULT_SUMMARY_PDF: &str = "example.pdf";
pub const DEFAULT_REVIEWS: &str = "reviews.txt";
pub const DEFAULT_SENTENCE: &str = "Give me the report by tomorrow.";

/// Characters of a review passed to the classifier.
pub const REVIEW_CHARS: usize = 512;

#[derive(Debug, Clone, Args)]
pub struct AskArgs {
    /// PDF (or text file) to answer from.
    #[arg(long, default_value = DEFAULT_PDF)]
    pub pdf: PathBuf,
    #[arg(long, short, default_value = DEFAULT_QUESTION)]
    pub question: String,
    /// Words per chunk.
    #[arg(long, default_value_t = 400)]
    pub chunk_size: usize,
    #[arg(long, default_value_t = 3)]
    pub top_k: usize,
}

impl Default for AskArgs {
    fn default() -> Self {
        Self {
            pdf: PathBuf::from(DEFAULT_PDF),
            question: DEFAULT_QUESTION.to_string(),
            chunk_size: 400,
            top_k: 3,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct IndexArgs {
    /// Folder of `.txt` files.
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    pub dir: PathBuf,
    #[arg(long, default_value = DEFAULT_QUERY)]
    pub query: String,
    #[arg(long, default_value_t = 3)]
    pub top_k: usize,
}

#[derive(Debug, Clone, Args)]
pub struct SummarizePdfArgs {
    #[arg(long, default_value = DEFAULT_SUMMARY_PDF)]
    pub pdf: PathBuf,
    /// Characters summarized per step.
    #[arg(long, default_value_t = 1000)]
    pub window: usize,
}

#[derive(Debug, Clone, Args)]
pub struct SentimentSampleArgs {
    /// Reviews, one per line, or a `.jsonl` file of objects with a `text` field.
    #[arg(long, default_value = DEFAULT_REVIEWS)]
    pub file: PathBuf,
    #[arg(long, default_value_t = 5)]
    pub sample_size: usize,
}

#[derive(Debug, Clone, Args)]
pub struct RewriteArgs {
    #[arg(long, short, default_value = DEFAULT_SENTENCE)]
    pub sentence: String,
}

/// Answer one question over one document, building the index from scratch.
pub async fn ask(
    args: &AskArgs,
    embedder: Arc<dyn EmbeddingProvider>,
    answerer: Arc<dyn Answerer>,
) -> Result<AskOutcome> {
    let config = RagConfig::builder().chunk_size(args.chunk_size).top_k(args.top_k).build()?;
    let pipeline = RagPipeline::builder()
        .config(config)
        .embedding_provider(embedder)
        .answerer(answerer)
        .chunker(Arc::new(WordChunker::new(args.chunk_size)?))
        .build()?;

    let outcome = pipeline
        .answer_from_path(&args.pdf, &args.question)
        .await
        .with_context(|| format!("failed to answer from {}", args.pdf.display()))?;
    Ok(outcome)
}

/// A file ranked against a query.
#[derive(Debug, Clone, PartialEq)]
pub struct FileMatch {
    pub name: String,
    pub distance: f32,
}

/// Embed every `.txt` file of a folder and rank the files against a query.
pub async fn rank_folder(args: &IndexArgs, embedder: &dyn EmbeddingProvider) -> Result<Vec<FileMatch>> {
    let documents = load_text_folder(&args.dir).await?;
    if documents.is_empty() {
        bail!("no .txt files in {}", args.dir.display());
    }

    let texts: Vec<&str> = documents.iter().map(|d| d.text.as_str()).collect();
    let index = FlatL2Index::from_vectors(embedder.embed_batch(&texts).await?)?;
    info!(documents = index.len(), "stored documents in index");

    if index.len() != documents.len() {
        bail!("embedder returned {} vectors for {} documents", index.len(), documents.len());
    }

    let query = embedder.embed(&args.query).await?;
    let matches = index
        .search(&query, args.top_k)?
        .into_iter()
        .filter_map(|n| {
            let document = documents.get(n.index)?;
            Some(FileMatch { name: document.name(), distance: n.distance })
        })
        .collect();
    Ok(matches)
}

/// Summarize a PDF window by window, then summarize the partial summaries.
pub async fn summarize_pdf(args: &SummarizePdfArgs, generator: &dyn TextGenerator) -> Result<String> {
    if args.window == 0 {
        bail!("--window must be greater than zero");
    }
    let document = load_pdf(&args.pdf).await?;
    let summary = summarize_in_windows(generator, &document.text, args.window).await?;
    Ok(summary)
}

/// Read reviews from a text file (one per non-blank line) or a `.jsonl`
/// file whose lines are objects with a string `text` field.
pub async fn load_reviews(path: &Path) -> Result<Vec<String>> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read reviews from {}", path.display()))?;
    let lines = contents.lines().map(str::trim).filter(|l| !l.is_empty());

    if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("jsonl")) {
        lines
            .enumerate()
            .map(|(n, line)| {
                let value: Value = serde_json::from_str(line)
                    .with_context(|| format!("{}:{}: invalid JSON", path.display(), n + 1))?;
                value
                    .get("text")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .with_context(|| format!("{}:{}: missing string 'text'", path.display(), n + 1))
            })
            .collect()
    } else {
        Ok(lines.map(str::to_string).collect())
    }
}

/// Up to `count` distinct reviews, chosen uniformly at random.
pub fn sample_reviews<'a, R: Rng + ?Sized>(reviews: &'a [String], count: usize, rng: &mut R) -> Vec<&'a str> {
    reviews.choose_multiple(rng, count).map(String::as_str).collect()
}

/// A sampled review with its classifier output.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewSentiment {
    pub review: String,
    pub sentiment: Sentiment,
}

/// Classify a random sample of reviews. Only the first [`REVIEW_CHARS`]
/// characters of each review reach the classifier.
pub async fn sentiment_sample<R: Rng + ?Sized>(
    args: &SentimentSampleArgs,
    analyzer: &dyn SentimentAnalyzer,
    rng: &mut R,
) -> Result<Vec<ReviewSentiment>> {
    let reviews = load_reviews(&args.file).await?;
    if reviews.is_empty() {
        bail!("no reviews in {}", args.file.display());
    }

    let sample: Vec<String> =
        sample_reviews(&reviews, args.sample_size, rng).into_iter().map(str::to_string).collect();
    info!(available = reviews.len(), sampled = sample.len(), "sampled reviews");

    let mut results = Vec::with_capacity(sample.len());
    for review in sample {
        let sentiment = analyzer.analyze(truncate_chars(&review, REVIEW_CHARS)).await?;
        results.push(ReviewSentiment { review, sentiment });
    }
    Ok(results)
}

/// Reword a sentence politely.
pub async fn rewrite(args: &RewriteArgs, generator: &dyn TextGenerator) -> Result<String> {
    Ok(rewrite_politely(generator, &args.sentence).await?)
}
