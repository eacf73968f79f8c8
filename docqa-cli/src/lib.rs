//! `docqa`: the script front end.
//!
//! Every option has a default, so `docqa` with no arguments answers the
//! default question over `sample.pdf`.

pub mod commands;

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use docqa_rag::hf::{
    HfAnswerer, HfClient, HfEmbeddingProvider, HfSentimentAnalyzer, HfTextGenerator,
};
use docqa_telemetry::LogFormat;

use commands::{AskArgs, IndexArgs, RewriteArgs, SentimentSampleArgs, SummarizePdfArgs};

#[derive(Debug, Parser)]
#[command(name = "docqa", version, about = "Ask questions about documents with hosted models")]
pub struct Cli {
    /// Inference endpoint root.
    #[arg(long, global = true, env = "HF_API_BASE", default_value = docqa_rag::hf::DEFAULT_BASE_URL)]
    pub hf_base: String,

    #[arg(long, global = true, env = "HF_API_TOKEN", hide_env_values = true)]
    pub hf_token: Option<String>,

    #[arg(long, global = true, default_value = "pretty")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Answer a question from a document (the default).
    Ask(AskArgs),
    /// Rank the `.txt` files of a folder against a query.
    Index(IndexArgs),
    /// Summarize a PDF.
    SummarizePdf(SummarizePdfArgs),
    /// Classify a random sample of reviews.
    SentimentSample(SentimentSampleArgs),
    /// Reword a sentence politely.
    Rewrite(RewriteArgs),
}

impl Cli {
    fn client(&self) -> HfClient {
        let client = HfClient::new(&self.hf_base);
        match &self.hf_token {
            Some(token) if !token.is_empty() => client.with_token(token),
            _ => client,
        }
    }

    pub async fn run(self) -> Result<()> {
        let client = self.client();
        match self.command.unwrap_or_else(|| Command::Ask(AskArgs::default())) {
            Command::Ask(args) => {
                let outcome = commands::ask(
                    &args,
                    Arc::new(HfEmbeddingProvider::new(client.clone())),
                    Arc::new(HfAnswerer::new(client)),
                )
                .await?;
                println!("Answer: {}", outcome.answer.answer);
            }
            Command::Index(args) => {
                let matches = commands::rank_folder(&args, &HfEmbeddingProvider::new(client)).await?;
                println!("Top matching files:");
                for (rank, m) in matches.iter().enumerate() {
                    println!("{}. {}  (distance={:.4})", rank + 1, m.name, m.distance);
                }
            }
            Command::SummarizePdf(args) => {
                let summary =
                    commands::summarize_pdf(&args, &HfTextGenerator::text2text(client)).await?;
                println!("PDF Summary:\n\n{summary}");
            }
            Command::SentimentSample(args) => {
                let results = commands::sentiment_sample(
                    &args,
                    &HfSentimentAnalyzer::new(client),
                    &mut rand::thread_rng(),
                )
                .await?;
                println!("Random {} reviews with sentiment:\n", results.len());
                for (i, result) in results.iter().enumerate() {
                    println!("Review {}: {}", i + 1, result.review);
                    println!(
                        "Sentiment: {} (score: {:.4})",
                        result.sentiment.label, result.sentiment.score
                    );
                    println!("{}", "-".repeat(60));
                }
            }
            Command::Rewrite(args) => {
                let polite = commands::rewrite(&args, &HfTextGenerator::text2text(client)).await?;
                println!("Polite Sentence: {polite}");
            }
        }
        Ok(())
    }
}
