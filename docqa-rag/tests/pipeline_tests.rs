//! End-to-end tests of the RAG orchestrator with in-process model stand-ins.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use docqa_rag::{
    Answer, Answerer, Cleaned, Document, EmbeddingProvider, IndexStore, RagConfig, RagError,
    RagPipeline, RecursiveChunker, WordChunker,
};

const VOCABULARY: [&str; 6] = ["transformer", "attention", "weather", "rain", "cat", "dog"];

/// Counts vocabulary words; texts sharing words land close together.
#[derive(Default)]
struct BagOfWordsEmbedder {
    batch_calls: Mutex<usize>,
}

#[async_trait]
impl EmbeddingProvider for BagOfWordsEmbedder {
    async fn embed(&self, text: &str) -> docqa_rag::Result<Vec<f32>> {
        let lower = text.to_lowercase();
        Ok(VOCABULARY.iter().map(|w| lower.matches(w).count() as f32).collect())
    }

    async fn embed_batch(&self, texts: &[&str]) -> docqa_rag::Result<Vec<Vec<f32>>> {
        *self.batch_calls.lock().unwrap() += 1;
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

/// Delegates to a shared embedder under a different model name.
struct Renamed(Arc<BagOfWordsEmbedder>, &'static str);

#[async_trait]
impl EmbeddingProvider for Renamed {
    fn model_name(&self) -> &str {
        self.1
    }

    async fn embed(&self, text: &str) -> docqa_rag::Result<Vec<f32>> {
        self.0.embed(text).await
    }

    async fn embed_batch(&self, texts: &[&str]) -> docqa_rag::Result<Vec<Vec<f32>>> {
        self.0.embed_batch(texts).await
    }
}

/// Records the context it was given and answers with its first word.
#[derive(Default)]
struct RecordingAnswerer {
    contexts: Mutex<Vec<String>>,
}

#[async_trait]
impl Answerer for RecordingAnswerer {
    async fn answer(&self, _question: &str, context: &str) -> docqa_rag::Result<Answer> {
        self.contexts.lock().unwrap().push(context.to_string());
        let first = context.split_whitespace().next().unwrap_or_default().to_string();
        Ok(Answer { answer: first, score: 0.75, start: None, end: None })
    }
}

struct FailingAnswerer;

#[async_trait]
impl Answerer for FailingAnswerer {
    async fn answer(&self, _question: &str, _context: &str) -> docqa_rag::Result<Answer> {
        Err(RagError::AnswerError { provider: "test".into(), message: "QA error".into() })
    }
}

fn pipeline(
    top_k: usize,
    chunk_words: usize,
    embedder: Arc<BagOfWordsEmbedder>,
    answerer: Arc<dyn Answerer>,
) -> RagPipeline {
    RagPipeline::builder()
        .config(RagConfig::builder().chunk_size(chunk_words).top_k(top_k).build().unwrap())
        .embedding_provider(embedder)
        .answerer(answerer)
        .chunker(Arc::new(WordChunker::new(chunk_words).unwrap()))
        .build()
        .unwrap()
}

const TEXT: &str = "weather rain rain today \
                    transformer attention attention model \
                    cat dog cat pets";

#[tokio::test]
async fn answers_from_most_similar_chunks_in_retrieval_order() {
    let embedder = Arc::new(BagOfWordsEmbedder::default());
    let answerer = Arc::new(RecordingAnswerer::default());
    let pipeline = pipeline(2, 4, embedder.clone(), answerer.clone());

    let index = pipeline.index_document(&Document::new("doc.txt", TEXT)).await.unwrap();
    assert_eq!(index.len(), 3);
    assert_eq!(*embedder.batch_calls.lock().unwrap(), 1);

    let outcome = pipeline.ask(&index, "transformer attention attention").await.unwrap();
    assert_eq!(outcome.neighbors.len(), 2);
    assert_eq!(outcome.neighbors[0].index, 1);
    assert!(outcome.context.starts_with("transformer attention attention model "));
    assert_eq!(outcome.answer.answer, "transformer");
    assert_eq!(answerer.contexts.lock().unwrap().as_slice(), [outcome.context.clone()]);
}

#[tokio::test]
async fn top_k_larger_than_index_uses_every_chunk() {
    let embedder = Arc::new(BagOfWordsEmbedder::default());
    let answerer = Arc::new(RecordingAnswerer::default());
    let pipeline = pipeline(10, 400, embedder, answerer);

    let index = pipeline.index_document(&Document::new("doc.txt", TEXT)).await.unwrap();
    let outcome = pipeline.ask(&index, "cat").await.unwrap();
    assert_eq!(outcome.neighbors.len(), 1);
    assert_eq!(outcome.context, TEXT.split_whitespace().collect::<Vec<_>>().join(" "));
}

#[tokio::test]
async fn missing_document_aborts_the_run() {
    let pipeline = pipeline(
        3,
        400,
        Arc::new(BagOfWordsEmbedder::default()),
        Arc::new(RecordingAnswerer::default()),
    );
    let err = pipeline.answer_from_path("no/such/sample.pdf", "q").await.unwrap_err();
    assert!(matches!(err, RagError::DocumentNotFound { .. }));
}

#[tokio::test]
async fn answerer_failure_propagates_unchanged() {
    let pipeline = pipeline(3, 4, Arc::new(BagOfWordsEmbedder::default()), Arc::new(FailingAnswerer));
    let index = pipeline.index_document(&Document::new("doc.txt", TEXT)).await.unwrap();
    let err = pipeline.ask(&index, "cat").await.unwrap_err();
    assert!(err.to_string().contains("QA error"));
}

#[tokio::test]
async fn one_shot_flow_reads_text_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, TEXT).unwrap();

    let pipeline = pipeline(
        1,
        4,
        Arc::new(BagOfWordsEmbedder::default()),
        Arc::new(RecordingAnswerer::default()),
    );
    let outcome = pipeline.answer_from_path(&path, "rain").await.unwrap();
    assert_eq!(outcome.answer.answer, "weather");
}

fn persisting_pipeline(chunk_size: usize, embedder: Arc<dyn EmbeddingProvider>) -> RagPipeline {
    RagPipeline::builder()
        .config(RagConfig::builder().chunk_size(chunk_size).chunk_overlap(2).build().unwrap())
        .embedding_provider(embedder)
        .answerer(Arc::new(RecordingAnswerer::default()))
        .chunker(Arc::new(Cleaned(RecursiveChunker::new(chunk_size, 2).unwrap())))
        .build()
        .unwrap()
}

#[tokio::test]
async fn persisted_index_is_reused_until_source_changes() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("sample.txt");
    std::fs::write(&source, "cat <pad> dog\n\nweather rain").unwrap();
    let store = IndexStore::new(dir.path().join("faiss_store"));

    let embedder = Arc::new(BagOfWordsEmbedder::default());
    let pipeline = persisting_pipeline(16, embedder.clone());

    let first = pipeline.load_or_build_index(&source, &store).await.unwrap();
    assert_eq!(first.chunks(), ["cat dog", "weather rain"]);
    assert_eq!(*embedder.batch_calls.lock().unwrap(), 1);

    let second = pipeline.load_or_build_index(&source, &store).await.unwrap();
    assert_eq!(second, first);
    assert_eq!(*embedder.batch_calls.lock().unwrap(), 1, "stored index should be reused");

    std::fs::write(&source, "a different and longer document about cats").unwrap();
    let third = pipeline.load_or_build_index(&source, &store).await.unwrap();
    assert_ne!(third, first);
    assert_eq!(*embedder.batch_calls.lock().unwrap(), 2, "stale index should be rebuilt");
}

#[tokio::test]
async fn stored_index_is_served_when_source_disappears() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("sample.txt");
    std::fs::write(&source, "cat dog\n\nweather rain").unwrap();
    let store = IndexStore::new(dir.path().join("faiss_store"));

    let embedder = Arc::new(BagOfWordsEmbedder::default());
    let pipeline = persisting_pipeline(16, embedder.clone());
    let built = pipeline.load_or_build_index(&source, &store).await.unwrap();

    std::fs::remove_file(&source).unwrap();
    let served = pipeline.load_or_build_index(&source, &store).await.unwrap();
    assert_eq!(served, built);
    assert_eq!(*embedder.batch_calls.lock().unwrap(), 1, "nothing to rebuild from");

    let empty_store = IndexStore::new(dir.path().join("elsewhere"));
    let err = pipeline.load_or_build_index(&source, &empty_store).await.unwrap_err();
    assert!(matches!(err, RagError::DocumentNotFound { .. }));
}

#[tokio::test]
async fn changed_settings_make_the_stored_index_stale() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("sample.txt");
    std::fs::write(&source, "cat dog\n\nweather rain").unwrap();
    let store = IndexStore::new(dir.path().join("faiss_store"));
    let embedder = Arc::new(BagOfWordsEmbedder::default());

    let original = persisting_pipeline(16, embedder.clone());
    original.load_or_build_index(&source, &store).await.unwrap();
    let saved = store.load().await.unwrap().settings.unwrap();
    assert_eq!((saved.chunk_size, saved.chunk_overlap), (16, 2));
    assert_eq!(saved.embedding_model, "unspecified");

    let resized = persisting_pipeline(8, embedder.clone());
    let rebuilt = resized.load_or_build_index(&source, &store).await.unwrap();
    assert_eq!(*embedder.batch_calls.lock().unwrap(), 2, "chunk size change should rebuild");
    assert!(rebuilt.len() > 2);
    assert_eq!(store.load().await.unwrap().settings.unwrap().chunk_size, 8);

    let remodeled = persisting_pipeline(8, Arc::new(Renamed(embedder.clone(), "other-model")));
    remodeled.load_or_build_index(&source, &store).await.unwrap();
    assert_eq!(*embedder.batch_calls.lock().unwrap(), 3, "model change should rebuild");
    assert_eq!(store.load().await.unwrap().settings.unwrap().embedding_model, "other-model");

    remodeled.load_or_build_index(&source, &store).await.unwrap();
    assert_eq!(*embedder.batch_calls.lock().unwrap(), 3, "unchanged settings reuse the index");
}

#[tokio::test]
async fn builder_requires_models() {
    let err = RagPipeline::builder()
        .chunker(Arc::new(WordChunker::new(4).unwrap()))
        .build()
        .unwrap_err();
    assert!(matches!(err, RagError::ConfigError(_)));
}
