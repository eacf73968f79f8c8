use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router, middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use docqa_rag::hf::{
    HfAnswerer, HfClient, HfEmbeddingProvider, HfSentimentAnalyzer, HfSummarizer, HfTextGenerator,
};
use docqa_rag::{Cleaned, IndexStore, RagConfig, RagPipeline, RecursiveChunker};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::access_log::{AccessLogQueue, FileSink, record_access, spawn_worker};
use crate::auth::require_api_key;
use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::handlers;
use crate::state::{AppContext, InferenceModels, RagService};

pub fn app_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    let protected = Router::new()
        .route("/qa", post(handlers::qa))
        .route("/summarize", post(handlers::summarize))
        .route_layer(middleware::from_fn_with_state(ctx.clone(), require_api_key));

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/sentiment", post(handlers::sentiment))
        .route("/analyze", post(handlers::sentiment))
        .route("/summary", post(handlers::summary))
        .route("/ask", post(handlers::ask))
        .merge(protected)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn_with_state(ctx.clone(), record_access))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(ctx)
}

/// Hosted models for every endpoint, sharing one HTTP client.
pub fn hosted_models(client: &HfClient) -> InferenceModels {
    InferenceModels {
        sentiment: Arc::new(HfSentimentAnalyzer::new(client.clone())),
        summarizer: Arc::new(HfSummarizer::new(client.clone())),
        generator: Arc::new(HfTextGenerator::causal(client.clone())),
        text2text: Arc::new(HfTextGenerator::text2text(client.clone())),
    }
}

/// Build the `/ask` service: load the persisted index or index the PDF.
///
/// Failure here is not fatal; the server starts and `/ask` reports the
/// vector store as not initialized.
async fn build_rag_service(config: &ServerConfig, client: &HfClient) -> Option<RagService> {
    let source = config.pdf_path.as_ref()?;
    let rag_config = RagConfig::service_defaults();

    let pipeline = RecursiveChunker::new(rag_config.chunk_size, rag_config.chunk_overlap)
        .and_then(|chunker| {
            RagPipeline::builder()
                .config(rag_config.clone())
                .embedding_provider(Arc::new(HfEmbeddingProvider::new(client.clone())))
                .answerer(Arc::new(HfAnswerer::new(client.clone())))
                .chunker(Arc::new(Cleaned(chunker)))
                .build()
        });
    let pipeline = match pipeline {
        Ok(pipeline) => pipeline,
        Err(e) => {
            warn!(error = %e, "invalid retrieval configuration; /ask disabled");
            return None;
        }
    };

    let store = IndexStore::new(&config.index_dir);
    match pipeline.load_or_build_index(source, &store).await {
        Ok(index) => {
            info!(source = %source.display(), chunks = index.len(), "vector store ready");
            Some(RagService::new(pipeline, index))
        }
        Err(e) => {
            warn!(source = %source.display(), error = %e, "vector store not initialized");
            None
        }
    }
}

pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let client = HfClient::from_env();
    let mut ctx = AppContext::new(hosted_models(&client), config.api_key.clone());

    if let Some(service) = build_rag_service(&config, &client).await {
        ctx = ctx.with_rag(service);
    }

    let mut worker = None;
    if let Some(path) = &config.access_log {
        let sink = FileSink::open(path)
            .await
            .with_context(|| format!("failed to open access log {}", path.display()))?;
        let (queue, receiver) = AccessLogQueue::new(config.log_queue_capacity, config.log_overflow);
        worker = Some((queue.clone(), spawn_worker(receiver, Arc::new(sink))));
        ctx = ctx.with_access_log(queue);
    }

    let app = app_router(ctx);
    let addr: SocketAddr = config
        .bind_addr()
        .parse()
        .with_context(|| format!("invalid host/port for docqa-server: {}", config.bind_addr()))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("docqa-server listening on http://{}", addr);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some((queue, handle)) = worker {
        queue.close();
        if let Err(e) = handle.await {
            warn!(error = %e, "access log worker did not finish cleanly");
        }
    }
    info!("docqa-server stopped");
    Ok(())
}

fn panic_response(_: Box<dyn std::any::Any + Send + 'static>) -> Response {
    error!("handler panicked");
    ApiError::internal("Internal Server Error").into_response()
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
