//! `docqa-server` serves the inference endpoints and retrieval-augmented
//! question answering over HTTP.
//!
//! Routes validate their JSON bodies with [`validation::RequestShape`], call
//! the model traits in [`docqa_rag::inference`], and report failures as
//! `{"detail": ...}` payloads (`/ask` reports its own as `{"error": ...}`).
//! Every request is written to an access log by a background worker fed
//! through a tokio channel.

pub mod access_log;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod server;
pub mod state;
pub mod validation;

pub use config::ServerConfig;
pub use error::ApiError;
pub use server::{app_router, hosted_models, run_server};
pub use state::{AppContext, InferenceModels, RagService};
