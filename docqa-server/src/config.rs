use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use docqa_telemetry::LogFormat;

use crate::access_log::{DEFAULT_QUEUE_CAPACITY, OverflowPolicy};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_API_KEY: &str = "my-secret-key";
pub const DEFAULT_PDF_PATH: &str = "sample.pdf";
pub const DEFAULT_INDEX_DIR: &str = "faiss_store";
pub const DEFAULT_ACCESS_LOG: &str = "api_logs.log";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub api_key: String,
    /// Document served by `/ask`. When absent, `/ask` reports the vector store
    /// as not initialized.
    pub pdf_path: Option<PathBuf>,
    pub index_dir: PathBuf,
    /// Access log file. `None` disables the access log.
    pub access_log: Option<PathBuf>,
    pub log_queue_capacity: usize,
    pub log_overflow: OverflowPolicy,
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            api_key: DEFAULT_API_KEY.to_string(),
            pdf_path: Some(PathBuf::from(DEFAULT_PDF_PATH)),
            index_dir: PathBuf::from(DEFAULT_INDEX_DIR),
            access_log: Some(PathBuf::from(DEFAULT_ACCESS_LOG)),
            log_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            log_overflow: OverflowPolicy::default(),
            log_format: LogFormat::default(),
        }
    }
}

impl ServerConfig {
    /// Read overrides from `DOCQA_*` variables on top of the defaults.
    ///
    /// An empty `DOCQA_PDF_PATH` or `DOCQA_ACCESS_LOG` disables that feature.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`ServerConfig::from_env`] with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(host) = lookup("DOCQA_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("DOCQA_PORT") {
            config.port = port.parse().with_context(|| format!("invalid DOCQA_PORT: {port}"))?;
        }
        if let Some(key) = lookup("DOCQA_API_KEY") {
            config.api_key = key;
        }
        if let Some(path) = lookup("DOCQA_PDF_PATH") {
            config.pdf_path = (!path.is_empty()).then(|| PathBuf::from(path));
        }
        if let Some(dir) = lookup("DOCQA_INDEX_DIR") {
            config.index_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("DOCQA_ACCESS_LOG") {
            config.access_log = (!path.is_empty()).then(|| PathBuf::from(path));
        }
        if let Some(capacity) = lookup("DOCQA_LOG_QUEUE") {
            config.log_queue_capacity = capacity
                .parse()
                .with_context(|| format!("invalid DOCQA_LOG_QUEUE: {capacity}"))?;
        }
        if let Some(policy) = lookup("DOCQA_LOG_OVERFLOW") {
            config.log_overflow = match policy.as_str() {
                "drop-oldest" | "drop_oldest" => OverflowPolicy::DropOldest,
                "block" => OverflowPolicy::Block,
                other => anyhow::bail!("invalid DOCQA_LOG_OVERFLOW: {other}"),
            };
        }
        if let Some(format) = lookup("DOCQA_LOG_FORMAT") {
            config.log_format = LogFormat::from_str(&format)
                .map_err(|e| anyhow::anyhow!("invalid DOCQA_LOG_FORMAT: {e}"))?;
        }

        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
