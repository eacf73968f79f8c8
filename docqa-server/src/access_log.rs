//! Per-request access log.
//!
//! A middleware turns each finished request into an [`AccessRecord`] and
//! hands it to an [`AccessLogQueue`]. One worker task drains the matching
//! [`AccessLogReceiver`] into an [`AccessLogSink`], so handlers never touch
//! the log file.
//!
//! The queue is a tokio channel chosen by [`OverflowPolicy`]: a bounded
//! `mpsc` channel when producers should wait for space, a `broadcast`
//! channel when the oldest records should be overwritten instead.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Local};
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::state::AppContext;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct AccessRecord {
    pub client: String,
    pub method: String,
    pub path: String,
    pub status: u16,
    pub duration: Duration,
    pub at: DateTime<Local>,
}

impl AccessRecord {
    /// `"<client> - <METHOD> <path> status=<code> duration=<s>s"`, prefixed
    /// with `"INVALID: "` for 4xx and 5xx responses.
    pub fn message(&self) -> String {
        let base = format!(
            "{} - {} {} status={} duration={:.3}s",
            self.client,
            self.method,
            self.path,
            self.status,
            self.duration.as_secs_f64()
        );
        if self.status >= 400 { format!("INVALID: {base}") } else { base }
    }

    /// The record as written to the log file.
    pub fn line(&self) -> String {
        format!("{} - INFO - {}", self.at.format("%Y-%m-%d %H:%M:%S,%3f"), self.message())
    }
}

/// What a push does when the queue is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Overwrite the oldest queued record. Never waits.
    #[default]
    DropOldest,
    /// Wait until the worker frees a slot.
    Block,
}

#[derive(Debug, Clone)]
enum QueueTx {
    Bounded(mpsc::Sender<AccessRecord>),
    Lossy(broadcast::Sender<AccessRecord>),
}

#[derive(Debug)]
enum QueueRx {
    Bounded(mpsc::Receiver<AccessRecord>),
    Lossy(broadcast::Receiver<AccessRecord>),
}

/// Producer side of the access log. Cheap to clone; every clone feeds the
/// same receiver.
#[derive(Debug, Clone)]
pub struct AccessLogQueue {
    tx: Arc<Mutex<Option<QueueTx>>>,
    capacity: usize,
    policy: OverflowPolicy,
    dropped: Arc<AtomicU64>,
}

/// Consumer side of the access log, owned by the worker.
#[derive(Debug)]
pub struct AccessLogReceiver {
    rx: QueueRx,
    dropped: Arc<AtomicU64>,
}

impl AccessLogQueue {
    /// A queue holding at most `capacity` records (minimum 1).
    ///
    /// Under [`OverflowPolicy::DropOldest`] the retained window is
    /// `capacity` rounded up to a power of two.
    pub fn new(capacity: usize, policy: OverflowPolicy) -> (Self, AccessLogReceiver) {
        let capacity = capacity.max(1);
        let (tx, rx) = match policy {
            OverflowPolicy::Block => {
                let (tx, rx) = mpsc::channel(capacity);
                (QueueTx::Bounded(tx), QueueRx::Bounded(rx))
            }
            OverflowPolicy::DropOldest => {
                let (tx, rx) = broadcast::channel(capacity);
                (QueueTx::Lossy(tx), QueueRx::Lossy(rx))
            }
        };
        let dropped = Arc::new(AtomicU64::new(0));
        let queue = Self { tx: Arc::new(Mutex::new(Some(tx))), capacity, policy, dropped: dropped.clone() };
        (queue, AccessLogReceiver { rx, dropped })
    }

    fn sender(&self) -> MutexGuard<'_, Option<QueueTx>> {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Records overwritten under [`OverflowPolicy::DropOldest`], as counted
    /// by the receiver so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.sender().is_none()
    }

    /// Enqueue a record. Returns `false` once the queue is closed or the
    /// receiver is gone.
    pub async fn push(&self, record: AccessRecord) -> bool {
        let tx = self.sender().clone();
        match tx {
            Some(QueueTx::Bounded(tx)) => tx.send(record).await.is_ok(),
            Some(QueueTx::Lossy(tx)) => tx.send(record).is_ok(),
            None => false,
        }
    }

    /// Stop accepting records. Queued records are still delivered.
    pub fn close(&self) {
        self.sender().take();
    }
}

impl AccessLogReceiver {
    /// Take the oldest record, waiting for one. `None` once closed and drained.
    pub async fn recv(&mut self) -> Option<AccessRecord> {
        match &mut self.rx {
            QueueRx::Bounded(rx) => rx.recv().await,
            QueueRx::Lossy(rx) => loop {
                match rx.recv().await {
                    Ok(record) => return Some(record),
                    Err(RecvError::Lagged(missed)) => {
                        self.dropped.fetch_add(missed, Ordering::Relaxed);
                    }
                    Err(RecvError::Closed) => return None,
                }
            },
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

// ── Sinks ──────────────────────────────────────────────────────────

#[async_trait]
pub trait AccessLogSink: Send + Sync {
    async fn write_line(&self, line: &str) -> std::io::Result<()>;
}

/// Appends lines to a file, creating it if needed.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    file: tokio::sync::Mutex<tokio::fs::File>,
}

impl FileSink {
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = tokio::fs::OpenOptions::new().create(true).append(true).open(&path).await?;
        Ok(Self { path, file: tokio::sync::Mutex::new(file) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AccessLogSink for FileSink {
    async fn write_line(&self, line: &str) -> std::io::Result<()> {
        let mut file = self.file.lock().await;
        file.write_all(format!("{line}\n").as_bytes()).await?;
        file.flush().await
    }
}

/// Keeps lines in memory. Used in tests.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl AccessLogSink for MemorySink {
    async fn write_line(&self, line: &str) -> std::io::Result<()> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).push(line.to_string());
        Ok(())
    }
}

/// Drain `receiver` into `sink` until the queue is closed and empty.
pub fn spawn_worker(mut receiver: AccessLogReceiver, sink: Arc<dyn AccessLogSink>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut written = 0u64;
        while let Some(record) = receiver.recv().await {
            match sink.write_line(&record.line()).await {
                Ok(()) => written += 1,
                Err(e) => warn!(error = %e, path = %record.path, "failed to write access log record"),
            }
        }
        info!(written, dropped = receiver.dropped(), "access log worker stopped");
    })
}

// ── Middleware ─────────────────────────────────────────────────────

pub async fn record_access(State(ctx): State<AppContext>, req: Request<Body>, next: Next) -> Response {
    let Some(queue) = ctx.access_log().cloned() else {
        return next.run(req).await;
    };

    let client = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    let record = AccessRecord {
        client,
        method,
        path,
        status: response.status().as_u16(),
        duration: started.elapsed(),
        at: Local::now(),
    };
    if !queue.push(record).await {
        warn!("access log queue closed, record discarded");
    }
    response
}
