//! On-disk persistence for [`ChunkIndex`].
//!
//! An [`IndexStore`] owns one directory holding a single JSON manifest. The
//! manifest records a fingerprint of the document the index was built from
//! and the settings it was built with, so a caller can tell when either
//! changed and the stored index is stale.

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{RagError, Result};
use crate::index::ChunkIndex;

const MANIFEST_FILE: &str = "index.json";
const MANIFEST_VERSION: u32 = 1;

/// Size and modification time of a source document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceFingerprint {
    /// File length in bytes.
    pub len: u64,
    /// Modification time, seconds since the Unix epoch.
    pub modified_secs: u64,
}

impl SourceFingerprint {
    /// Fingerprint the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DocumentNotFound`] if the file is missing.
    pub async fn of(path: &Path) -> Result<Self> {
        let metadata = tokio::fs::metadata(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => RagError::DocumentNotFound { path: path.to_path_buf() },
            _ => RagError::Load { path: path.to_path_buf(), message: e.to_string() },
        })?;
        let modified_secs = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Ok(Self { len: metadata.len(), modified_secs })
    }
}

/// Chunking and embedding settings an index was built with.
///
/// Vectors from different embedding models, or chunks cut at different
/// sizes, are not interchangeable, so a change here makes a stored index stale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embedding_model: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexManifest {
    version: u32,
    #[serde(default)]
    source: Option<SourceFingerprint>,
    #[serde(default)]
    settings: Option<IndexSettings>,
    index: ChunkIndex,
}

/// A persisted index together with the fingerprint and settings it was saved with.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredIndex {
    /// The loaded index.
    pub index: ChunkIndex,
    /// Fingerprint of the source at save time, if one was recorded.
    pub source: Option<SourceFingerprint>,
    /// Build settings, absent in manifests written before they were recorded.
    pub settings: Option<IndexSettings>,
}

/// A directory holding one persisted [`ChunkIndex`].
#[derive(Debug, Clone)]
pub struct IndexStore {
    dir: PathBuf,
}

impl IndexStore {
    /// Use `dir` as the storage location. Nothing is touched until a save or load.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The storage directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    /// Whether a manifest exists in the directory.
    pub async fn exists(&self) -> bool {
        tokio::fs::try_exists(self.manifest_path()).await.unwrap_or(false)
    }

    /// Write `index` to the directory, creating it if needed.
    pub async fn save(
        &self,
        index: &ChunkIndex,
        source: Option<SourceFingerprint>,
        settings: Option<IndexSettings>,
    ) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            RagError::Persistence(format!("cannot create {}: {e}", self.dir.display()))
        })?;

        let manifest =
            IndexManifest { version: MANIFEST_VERSION, source, settings, index: index.clone() };
        let bytes = serde_json::to_vec(&manifest)
            .map_err(|e| RagError::Persistence(format!("cannot serialize index: {e}")))?;

        let path = self.manifest_path();
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| RagError::Persistence(format!("cannot write {}: {e}", path.display())))?;

        info!(path = %path.display(), chunk_count = index.len(), "saved index");
        Ok(())
    }

    /// Read the persisted index.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Persistence`] if the manifest is missing, unreadable,
    /// from an unknown format version, or internally inconsistent.
    pub async fn load(&self) -> Result<StoredIndex> {
        let path = self.manifest_path();
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| RagError::Persistence(format!("cannot read {}: {e}", path.display())))?;

        let manifest: IndexManifest = serde_json::from_slice(&bytes)
            .map_err(|e| RagError::Persistence(format!("corrupt index {}: {e}", path.display())))?;

        if manifest.version != MANIFEST_VERSION {
            return Err(RagError::Persistence(format!(
                "unsupported index version {} (expected {MANIFEST_VERSION})",
                manifest.version
            )));
        }

        let index = ChunkIndex::from_parts(
            manifest.index.chunks().to_vec(),
            manifest.index.vectors().clone(),
        )
        .map_err(|e| RagError::Persistence(format!("inconsistent index: {e}")))?;

        debug!(path = %path.display(), chunk_count = index.len(), "loaded index");
        Ok(StoredIndex { index, source: manifest.source, settings: manifest.settings })
    }
}
