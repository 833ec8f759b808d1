//! Filesystem-backed artifact store.
//!
//! Each processed document owns one directory under the store root, named by its
//! document identifier and holding the serialized artifacts produced for it:
//! `{id}_enhanced.json`, `{id}_index.json`, and optionally `{id}_full.json`. The
//! store is a thin keyed interface (`ensure`/`write`/`read`/`list`) so the backing
//! directory tree could be swapped for a real key-value store without touching the
//! orchestrator.
//!
//! Concurrent writes under the same identifier are last-writer-wins; the
//! orchestrator avoids handing out an identifier whose directory already exists,
//! but two requests racing on the same fresh candidate can still interleave.

use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised by the artifact store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying filesystem refused an operation (permissions, disk full).
    #[error("Store unavailable: {0}")]
    Unavailable(#[from] std::io::Error),
    /// An artifact payload could not be serialized or deserialized.
    #[error("Failed to encode/decode artifact: {0}")]
    Codec(#[from] serde_json::Error),
}

/// The closed set of artifact kinds persisted for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Enhanced document record (raw record plus sub-document groupings).
    Enhanced,
    /// Hierarchical navigation index derived from the enhanced record.
    Index,
    /// Optional full record including per-page payloads.
    Full,
}

impl ArtifactKind {
    /// Map the `format` query parameter onto an artifact kind.
    ///
    /// An unrecognized string is a caller error, reported as `None` so the API
    /// boundary can produce a 400 rather than a storage fault.
    pub fn from_format(format: &str) -> Option<Self> {
        match format {
            "enhanced" => Some(Self::Enhanced),
            "index" => Some(Self::Index),
            "full" => Some(Self::Full),
            _ => None,
        }
    }

    fn file_name(self, document_id: &str) -> String {
        let suffix = match self {
            Self::Enhanced => "enhanced",
            Self::Index => "index",
            Self::Full => "full",
        };
        format!("{document_id}_{suffix}.json")
    }
}

/// Summary row produced by [`ArtifactStore::list`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoredDocument {
    /// Identifier of the processed document.
    pub document_id: String,
    /// Page count recorded in the enhanced artifact.
    pub total_pages: u64,
    /// Number of sub-document groupings in the enhanced artifact.
    pub sub_documents: usize,
}

/// Keyed artifact storage rooted at a single directory.
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Open a store rooted at `root`, creating the root directory if missing.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Idempotently create the directory for `document_id` and return its path.
    pub fn ensure(&self, document_id: &str) -> Result<PathBuf, StoreError> {
        let dir = self.root.join(document_id);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Whether any directory exists for `document_id`, artifacts present or not.
    ///
    /// Used by the orchestrator to disambiguate identifier collisions before any
    /// artifact is written.
    pub fn entry_exists(&self, document_id: &str) -> bool {
        self.root.join(document_id).is_dir()
    }

    /// Serialize `payload` to the canonical path for `kind` under `document_id`.
    ///
    /// The payload is rendered fully in memory and written in one operation, then
    /// replaces any prior artifact of the same kind. Repeated processing under a
    /// reused identifier therefore silently overwrites.
    pub fn write<T: Serialize>(
        &self,
        document_id: &str,
        kind: ArtifactKind,
        payload: &T,
    ) -> Result<(), StoreError> {
        let dir = self.ensure(document_id)?;
        let path = dir.join(kind.file_name(document_id));
        let body = serde_json::to_vec_pretty(payload)?;
        fs::write(&path, body)?;
        tracing::debug!(document_id, kind = ?kind, path = %path.display(), "Artifact written");
        Ok(())
    }

    /// Read the raw bytes of an artifact, or `None` when the document or the
    /// specific artifact kind is absent.
    ///
    /// Absence is a first-class outcome: retrieval and query callers must
    /// distinguish "never processed" from a genuine storage fault.
    pub fn read_bytes(
        &self,
        document_id: &str,
        kind: ArtifactKind,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.artifact_path(document_id, kind);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::Unavailable(err)),
        }
    }

    /// Read and deserialize an artifact as JSON, or `None` when absent.
    pub fn read_json(
        &self,
        document_id: &str,
        kind: ArtifactKind,
    ) -> Result<Option<Value>, StoreError> {
        match self.read_bytes(document_id, kind)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Enumerate every store entry carrying a readable enhanced artifact.
    ///
    /// Entries missing their enhanced artifact, or holding one that fails to
    /// parse, are skipped with a warning; a partial or corrupt entry must not
    /// abort enumeration of the rest.
    pub fn list(&self) -> Result<Vec<StoredDocument>, StoreError> {
        let mut documents = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let document_id = entry.file_name().to_string_lossy().into_owned();
            match self.read_json(&document_id, ArtifactKind::Enhanced) {
                Ok(Some(enhanced)) => documents.push(StoredDocument {
                    total_pages: enhanced
                        .get("total_pages")
                        .and_then(Value::as_u64)
                        .unwrap_or(0),
                    sub_documents: enhanced
                        .get("sub_documents")
                        .and_then(Value::as_array)
                        .map_or(0, Vec::len),
                    document_id,
                }),
                Ok(None) => {
                    tracing::debug!(%document_id, "Skipping entry without enhanced artifact");
                }
                Err(err) => {
                    tracing::warn!(%document_id, error = %err, "Skipping unreadable store entry");
                }
            }
        }
        documents.sort_by(|a, b| a.document_id.cmp(&b.document_id));
        Ok(documents)
    }

    fn artifact_path(&self, document_id: &str, kind: ArtifactKind) -> PathBuf {
        self.root.join(document_id).join(kind.file_name(document_id))
    }

    /// Root directory backing this store.
    pub fn root(&self) -> &Path {
        &self.root
    }
}
