//! Outcome types and error taxonomy for the processing core.

use crate::pipeline::CollaboratorError;
use crate::store::StoreError;
use serde_json::Value;
use thiserror::Error;

/// Maximum number of matched elements returned to query callers. The true
/// match count is always reported alongside.
pub const MAX_MATCHED_ELEMENTS: usize = 5;

/// Uploaded file handed to the orchestrator by a transport surface.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-supplied filename, used to derive the document identifier.
    pub filename: String,
    /// Raw upload bytes.
    pub bytes: Vec<u8>,
}

/// Summary of a completed processing job.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    /// Identifier under which the artifacts were persisted.
    pub document_id: String,
    /// Pipeline statistics passed through verbatim from the raw record.
    pub processing_stats: Value,
    /// Number of sub-document groupings in the enhanced record.
    pub sub_documents: usize,
    /// Number of pages the pipeline extracted.
    pub total_pages: u64,
}

/// Shaped result of a natural-language query against a processed document.
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// Natural-language answer summary, verbatim from the collaborator.
    pub answer: String,
    /// Reasoning trace, verbatim from the collaborator.
    pub reasoning: String,
    /// Matched elements truncated to [`MAX_MATCHED_ELEMENTS`], in the
    /// collaborator's own ranking order.
    pub matched_elements: Vec<Value>,
    /// True match count before truncation.
    pub total_matches: usize,
    /// Collaborator-defined filtering statistics, verbatim.
    pub filter_stats: Value,
}

/// Errors emitted by the processing orchestrator.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// Upload was rejected before any state was created.
    #[error("File must be a PDF")]
    InvalidInput,
    /// The upload bytes could not be staged to a temporary file.
    #[error("Failed to stage uploaded file: {0}")]
    Staging(#[from] std::io::Error),
    /// The extraction collaborator failed.
    #[error("Extraction failed: {0}")]
    Extraction(#[source] CollaboratorError),
    /// The grouping collaborator failed.
    #[error("Sub-document grouping failed: {0}")]
    Grouping(#[source] CollaboratorError),
    /// Artifacts could not be persisted.
    #[error("Failed to persist artifacts: {0}")]
    Store(#[from] StoreError),
}

/// Errors emitted by the query dispatcher.
#[derive(Debug, Error)]
pub enum QueryError {
    /// No enhanced record exists for the requested identifier.
    #[error("Document {0} not found. Process a PDF first.")]
    NotFound(String),
    /// The stored enhanced record could not be loaded.
    #[error("Failed to load enhanced record: {0}")]
    Store(#[from] StoreError),
    /// The query collaborator failed; the underlying cause is attached.
    #[error("Query failed: {0}")]
    Collaborator(#[source] CollaboratorError),
}

/// Errors raised while constructing the document service at process start.
#[derive(Debug, Error)]
pub enum InitError {
    /// The artifact store root could not be opened.
    #[error("Failed to open artifact store: {0}")]
    Store(#[from] StoreError),
    /// The pipeline HTTP client could not be constructed.
    #[error("Failed to initialize pipeline client: {0}")]
    Pipeline(#[from] CollaboratorError),
}
