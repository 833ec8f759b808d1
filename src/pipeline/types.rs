//! Record shapes exchanged with the external pipeline collaborators.
//!
//! The orchestrator only depends on a handful of fields (`total_pages`,
//! `processing_stats`, `sub_documents`); everything else the pipeline produces is
//! carried opaquely through flattened maps so records round-trip untouched.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use thiserror::Error;

/// Errors raised while calling an external collaborator.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// Transport-level failure before a response was received.
    #[error("Pipeline request failed: {0}")]
    Http(reqwest::Error),
    /// The collaborator call exceeded its configured deadline.
    #[error("Pipeline call timed out")]
    Timeout,
    /// The collaborator answered with a non-success status.
    #[error("Unexpected pipeline response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the pipeline service.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// The staged input could not be read for transmission.
    #[error("Failed to read staged input: {0}")]
    Input(#[from] std::io::Error),
    /// Base URL failed to parse or normalize.
    #[error("Invalid pipeline URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for CollaboratorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }
}

/// Context handed to the extraction pipeline alongside the staged input.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentContext {
    /// Free-form document classification, e.g. `"Clinical EHR"`.
    pub document_type: String,
}

/// Extraction output: ordered page/element data plus pipeline statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDocumentRecord {
    /// Number of pages the pipeline extracted.
    #[serde(default)]
    pub total_pages: u64,
    /// Pipeline-defined statistics, passed through verbatim to callers.
    #[serde(default)]
    pub processing_stats: Value,
    /// Remaining pipeline-defined fields (pages, elements, provenance).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One logical sub-document grouping within an enhanced record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubDocument {
    /// References into the raw record's element sequence.
    #[serde(default)]
    pub elements: Vec<Value>,
    /// Grouping confidence reported by the collaborator.
    #[serde(default)]
    pub confidence: f64,
    /// Grouper-defined fields (title, category, page span).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Raw record enriched with ordered sub-document groupings. Immutable once
/// written to the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancedDocumentRecord {
    /// Number of pages carried over from the raw record.
    #[serde(default)]
    pub total_pages: u64,
    /// Statistics carried over from the raw record.
    #[serde(default)]
    pub processing_stats: Value,
    /// Ordered sub-document groupings.
    #[serde(default)]
    pub sub_documents: Vec<SubDocument>,
    /// Remaining fields carried over opaquely.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Derived navigation tree over an enhanced record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchicalIndex {
    /// Identifier of the indexed document.
    pub document_id: String,
    /// Page count of the indexed document.
    pub total_pages: u64,
    /// One section per sub-document grouping, in grouping order.
    pub sections: Vec<IndexSection>,
}

/// Single entry of a [`HierarchicalIndex`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSection {
    /// Position of the grouping within the enhanced record.
    pub position: usize,
    /// Section title when the grouper produced one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Grouping confidence.
    pub confidence: f64,
    /// Number of element references in the grouping.
    pub element_count: usize,
}

/// Ranked answer produced by the query collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOutcome {
    /// Natural-language answer summary.
    #[serde(default)]
    pub answer_summary: String,
    /// Reasoning trace behind the answer.
    #[serde(default)]
    pub reasoning: String,
    /// Matched elements in the collaborator's own ranking order.
    #[serde(default)]
    pub matched_elements: Vec<Value>,
    /// Collaborator-defined filtering statistics, passed through verbatim.
    #[serde(default)]
    pub filter_stats: Value,
}

/// Interface to the external page-level extraction pipeline.
#[async_trait]
pub trait ExtractionPipeline: Send + Sync {
    /// Extract structured page/element data from the staged PDF.
    async fn process(
        &self,
        input_path: &Path,
        page_range: &str,
        context: &DocumentContext,
    ) -> Result<RawDocumentRecord, CollaboratorError>;
}

/// Interface to the external sub-document grouping algorithm.
#[async_trait]
pub trait GroupingPipeline: Send + Sync {
    /// Cluster the raw record's elements into logical sub-documents.
    async fn group(
        &self,
        document: &RawDocumentRecord,
        confidence_threshold: f64,
    ) -> Result<EnhancedDocumentRecord, CollaboratorError>;
}

/// Interface to the hierarchical index construction algorithm.
pub trait IndexBuilder: Send + Sync {
    /// Derive a navigation index over an enhanced record.
    fn build(&self, document_id: &str, document: &EnhancedDocumentRecord) -> HierarchicalIndex;
}

/// Interface to the hybrid query/matching agent.
#[async_trait]
pub trait QueryPipeline: Send + Sync {
    /// Rank the enhanced record's elements against a natural-language question.
    async fn query(
        &self,
        document: &EnhancedDocumentRecord,
        question: &str,
    ) -> Result<QueryOutcome, CollaboratorError>;
}
