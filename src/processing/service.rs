//! Document service coordinating extraction, grouping, indexing, persistence,
//! and query dispatch.

use crate::{
    config::get_config,
    identifier,
    metrics::{MetricsSnapshot, ServiceMetrics},
    pipeline::{
        ExtractionPipeline, GroupingPipeline, HierarchicalIndexBuilder, IndexBuilder,
        PipelineClient, QueryPipeline,
        types::{DocumentContext, EnhancedDocumentRecord},
    },
    processing::types::{
        InitError, MAX_MATCHED_ELEMENTS, ProcessOutcome, ProcessingError, QueryError, QueryResult,
        UploadedFile,
    },
    store::{ArtifactKind, ArtifactStore, StoreError, StoredDocument},
};
use async_trait::async_trait;
use std::io::Write as _;
use std::sync::Arc;

/// Coordinates one processing job through its stages: stage the upload, extract,
/// group, index, persist, summarize. A terminal failure at any stage fails the
/// whole request, and the staged temporary input is removed on every exit path.
///
/// The service owns long-lived handles to the artifact store and the collaborator
/// adapters so every surface shares the same components. Construct it once near
/// process start and share it through an `Arc`; there is no lazy initialization
/// to race on.
pub struct DocumentService {
    store: ArtifactStore,
    extractor: Arc<dyn ExtractionPipeline>,
    grouper: Arc<dyn GroupingPipeline>,
    indexer: Arc<dyn IndexBuilder>,
    query_agent: Arc<dyn QueryPipeline>,
    confidence_threshold: f64,
    metrics: ServiceMetrics,
}

/// Abstraction over the document service used by transport surfaces.
#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// Run an uploaded PDF through the full processing pipeline.
    async fn process_document(
        &self,
        upload: UploadedFile,
        page_range: &str,
        document_type: &str,
    ) -> Result<ProcessOutcome, ProcessingError>;

    /// Answer a natural-language question against a processed document.
    async fn query_document(
        &self,
        document_id: &str,
        question: &str,
    ) -> Result<QueryResult, QueryError>;

    /// Read a stored artifact's raw bytes, `None` when absent.
    fn read_artifact(
        &self,
        document_id: &str,
        kind: ArtifactKind,
    ) -> Result<Option<Vec<u8>>, StoreError>;

    /// Enumerate every document with a readable enhanced artifact.
    fn list_documents(&self) -> Result<Vec<StoredDocument>, StoreError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl DocumentService {
    /// Build the service from environment configuration, wiring the remote
    /// pipeline adapters and the local index builder.
    pub fn new() -> Result<Self, InitError> {
        let config = get_config();
        let store = ArtifactStore::open(config.output_dir.clone())?;
        let client = Arc::new(PipelineClient::new()?);
        tracing::info!(store_root = %store.root().display(), "Document service initialized");
        Ok(Self::from_parts(
            store,
            client.clone(),
            client.clone(),
            Arc::new(HierarchicalIndexBuilder::new()),
            client,
            config.confidence_threshold,
        ))
    }

    /// Assemble a service from explicit parts. Surfaces and tests inject stub
    /// collaborators through this constructor.
    pub fn from_parts(
        store: ArtifactStore,
        extractor: Arc<dyn ExtractionPipeline>,
        grouper: Arc<dyn GroupingPipeline>,
        indexer: Arc<dyn IndexBuilder>,
        query_agent: Arc<dyn QueryPipeline>,
        confidence_threshold: f64,
    ) -> Self {
        Self {
            store,
            extractor,
            grouper,
            indexer,
            query_agent,
            confidence_threshold,
            metrics: ServiceMetrics::new(),
        }
    }

    /// Run one processing job end to end.
    pub async fn process_document(
        &self,
        upload: UploadedFile,
        page_range: &str,
        document_type: &str,
    ) -> Result<ProcessOutcome, ProcessingError> {
        tracing::info!(filename = %upload.filename, page_range, "Received PDF");
        if !upload.filename.to_ascii_lowercase().ends_with(".pdf") {
            return Err(ProcessingError::InvalidInput);
        }

        // Staged input lives only as long as this guard; dropping it removes the
        // file on every exit path, including collaborator failure.
        let mut staged = tempfile::Builder::new()
            .prefix("docproc-upload-")
            .suffix(".pdf")
            .tempfile()?;
        staged.write_all(&upload.bytes)?;
        staged.flush()?;
        tracing::debug!(path = %staged.path().display(), "Staged uploaded PDF");

        let now = time::OffsetDateTime::now_utc().unix_timestamp();
        let document_id = allocate_identifier(&self.store, &upload.filename, now);
        self.store.ensure(&document_id)?;
        tracing::info!(%document_id, "Starting processing");

        let context = DocumentContext {
            document_type: document_type.to_string(),
        };
        let raw = self
            .extractor
            .process(staged.path(), page_range, &context)
            .await
            .map_err(ProcessingError::Extraction)?;
        tracing::debug!(%document_id, total_pages = raw.total_pages, "Extraction complete");

        let enhanced = self
            .grouper
            .group(&raw, self.confidence_threshold)
            .await
            .map_err(ProcessingError::Grouping)?;
        tracing::debug!(
            %document_id,
            sub_documents = enhanced.sub_documents.len(),
            "Grouping complete"
        );

        let index = self.indexer.build(&document_id, &enhanced);

        self.store
            .write(&document_id, ArtifactKind::Enhanced, &enhanced)?;
        self.store.write(&document_id, ArtifactKind::Index, &index)?;
        self.store.write(&document_id, ArtifactKind::Full, &raw)?;

        self.metrics.record_document(raw.total_pages);
        tracing::info!(%document_id, "Processing complete");

        Ok(ProcessOutcome {
            document_id,
            processing_stats: raw.processing_stats,
            sub_documents: enhanced.sub_documents.len(),
            total_pages: raw.total_pages,
        })
    }

    /// Dispatch a question against a previously processed document.
    pub async fn query_document(
        &self,
        document_id: &str,
        question: &str,
    ) -> Result<QueryResult, QueryError> {
        tracing::info!(document_id, question, "Query received");
        let bytes = self
            .store
            .read_bytes(document_id, ArtifactKind::Enhanced)?
            .ok_or_else(|| QueryError::NotFound(document_id.to_string()))?;
        let record: EnhancedDocumentRecord =
            serde_json::from_slice(&bytes).map_err(StoreError::from)?;

        let outcome = self
            .query_agent
            .query(&record, question)
            .await
            .map_err(QueryError::Collaborator)?;

        let total_matches = outcome.matched_elements.len();
        let matched_elements = outcome
            .matched_elements
            .into_iter()
            .take(MAX_MATCHED_ELEMENTS)
            .collect();
        tracing::info!(document_id, total_matches, "Query answered");
        self.metrics.record_query();

        Ok(QueryResult {
            answer: outcome.answer_summary,
            reasoning: outcome.reasoning,
            matched_elements,
            total_matches,
            filter_stats: outcome.filter_stats,
        })
    }
}

/// Pick an identifier whose store directory does not exist yet.
///
/// Two uploads of the same filename within the same second collide on the
/// derived identifier; a counter suffix disambiguates instead of silently
/// overwriting the earlier run. Two requests racing on the same fresh candidate
/// remain last-writer-wins (documented on the store).
fn allocate_identifier(store: &ArtifactStore, filename: &str, now: i64) -> String {
    let base = identifier::generate(filename, now);
    if !store.entry_exists(&base) {
        return base;
    }
    let mut attempt = 2;
    loop {
        let candidate = format!("{base}_{attempt}");
        if !store.entry_exists(&candidate) {
            tracing::warn!(%base, %candidate, "Identifier collision; suffixing");
            return candidate;
        }
        attempt += 1;
    }
}

#[async_trait]
impl DocumentApi for DocumentService {
    async fn process_document(
        &self,
        upload: UploadedFile,
        page_range: &str,
        document_type: &str,
    ) -> Result<ProcessOutcome, ProcessingError> {
        DocumentService::process_document(self, upload, page_range, document_type).await
    }

    async fn query_document(
        &self,
        document_id: &str,
        question: &str,
    ) -> Result<QueryResult, QueryError> {
        DocumentService::query_document(self, document_id, question).await
    }

    fn read_artifact(
        &self,
        document_id: &str,
        kind: ArtifactKind,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        self.store.read_bytes(document_id, kind)
    }

    fn list_documents(&self) -> Result<Vec<StoredDocument>, StoreError> {
        self.store.list()
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
