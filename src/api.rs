//! HTTP surface for the docproc server.
//!
//! This module exposes a compact Axum router mirroring the pipeline lifecycle:
//!
//! - `POST /process` – Upload a PDF (multipart), run extraction, grouping, and
//!   indexing, and persist the resulting artifacts under a generated document id.
//! - `GET /results/{document_id}` – Return a stored artifact
//!   (`format=enhanced|index|full`) exactly as it was written.
//! - `POST /query` – Answer a natural-language question against a processed
//!   document, returning at most five matched elements plus the true match count.
//! - `GET /documents` – Enumerate every document with a readable enhanced record.
//! - `GET /health` – Report config identity for deployment health probes.
//! - `GET /` – Service metadata, endpoint catalog, and processing counters.
//!
//! Handlers stay thin: validation of the `format` parameter and multipart
//! decoding live here, everything else is delegated to the injected
//! [`DocumentApi`] implementation.

use crate::config::Config;
use crate::processing::{DocumentApi, ProcessingError, QueryError, UploadedFile};
use crate::store::{ArtifactKind, StoreError};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;

const DEFAULT_PAGE_RANGE: &str = "all";
const DEFAULT_DOCUMENT_TYPE: &str = "Clinical EHR";

// PDFs routinely exceed axum's 2 MiB default body limit.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Build the HTTP router exposing the document pipeline API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: DocumentApi + 'static,
{
    Router::new()
        .route("/", get(root::<S>))
        .route("/health", get(health_check))
        .route("/process", post(process_document::<S>))
        .route("/results/:document_id", get(get_results::<S>))
        .route("/query", post(query_document::<S>))
        .route("/documents", get(list_documents::<S>))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(service)
}

/// Service metadata and endpoint catalog for `GET /`.
async fn root<S>(State(service): State<Arc<S>>) -> Json<Value>
where
    S: DocumentApi,
{
    Json(json!({
        "service": "docproc",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "health": "/health",
            "process": "/process (POST with PDF file)",
            "query": "/query (POST with question)",
            "results": "/results/{document_id}",
            "documents": "/documents",
        },
        "metrics": service.metrics_snapshot(),
    }))
}

/// Health probe reporting the configured project and model identity.
///
/// Configuration is re-derived from the environment on each call so a broken
/// environment shows up as 503 instead of a stale cached OK.
async fn health_check() -> Result<Json<Value>, ApiError> {
    let config = Config::from_env().map_err(|err| {
        tracing::error!(error = %err, "Health check failed");
        ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            format!("Service unhealthy: {err}"),
        )
    })?;
    let timestamp = time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    Ok(Json(json!({
        "status": "healthy",
        "timestamp": timestamp,
        "project_id": config.project_id,
        "model": config.model_name,
    })))
}

/// Success response for `POST /process`.
#[derive(Serialize)]
struct ProcessResponse {
    status: &'static str,
    document_id: String,
    processing_stats: Value,
    sub_documents: usize,
    results_url: String,
    query_url: &'static str,
    message: &'static str,
}

/// Accept a multipart PDF upload and run it through the processing pipeline.
///
/// Multipart fields: `file` (required), `page_range` (default `"all"`), and
/// `document_type` (default `"Clinical EHR"`).
async fn process_document<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<ProcessResponse>, ApiError>
where
    S: DocumentApi,
{
    let mut upload: Option<UploadedFile> = None;
    let mut page_range = DEFAULT_PAGE_RANGE.to_string();
    let mut document_type = DEFAULT_DOCUMENT_TYPE.to_string();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::new(StatusCode::BAD_REQUEST, format!("Invalid upload: {err}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "Upload has no filename"))?;
                let bytes = field.bytes().await.map_err(|err| {
                    ApiError::new(StatusCode::BAD_REQUEST, format!("Invalid upload: {err}"))
                })?;
                upload = Some(UploadedFile {
                    filename,
                    bytes: bytes.to_vec(),
                });
            }
            Some("page_range") => {
                page_range = read_text_field(field).await?;
            }
            Some("document_type") => {
                document_type = read_text_field(field).await?;
            }
            _ => {}
        }
    }

    let upload =
        upload.ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "No file provided"))?;
    let outcome = service
        .process_document(upload, &page_range, &document_type)
        .await?;

    Ok(Json(ProcessResponse {
        status: "success",
        results_url: format!("/results/{}", outcome.document_id),
        query_url: "/query",
        message: "PDF processed successfully",
        document_id: outcome.document_id,
        processing_stats: outcome.processing_stats,
        sub_documents: outcome.sub_documents,
    }))
}

async fn read_text_field(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|err| ApiError::new(StatusCode::BAD_REQUEST, format!("Invalid field: {err}")))
}

/// Query parameters accepted by `GET /results/{document_id}`.
#[derive(Deserialize)]
struct ResultsParams {
    #[serde(default = "default_format")]
    format: String,
}

fn default_format() -> String {
    "enhanced".to_string()
}

/// Return a stored artifact exactly as it was persisted.
async fn get_results<S>(
    State(service): State<Arc<S>>,
    Path(document_id): Path<String>,
    Query(params): Query<ResultsParams>,
) -> Result<Response, ApiError>
where
    S: DocumentApi,
{
    let kind = ArtifactKind::from_format(&params.format).ok_or_else(|| {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            format!("Invalid format: {}", params.format),
        )
    })?;
    let bytes = service.read_artifact(&document_id, kind)?.ok_or_else(|| {
        ApiError::new(
            StatusCode::NOT_FOUND,
            format!("Document {document_id} not found for format {}", params.format),
        )
    })?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        bytes,
    )
        .into_response())
}

/// Request body for `POST /query`.
#[derive(Deserialize)]
struct QueryRequest {
    question: String,
    document_id: String,
}

/// Success response for `POST /query`.
#[derive(Serialize)]
struct QueryResponse {
    status: &'static str,
    document_id: String,
    question: String,
    answer: String,
    reasoning: String,
    matched_elements: Vec<Value>,
    total_matches: usize,
    filter_stats: Value,
}

/// Answer a natural-language question against a processed document.
async fn query_document<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError>
where
    S: DocumentApi,
{
    let result = service
        .query_document(&request.document_id, &request.question)
        .await?;

    Ok(Json(QueryResponse {
        status: "success",
        document_id: request.document_id,
        question: request.question,
        answer: result.answer,
        reasoning: result.reasoning,
        matched_elements: result.matched_elements,
        total_matches: result.total_matches,
        filter_stats: result.filter_stats,
    }))
}

/// One row of the `GET /documents` listing.
#[derive(Serialize)]
struct DocumentRow {
    document_id: String,
    total_pages: u64,
    sub_documents: usize,
    results_url: String,
}

/// Response body for `GET /documents`.
#[derive(Serialize)]
struct DocumentsResponse {
    status: &'static str,
    total_documents: usize,
    documents: Vec<DocumentRow>,
}

/// Enumerate every processed document with a readable enhanced artifact.
async fn list_documents<S>(
    State(service): State<Arc<S>>,
) -> Result<Json<DocumentsResponse>, ApiError>
where
    S: DocumentApi,
{
    let documents: Vec<DocumentRow> = service
        .list_documents()?
        .into_iter()
        .map(|entry| DocumentRow {
            results_url: format!("/results/{}", entry.document_id),
            document_id: entry.document_id,
            total_pages: entry.total_pages,
            sub_documents: entry.sub_documents,
        })
        .collect();

    Ok(Json(DocumentsResponse {
        status: "success",
        total_documents: documents.len(),
        documents,
    }))
}

/// API error carrying the status code and user-facing detail message.
///
/// Internal causes are logged but never leak filesystem paths into response
/// bodies.
struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

impl From<ProcessingError> for ApiError {
    fn from(error: ProcessingError) -> Self {
        match &error {
            ProcessingError::InvalidInput => Self::new(StatusCode::BAD_REQUEST, error.to_string()),
            _ => {
                tracing::error!(error = %error, "Processing failed");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Processing failed: {error}"),
                )
            }
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(error: QueryError) -> Self {
        match &error {
            QueryError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, error.to_string()),
            _ => {
                tracing::error!(error = %error, "Query failed");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Query failed: {error}"),
                )
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        tracing::error!(error = %error, "Store access failed");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Store access failed: {error}"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::create_router;
    use crate::metrics::MetricsSnapshot;
    use crate::processing::{
        DocumentApi, ProcessOutcome, ProcessingError, QueryError, QueryResult, UploadedFile,
    };
    use crate::store::{ArtifactKind, StoreError, StoredDocument};
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    #[derive(Clone, Debug)]
    struct ProcessCall {
        filename: String,
        page_range: String,
        document_type: String,
    }

    struct StubDocumentService {
        calls: Mutex<Vec<ProcessCall>>,
        enhanced_bytes: Option<Vec<u8>>,
        query_result: Option<QueryResult>,
        documents: Vec<StoredDocument>,
    }

    impl StubDocumentService {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                enhanced_bytes: None,
                query_result: None,
                documents: Vec::new(),
            }
        }

        fn recorded_calls(&self) -> Vec<ProcessCall> {
            self.calls.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl DocumentApi for StubDocumentService {
        async fn process_document(
            &self,
            upload: UploadedFile,
            page_range: &str,
            document_type: &str,
        ) -> Result<ProcessOutcome, ProcessingError> {
            if !upload.filename.to_ascii_lowercase().ends_with(".pdf") {
                return Err(ProcessingError::InvalidInput);
            }
            self.calls.lock().expect("lock").push(ProcessCall {
                filename: upload.filename,
                page_range: page_range.to_string(),
                document_type: document_type.to_string(),
            });
            Ok(ProcessOutcome {
                document_id: "chart_1700000000".to_string(),
                processing_stats: json!({"pages_processed": 3}),
                sub_documents: 2,
                total_pages: 3,
            })
        }

        async fn query_document(
            &self,
            document_id: &str,
            _question: &str,
        ) -> Result<QueryResult, QueryError> {
            self.query_result
                .clone()
                .ok_or_else(|| QueryError::NotFound(document_id.to_string()))
        }

        fn read_artifact(
            &self,
            _document_id: &str,
            kind: ArtifactKind,
        ) -> Result<Option<Vec<u8>>, StoreError> {
            if kind == ArtifactKind::Enhanced {
                Ok(self.enhanced_bytes.clone())
            } else {
                Ok(None)
            }
        }

        fn list_documents(&self) -> Result<Vec<StoredDocument>, StoreError> {
            Ok(self.documents.clone())
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                documents_processed: 0,
                pages_extracted: 0,
                queries_served: 0,
            }
        }
    }

    fn multipart_body(boundary: &str, filename: &str, extra_fields: &[(&str, &str)]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n%PDF-1.4 stub\r\n"
            )
            .as_bytes(),
        );
        for (name, value) in extra_fields {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        body
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn process_accepts_multipart_pdf_and_reports_summary() {
        let service = Arc::new(StubDocumentService::new());
        let app = create_router(service.clone());

        let boundary = "testboundary";
        let body = multipart_body(
            boundary,
            "chart.pdf",
            &[("page_range", "1-10"), ("document_type", "Radiology")],
        );
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/process")
                    .header(
                        "content-type",
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "success");
        assert_eq!(json["document_id"], "chart_1700000000");
        assert_eq!(json["sub_documents"], 2);
        assert_eq!(json["results_url"], "/results/chart_1700000000");
        assert_eq!(json["query_url"], "/query");

        let calls = service.recorded_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].filename, "chart.pdf");
        assert_eq!(calls[0].page_range, "1-10");
        assert_eq!(calls[0].document_type, "Radiology");
    }

    #[tokio::test]
    async fn process_defaults_page_range_and_document_type() {
        let service = Arc::new(StubDocumentService::new());
        let app = create_router(service.clone());

        let boundary = "testboundary";
        let body = multipart_body(boundary, "chart.pdf", &[]);
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/process")
                    .header(
                        "content-type",
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let calls = service.recorded_calls();
        assert_eq!(calls[0].page_range, "all");
        assert_eq!(calls[0].document_type, "Clinical EHR");
    }

    #[tokio::test]
    async fn process_rejects_non_pdf_with_400() {
        let service = Arc::new(StubDocumentService::new());
        let app = create_router(service.clone());

        let boundary = "testboundary";
        let body = multipart_body(boundary, "notes.txt", &[]);
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/process")
                    .header(
                        "content-type",
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["detail"], "File must be a PDF");
        assert!(service.recorded_calls().is_empty());
    }

    #[tokio::test]
    async fn results_returns_stored_bytes_verbatim() {
        let stored = serde_json::to_vec_pretty(&json!({"sub_documents": [{}, {}]})).expect("encode");
        let mut service = StubDocumentService::new();
        service.enhanced_bytes = Some(stored.clone());
        let app = create_router(Arc::new(service));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/results/chart_1700000000?format=enhanced")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get("content-type")
                .and_then(|value| value.to_str().ok()),
            Some("application/json")
        );
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        assert_eq!(bytes.as_ref(), stored.as_slice());
    }

    #[tokio::test]
    async fn results_on_unknown_document_is_404_not_500() {
        let app = create_router(Arc::new(StubDocumentService::new()));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/results/missing_0")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn results_with_unknown_format_is_400() {
        let app = create_router(Arc::new(StubDocumentService::new()));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/results/chart_1?format=summary")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["detail"], "Invalid format: summary");
    }

    #[tokio::test]
    async fn query_shapes_collaborator_result() {
        let mut service = StubDocumentService::new();
        service.query_result = Some(QueryResult {
            answer: "Metformin 500mg".to_string(),
            reasoning: "Found in medication list".to_string(),
            matched_elements: vec![json!({"rank": 0}), json!({"rank": 1})],
            total_matches: 12,
            filter_stats: json!({"candidates": 40}),
        });
        let app = create_router(Arc::new(service));

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/query")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        json!({"question": "What medications?", "document_id": "chart_1"})
                            .to_string(),
                    ))
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["document_id"], "chart_1");
        assert_eq!(json["question"], "What medications?");
        assert_eq!(json["answer"], "Metformin 500mg");
        assert_eq!(json["total_matches"], 12);
        assert_eq!(json["matched_elements"].as_array().expect("array").len(), 2);
    }

    #[tokio::test]
    async fn query_on_unprocessed_document_is_404() {
        let app = create_router(Arc::new(StubDocumentService::new()));
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/query")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        json!({"question": "anything", "document_id": "missing_0"}).to_string(),
                    ))
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(
            json["detail"],
            "Document missing_0 not found. Process a PDF first."
        );
    }

    #[tokio::test]
    async fn documents_listing_includes_results_urls() {
        let mut service = StubDocumentService::new();
        service.documents = vec![
            StoredDocument {
                document_id: "chart_1".to_string(),
                total_pages: 3,
                sub_documents: 2,
            },
            StoredDocument {
                document_id: "labs_2".to_string(),
                total_pages: 10,
                sub_documents: 4,
            },
        ];
        let app = create_router(Arc::new(service));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/documents")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["total_documents"], 2);
        assert_eq!(json["documents"][0]["document_id"], "chart_1");
        assert_eq!(json["documents"][0]["results_url"], "/results/chart_1");
        assert_eq!(json["documents"][1]["total_pages"], 10);
    }

    #[tokio::test]
    async fn root_lists_endpoints_and_counters() {
        let app = create_router(Arc::new(StubDocumentService::new()));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["service"], "docproc");
        assert_eq!(json["endpoints"]["process"], "/process (POST with PDF file)");
        assert_eq!(json["metrics"]["documents_processed"], 0);
    }
}
