//! HTTP adapters for the remote pipeline service.
//!
//! The extraction, grouping, and query algorithms run in a separate service
//! addressed by `PIPELINE_URL`. One [`PipelineClient`] backs all three adapter
//! traits; the staged PDF cannot be shared by path across process boundaries, so
//! the extraction adapter reads it and ships the bytes base64-encoded in the
//! JSON body.

use crate::config::get_config;
use crate::pipeline::types::{
    CollaboratorError, DocumentContext, EnhancedDocumentRecord, ExtractionPipeline,
    GroupingPipeline, QueryOutcome, QueryPipeline, RawDocumentRecord,
};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::path::Path;
use std::time::Duration;

/// Reqwest-backed client for the extraction/grouping/query collaborators.
pub struct PipelineClient {
    client: Client,
    base_url: String,
}

impl PipelineClient {
    /// Construct a client using configuration derived from the environment.
    pub fn new() -> Result<Self, CollaboratorError> {
        let config = get_config();
        Self::with_base_url(
            &config.pipeline_url,
            Duration::from_secs(config.collaborator_timeout_secs),
        )
    }

    /// Construct a client against an explicit base URL with a per-call deadline.
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, CollaboratorError> {
        let client = Client::builder()
            .user_agent("docproc/1.0")
            .timeout(timeout)
            .build()?;
        let base_url = normalize_base_url(base_url).map_err(CollaboratorError::InvalidUrl)?;
        tracing::debug!(url = %base_url, timeout_secs = timeout.as_secs(), "Initialized pipeline HTTP client");
        Ok(Self { client, base_url })
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<T, CollaboratorError> {
        let url = format_endpoint(&self.base_url, path);
        let response = self.client.post(&url).json(body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = CollaboratorError::UnexpectedStatus { status, body };
            tracing::error!(path, error = %error, "Pipeline call failed");
            return Err(error);
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ExtractionPipeline for PipelineClient {
    async fn process(
        &self,
        input_path: &Path,
        page_range: &str,
        context: &DocumentContext,
    ) -> Result<RawDocumentRecord, CollaboratorError> {
        let bytes = tokio::fs::read(input_path).await?;
        tracing::debug!(
            input = %input_path.display(),
            size = bytes.len(),
            page_range,
            "Submitting document for extraction"
        );
        let body = json!({
            "pdf_base64": BASE64.encode(&bytes),
            "page_range": page_range,
            "document_context": context,
        });
        self.post_json("extract", &body).await
    }
}

#[async_trait]
impl GroupingPipeline for PipelineClient {
    async fn group(
        &self,
        document: &RawDocumentRecord,
        confidence_threshold: f64,
    ) -> Result<EnhancedDocumentRecord, CollaboratorError> {
        let body = json!({
            "document": document,
            "confidence_threshold": confidence_threshold,
        });
        self.post_json("group", &body).await
    }
}

#[async_trait]
impl QueryPipeline for PipelineClient {
    async fn query(
        &self,
        document: &EnhancedDocumentRecord,
        question: &str,
    ) -> Result<QueryOutcome, CollaboratorError> {
        let body = json!({
            "document": document,
            "question": question,
        });
        self.post_json("query", &body).await
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}
