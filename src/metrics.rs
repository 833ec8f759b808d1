use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing processing and query activity.
#[derive(Default)]
pub struct ServiceMetrics {
    documents_processed: AtomicU64,
    pages_extracted: AtomicU64,
    queries_served: AtomicU64,
}

impl ServiceMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed processing job and the number of pages it extracted.
    pub fn record_document(&self, page_count: u64) {
        self.documents_processed.fetch_add(1, Ordering::Relaxed);
        self.pages_extracted.fetch_add(page_count, Ordering::Relaxed);
    }

    /// Record a served query.
    pub fn record_query(&self) {
        self.queries_served.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_processed: self.documents_processed.load(Ordering::Relaxed),
            pages_extracted: self.pages_extracted.load(Ordering::Relaxed),
            queries_served: self.queries_served.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of service counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of documents processed since startup.
    pub documents_processed: u64,
    /// Total pages extracted across all processed documents.
    pub pages_extracted: u64,
    /// Number of queries answered since startup.
    pub queries_served: u64,
}
