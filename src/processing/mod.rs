//! Job orchestration and query dispatch for processed documents.

mod service;
pub mod types;

pub use service::{DocumentApi, DocumentService};
pub use types::{
    InitError, MAX_MATCHED_ELEMENTS, ProcessOutcome, ProcessingError, QueryError, QueryResult,
    UploadedFile,
};
