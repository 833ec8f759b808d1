//! Collaborator interfaces for the external extraction, grouping, index, and
//! query algorithms, plus the reqwest adapters that reach the remote pipeline
//! service.

pub mod index;
pub mod remote;
pub mod types;

pub use index::HierarchicalIndexBuilder;
pub use remote::PipelineClient;
pub use types::{
    CollaboratorError, DocumentContext, EnhancedDocumentRecord, ExtractionPipeline,
    GroupingPipeline, HierarchicalIndex, IndexBuilder, QueryOutcome, QueryPipeline,
    RawDocumentRecord, SubDocument,
};
