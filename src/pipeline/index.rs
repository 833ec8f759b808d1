//! Deterministic hierarchical-index construction.

use crate::pipeline::types::{EnhancedDocumentRecord, HierarchicalIndex, IndexBuilder};
use serde_json::Value;

/// Builds the navigation index locally from an enhanced record.
///
/// The index is a pure derivation: one section per sub-document grouping, in
/// grouping order, carrying the title the grouper produced (when any), the
/// grouping confidence, and the element count. Callers navigate with it instead
/// of re-reading the full enhanced record.
pub struct HierarchicalIndexBuilder;

impl HierarchicalIndexBuilder {
    /// Construct a new index builder instance.
    pub const fn new() -> Self {
        Self
    }
}

impl Default for HierarchicalIndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexBuilder for HierarchicalIndexBuilder {
    fn build(&self, document_id: &str, document: &EnhancedDocumentRecord) -> HierarchicalIndex {
        let sections = document
            .sub_documents
            .iter()
            .enumerate()
            .map(|(position, group)| crate::pipeline::types::IndexSection {
                position,
                title: group
                    .extra
                    .get("title")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                confidence: group.confidence,
                element_count: group.elements.len(),
            })
            .collect();

        HierarchicalIndex {
            document_id: document_id.to_string(),
            total_pages: document.total_pages,
            sections,
        }
    }
}
