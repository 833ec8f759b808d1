//! Document identifier derivation.
//!
//! An identifier is `{filename-stem}_{unix-seconds}`. Two uploads of the same
//! filename within the same second produce the same candidate; the orchestrator
//! disambiguates by probing the store and suffixing a counter before any artifact
//! is written.

use std::path::Path;

/// Derive a document identifier from an uploaded filename and a capture time.
///
/// Strips any leading path components and the final extension, keeping only the
/// stem. Pure function of its inputs; degenerate filenames (empty, dot-only)
/// yield a degenerate but valid stem.
pub fn generate(filename: &str, unix_seconds: i64) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("document");
    format!("{stem}_{unix_seconds}")
}
