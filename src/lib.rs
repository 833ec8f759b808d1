#![deny(missing_docs)]

//! Core library for the docproc server.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Document identifier derivation.
pub mod identifier;
/// Structured logging and tracing setup.
pub mod logging;
/// Processing and query counters.
pub mod metrics;
/// External pipeline collaborator interfaces and adapters.
pub mod pipeline;
/// Job orchestration and query dispatch.
pub mod processing;
/// Filesystem-backed artifact storage.
pub mod store;
