// src/core/mod.rs

/// Normalization and validation of untrusted domain input.
pub mod domain;

/// Error taxonomy: caller-facing `ScanError` and per-adapter `LookupError`.
pub mod errors;

/// Data structures shared across the core, such as `ScanResult`,
/// `SslInfo`, `WhoisInfo` and the batch records.
pub mod models;

/// The adapter seams, the concrete DNS/TLS/RDAP adapters, and the
/// orchestrator that fans out to them.
pub mod scanner;

/// Bounded-concurrency runner over many inputs.
pub mod batch;
