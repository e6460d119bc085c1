// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that define what the system talks about:
// decode modes, labels, requests and results.
//
// Rules for this layer:
//   - NO burn types
//   - NO file I/O
//   - Only structs, enums, and traits
//
// Everything here is testable without a backend.

/// Training vs. inference decoding
pub mod mode;

/// Text ↔ class-index conversion with [GO] / [s] tokens
pub mod label_converter;

/// Per-run request (mode, batch, feature source, labels)
pub mod request;

/// Decoded text and confidence
pub mod recognition;

/// Core abstractions (traits) that other layers implement
pub mod traits;
