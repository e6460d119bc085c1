// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns that don't belong in a business layer:
//
//   settings_store.rs — DecodeSettings persistence
//                       Saves the decoder architecture and
//                       character set as JSON, and loads it
//                       back so a run can rebuild the same
//                       decoder.
//
// Kept apart from the application layer so the storage format
// can change without touching the workflow.

/// JSON save/load for DecodeSettings
pub mod settings_store;
