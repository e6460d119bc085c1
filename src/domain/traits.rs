// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer programs against these, so the CLI
// does not care which backend or which prediction head sits
// behind a recognizer.

use anyhow::Result;

use crate::domain::recognition::Recognition;
use crate::domain::request::RecognizeRequest;

// ─── TextRecognizer ───────────────────────────────────────────────────────────
/// Anything that turns a request into one recognition per batch row.
///
/// Implementations:
///   - RecognizeUseCase → runs a burn decoder on synthetic features
pub trait TextRecognizer {
    fn recognize(&self, request: &RecognizeRequest) -> Result<Vec<Recognition>>;
}

// ─── Persistable ──────────────────────────────────────────────────────────────
/// Any component whose state can be saved and restored from disk.
///
/// Implementations:
///   - DecodeSettings → JSON settings file
pub trait Persistable: Sized {
    /// Save this component's state to the given path
    fn save(&self, path: &str) -> Result<()>;

    /// Load a component's state from the given path.
    fn load(path: &str) -> Result<Self>;
}
