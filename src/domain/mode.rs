// ============================================================
// Layer 3 — Decode Mode
// ============================================================
// The decoders run in one of two ways:
//
//   Train — teacher forcing: the ground-truth previous character
//           feeds each step, dropout is live
//   Infer — greedy autoregressive: each step is fed the argmax of
//           the previous step, ground truth is never read
//
// Replaces a bare `is_train: bool` so call sites read clearly.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodeMode {
    Train,
    Infer,
}

impl DecodeMode {
    pub fn is_train(self) -> bool {
        matches!(self, DecodeMode::Train)
    }
}
