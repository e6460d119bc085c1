// ============================================================
// Layer 3 — Recognition Request
// ============================================================
// Everything a caller decides per run, independent of how the
// decoder was configured. The encoder that would normally feed
// the decoder lives outside this crate, so features come from a
// synthetic source.

use serde::{Deserialize, Serialize};

use crate::domain::mode::DecodeMode;

/// Where the encoder-output stand-in comes from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FeatureSource {
    /// All-zero features
    Zeros,
    /// Uniform noise in [-1, 1) from a seeded generator
    Noise { seed: u64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizeRequest {
    pub mode:          DecodeMode,
    pub batch_size:    usize,
    /// Length of the encoder-output sequence
    pub encoder_steps: usize,
    pub features:      FeatureSource,
    /// Ground-truth labels, one per batch row; read in training mode only
    pub labels:        Vec<String>,
    /// Pass scene/overlap embeddings even if the decoder does not need them
    pub side_context:  bool,
}

impl RecognizeRequest {
    pub fn infer(batch_size: usize, encoder_steps: usize, features: FeatureSource) -> Self {
        Self {
            mode: DecodeMode::Infer,
            batch_size,
            encoder_steps,
            features,
            labels: Vec::new(),
            side_context: false,
        }
    }

    pub fn train(labels: Vec<String>, encoder_steps: usize, features: FeatureSource) -> Self {
        Self {
            mode: DecodeMode::Train,
            batch_size: labels.len(),
            encoder_steps,
            features,
            labels,
            side_context: false,
        }
    }
}
