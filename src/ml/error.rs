// ============================================================
// Layer 5 — Decoder Errors
// ============================================================
// Every decoder validates its inputs before touching a tensor
// op, so a malformed call fails with one of these variants
// instead of a backend shape panic halfway through the loop.
//
// None of these are retryable: the caller has to fix the input.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Training mode needs the ground-truth index sequence
    #[error("training mode requires target indices, none were given")]
    MissingTargets,

    /// Target tensor is narrower than the number of decode steps
    #[error("target indices have {actual} columns, at least {expected} are required")]
    TargetWidth { expected: usize, actual: usize },

    /// A target index has no class behind it
    #[error("target index {index} is outside 0..{num_classes}")]
    TargetIndex { index: i64, num_classes: usize },

    /// Two inputs disagree on the batch dimension
    #[error("batch mismatch: encoder output has {expected} rows, {input} has {actual}")]
    BatchMismatch {
        input:    &'static str,
        expected: usize,
        actual:   usize,
    },

    /// Encoder feature width differs from the decoder's input projection
    #[error("encoder output has {actual} channels, decoder expects {expected}")]
    EncoderChannels { expected: usize, actual: usize },

    /// A side-context vector has the wrong dimensionality
    #[error("side context '{name}' has dimension {actual}, expected {expected}")]
    SideContextDim {
        name:     &'static str,
        expected: usize,
        actual:   usize,
    },

    /// The decoder was configured to consume side context but got none
    #[error("decoder is configured to consume side context, none was given")]
    MissingSideContext,

    /// Sequence is longer than the positional table
    #[error("sequence of length {len} exceeds the positional table ({max} positions)")]
    SequenceTooLong { len: usize, max: usize },

    /// Configuration cannot produce a working module
    #[error("invalid decoder configuration: {0}")]
    InvalidConfig(String),

    /// Scores could not be copied back from the device
    #[error("failed to read decoder scores: {0}")]
    Readout(String),

    /// Prediction head that exists only as a placeholder
    #[error("{0} is not implemented")]
    Unimplemented(&'static str),
}

pub type DecodeResult<T> = std::result::Result<T, DecodeError>;
