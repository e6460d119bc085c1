// ============================================================
// Layer 5 — Decoder Seam
// ============================================================
// All prediction heads share one calling convention:
//
//   encoder output [batch, T, C]
//   + optional target indices [batch, >= max_length + 1]
//   + optional side context (scene / overlap embeddings)
//   + decode mode
//   → class scores [batch, steps, num_classes]
//
// Validation of the common inputs lives here so each decoder
// only checks what is specific to it.

use burn::prelude::*;

use crate::domain::mode::DecodeMode;
use crate::ml::error::{DecodeError, DecodeResult};

/// Auxiliary per-image embeddings, one row per batch element.
#[derive(Debug, Clone)]
pub struct SideContext<B: Backend> {
    /// Global scene summary: [batch, scene_dim]
    pub scene:   Tensor<B, 2>,
    /// Overlapping-object summary: [batch, overlap_dim]
    pub overlap: Tensor<B, 2>,
}

#[derive(Debug, Clone)]
pub struct DecoderInput<B: Backend> {
    pub encoder_output: Tensor<B, 3>,
    /// Read in training mode only
    pub text:           Option<Tensor<B, 2, Int>>,
    pub side:           Option<SideContext<B>>,
    pub mode:           DecodeMode,
}

impl<B: Backend> DecoderInput<B> {
    pub fn infer(encoder_output: Tensor<B, 3>) -> Self {
        Self { encoder_output, text: None, side: None, mode: DecodeMode::Infer }
    }

    pub fn train(encoder_output: Tensor<B, 3>, text: Tensor<B, 2, Int>) -> Self {
        Self { encoder_output, text: Some(text), side: None, mode: DecodeMode::Train }
    }

    pub fn with_side(mut self, side: SideContext<B>) -> Self {
        self.side = Some(side);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.encoder_output.dims()[0]
    }

    /// Ground-truth targets for training, checked against `num_steps`
    /// columns and the `0..num_classes` index range.
    pub fn targets(&self, num_steps: usize, num_classes: usize) -> DecodeResult<Tensor<B, 2, Int>> {
        let text = self.text.clone().ok_or(DecodeError::MissingTargets)?;
        let [rows, cols] = text.dims();

        if rows != self.batch_size() {
            return Err(DecodeError::BatchMismatch {
                input:    "target indices",
                expected: self.batch_size(),
                actual:   rows,
            });
        }
        if cols < num_steps {
            return Err(DecodeError::TargetWidth { expected: num_steps, actual: cols });
        }

        let indices: Vec<i64> = text
            .clone()
            .into_data()
            .convert::<i64>()
            .to_vec()
            .map_err(|e| DecodeError::Readout(format!("{e:?}")))?;
        if let Some(&index) = indices.iter().find(|&&i| i < 0 || i as usize >= num_classes) {
            return Err(DecodeError::TargetIndex { index, num_classes });
        }
        Ok(text)
    }

    pub fn check_channels(&self, expected: usize) -> DecodeResult<()> {
        let [_, _, channels] = self.encoder_output.dims();
        if channels != expected {
            return Err(DecodeError::EncoderChannels { expected, actual: channels });
        }
        Ok(())
    }
}

/// A prediction head that turns encoder features into class scores.
pub trait SequenceDecoder<B: Backend> {
    /// Length of the score sequence emitted for `encoder_steps` input positions
    fn output_steps(&self, encoder_steps: usize) -> usize;

    fn decode(&self, input: DecoderInput<B>) -> DecodeResult<Tensor<B, 3>>;
}
