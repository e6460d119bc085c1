// ============================================================
// Layer 5 — Prediction Head Selection
// ============================================================
// A recognizer carries exactly one prediction head. `Predictor`
// owns whichever was built and forwards the shared decoder seam;
// `read_out` turns its scores into per-step greedy choices for
// the domain layer.
//
// The transformer-encoder head is a placeholder: its config can
// be written down but `init` always refuses.

use std::convert::Infallible;

use burn::{prelude::*, tensor::activation::softmax};
use serde::{Deserialize, Serialize};

use crate::domain::recognition::StepChoice;
use crate::ml::attention_decoder::AttentionDecoder;
use crate::ml::decoder::{DecoderInput, SequenceDecoder};
use crate::ml::error::{DecodeError, DecodeResult};
use crate::ml::linear_decoder::LinearDecoder;
use crate::ml::tf_decoder::TransformerCharDecoder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PredictionKind {
    /// Recurrent attention decoder
    Attn,
    /// Transformer decoder
    Transformer,
    /// Position-wise linear classifier
    Linear,
    /// Transformer-encoder head (not implemented)
    TransformerEncoder,
}

#[derive(Debug)]
pub enum Predictor<B: Backend> {
    Attention(AttentionDecoder<B>),
    Transformer(TransformerCharDecoder<B>),
    Linear(LinearDecoder<B>),
}

impl<B: Backend> Predictor<B> {
    pub fn kind(&self) -> PredictionKind {
        match self {
            Predictor::Attention(_)   => PredictionKind::Attn,
            Predictor::Transformer(_) => PredictionKind::Transformer,
            Predictor::Linear(_)      => PredictionKind::Linear,
        }
    }

    /// Whether `decode` fails without scene/overlap embeddings.
    pub fn consumes_side_context(&self) -> bool {
        match self {
            Predictor::Attention(d)   => d.consumes_side_context(),
            Predictor::Transformer(d) => d.decoder.uses_side_context(),
            Predictor::Linear(_)      => false,
        }
    }
}

impl<B: Backend> SequenceDecoder<B> for Predictor<B> {
    fn output_steps(&self, encoder_steps: usize) -> usize {
        match self {
            Predictor::Attention(d)   => d.output_steps(encoder_steps),
            Predictor::Transformer(d) => d.output_steps(encoder_steps),
            Predictor::Linear(d)      => d.output_steps(encoder_steps),
        }
    }

    fn decode(&self, input: DecoderInput<B>) -> DecodeResult<Tensor<B, 3>> {
        match self {
            Predictor::Attention(d)   => d.decode(input),
            Predictor::Transformer(d) => d.decode(input),
            Predictor::Linear(d)      => d.decode(input),
        }
    }
}

/// Scores [batch, steps, classes] → per row, the winning class and
/// its softmax probability at every step.
pub fn read_out<B: Backend>(scores: Tensor<B, 3>) -> DecodeResult<Vec<Vec<StepChoice>>> {
    let [batch, steps, _] = scores.dims();
    if steps == 0 {
        return Ok(vec![Vec::new(); batch]);
    }
    let probs = softmax(scores, 2);

    let best = probs.clone().max_dim(2).reshape([batch * steps]);
    let idx  = probs.argmax(2).reshape([batch * steps]);

    let best: Vec<f32> = best
        .into_data()
        .convert::<f32>()
        .to_vec()
        .map_err(|e| DecodeError::Readout(format!("{e:?}")))?;
    let idx: Vec<i64> = idx
        .into_data()
        .convert::<i64>()
        .to_vec()
        .map_err(|e| DecodeError::Readout(format!("{e:?}")))?;

    Ok(idx
        .chunks(steps)
        .zip(best.chunks(steps))
        .map(|(row_idx, row_prob)| {
            row_idx
                .iter()
                .zip(row_prob)
                .map(|(&index, &probability)| StepChoice { index: index as usize, probability })
                .collect()
        })
        .collect())
}

// ─── Placeholder head ─────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct TransformerEncoderPredictionConfig {
    pub num_tokens:  usize,
    pub input_dim:   usize,
    #[config(default = 256)]
    pub hidden_dim:  usize,
    #[config(default = 2)]
    pub n_heads:     usize,
    #[config(default = 2)]
    pub num_layers:  usize,
    #[config(default = 0.2)]
    pub dropout:     f64,
}

impl TransformerEncoderPredictionConfig {
    /// Always fails: there is no working module behind this config.
    pub fn init<B: Backend>(&self, _device: &B::Device) -> DecodeResult<Infallible> {
        Err(DecodeError::Unimplemented("transformer-encoder prediction"))
    }
}
