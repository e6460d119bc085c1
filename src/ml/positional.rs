// ============================================================
// Layer 5 — Sinusoidal Positional Encoding
// ============================================================
// Attention is permutation-invariant, so the transformer decoder
// needs an explicit position signal on top of the character
// embeddings. Unlike a learned position embedding, this one is
// fixed:
//
//   pe[pos, 2i]   = sin(pos / 10000^(2i / d_model))
//   pe[pos, 2i+1] = cos(pos / 10000^(2i / d_model))
//
// The table is computed once when the module is built and never
// written again. Dropout follows the addition and is only live in
// training mode.
//
// Reference: Vaswani et al. (2017) §3.5

use burn::{
    nn::{Dropout, DropoutConfig},
    prelude::*,
};

use crate::domain::mode::DecodeMode;
use crate::ml::error::{DecodeError, DecodeResult};

#[derive(Config, Debug)]
pub struct PositionalEncodingConfig {
    pub d_model: usize,
    /// Positions covered by the table ([GO] + max text length)
    #[config(default = 26)]
    pub max_len: usize,
    #[config(default = 0.1)]
    pub dropout: f64,
}

impl PositionalEncodingConfig {
    pub fn init(&self) -> PositionalEncoding {
        PositionalEncoding {
            table:   sinusoid_table(self.max_len, self.d_model),
            dropout: DropoutConfig::new(self.dropout).init(),
            d_model: self.d_model,
            max_len: self.max_len,
        }
    }
}

/// Holds no learned weights, so owners keep it behind
/// `burn::module::Ignored` rather than as a sub-module.
#[derive(Clone, Debug)]
pub struct PositionalEncoding {
    /// Row-major `[max_len, d_model]`
    table:   Vec<f32>,
    dropout: Dropout,
    d_model: usize,
    max_len: usize,
}

impl PositionalEncoding {
    /// x: [batch, seq_len, d_model] → same shape with positions added.
    pub fn forward<B: Backend>(&self, x: Tensor<B, 3>, mode: DecodeMode) -> DecodeResult<Tensor<B, 3>> {
        let [batch, seq_len, d_model] = x.dims();
        if seq_len > self.max_len {
            return Err(DecodeError::SequenceTooLong { len: seq_len, max: self.max_len });
        }
        if d_model != self.d_model {
            return Err(DecodeError::InvalidConfig(format!(
                "positional table width {} does not match embedding width {}",
                self.d_model, d_model,
            )));
        }

        let rows = &self.table[..seq_len * d_model];
        let pe   = Tensor::<B, 1>::from_floats(rows, &x.device())
            .reshape([1, seq_len, d_model])
            .expand([batch, seq_len, d_model]);

        let x = x + pe;
        Ok(match mode {
            DecodeMode::Train => self.dropout.forward(x),
            DecodeMode::Infer => x,
        })
    }
}

/// Build the `[max_len, d_model]` sinusoid table, row-major.
pub fn sinusoid_table(max_len: usize, d_model: usize) -> Vec<f32> {
    let mut table = vec![0.0f32; max_len * d_model];
    let log_base  = (10000.0f64).ln();

    for pos in 0..max_len {
        for i in (0..d_model).step_by(2) {
            let div   = (-(i as f64) * log_base / d_model as f64).exp();
            let angle = pos as f64 * div;
            table[pos * d_model + i] = angle.sin() as f32;
            if i + 1 < d_model {
                table[pos * d_model + i + 1] = angle.cos() as f32;
            }
        }
    }
    table
}
