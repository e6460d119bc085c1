// ============================================================
// Layer 5 — Recurrent Attention Decoder
// ============================================================
// Drives the AttentionCell for max_length + 1 steps
// (+1 for the [s] end marker) and projects hidden states to
// class scores with one shared `generator` linear.
//
// Training (teacher forcing):
//   step i is fed onehot(text[:, i]); all hidden states are
//   collected and projected in one call after the loop.
//
// Inference (greedy):
//   step 0 is fed onehot([GO]); every following step is fed the
//   argmax of the previous step's scores. Targets are never read,
//   so the loop is strictly sequential.
//
// The recurrent state starts at zero, or from the side-context
// projection when the decoder was built with one.

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
};

use crate::domain::mode::DecodeMode;
use crate::ml::attention_cell::{AttentionCell, AttentionCellConfig, RecurrentState};
use crate::ml::decoder::{DecoderInput, SequenceDecoder};
use crate::ml::error::{DecodeError, DecodeResult};
use crate::ml::ops::{greedy_index, one_hot};
use crate::ml::side_context::{check_side_dims, SemanticInit, SemanticInitConfig};

#[derive(Config, Debug)]
pub struct AttentionDecoderConfig {
    /// Channels of the encoder output
    pub input_size:  usize,
    pub hidden_size: usize,
    pub num_classes: usize,
    #[config(default = 25)]
    pub max_length:  usize,
    /// Class fed to the first inference step ([GO])
    #[config(default = 0)]
    pub go_index:    usize,
    /// Derive the initial state from side context instead of zeros
    #[config(default = "None")]
    pub side_init:   Option<SemanticInitConfig>,
}

impl AttentionDecoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> DecodeResult<AttentionDecoder<B>> {
        if self.go_index >= self.num_classes {
            return Err(DecodeError::InvalidConfig(format!(
                "start index {} is outside {} classes",
                self.go_index, self.num_classes,
            )));
        }
        if let Some(side) = &self.side_init {
            if side.hidden_size != self.hidden_size {
                return Err(DecodeError::InvalidConfig(format!(
                    "side-context projection targets hidden size {}, decoder uses {}",
                    side.hidden_size, self.hidden_size,
                )));
            }
        }

        Ok(AttentionDecoder {
            attention_cell: AttentionCellConfig::new(self.input_size, self.hidden_size, self.num_classes)
                .init(device),
            generator:      LinearConfig::new(self.hidden_size, self.num_classes).init(device),
            side_init:      self.side_init.as_ref().map(|c| c.init(device)),
            input_size:     self.input_size,
            hidden_size:    self.hidden_size,
            num_classes:    self.num_classes,
            max_length:     self.max_length,
            go_index:       self.go_index,
        })
    }
}

#[derive(Module, Debug)]
pub struct AttentionDecoder<B: Backend> {
    pub attention_cell: AttentionCell<B>,
    pub generator:      Linear<B>,
    pub side_init:      Option<SemanticInit<B>>,
    pub input_size:     usize,
    pub hidden_size:    usize,
    pub num_classes:    usize,
    pub max_length:     usize,
    pub go_index:       usize,
}

/// Scores plus the attention map that produced them
pub struct AttentionDecoderOutput<B: Backend> {
    /// [batch, max_length + 1, num_classes]
    pub scores:    Tensor<B, 3>,
    /// [batch, max_length + 1, T]
    pub attention: Tensor<B, 3>,
}

impl<B: Backend> AttentionDecoder<B> {
    pub fn num_steps(&self) -> usize {
        self.max_length + 1
    }

    pub fn consumes_side_context(&self) -> bool {
        self.side_init.is_some()
    }

    pub fn forward_with_attention(&self, input: DecoderInput<B>) -> DecodeResult<AttentionDecoderOutput<B>> {
        input.check_channels(self.input_size)?;

        let text = match input.mode {
            DecodeMode::Train => Some(input.targets(self.num_steps(), self.num_classes)?),
            DecodeMode::Infer => None,
        };

        let batch  = input.batch_size();
        let device = input.encoder_output.device();
        let state  = self.initial_state(&input, batch, &device)?;

        tracing::debug!(
            "attention decode: batch={} steps={} mode={:?}",
            batch, self.num_steps(), input.mode,
        );

        Ok(match text {
            Some(text) => self.teacher_forced(input.encoder_output, text, state),
            None       => self.greedy(input.encoder_output, state, &device),
        })
    }

    fn initial_state(
        &self,
        input:  &DecoderInput<B>,
        batch:  usize,
        device: &B::Device,
    ) -> DecodeResult<RecurrentState<B>> {
        match (&self.side_init, &input.side) {
            (Some(init), Some(side)) => init.forward(side, batch),
            (Some(_), None)          => Err(DecodeError::MissingSideContext),
            (None, Some(side)) => {
                // Still reject malformed rows so a bad caller is noticed early
                let [_, scene_dim]   = side.scene.dims();
                let [_, overlap_dim] = side.overlap.dims();
                check_side_dims(side, batch, scene_dim, overlap_dim)?;
                tracing::debug!("side context supplied but decoder has no side-context projection; ignored");
                Ok(RecurrentState::zeros(batch, self.hidden_size, device))
            }
            (None, None) => Ok(RecurrentState::zeros(batch, self.hidden_size, device)),
        }
    }

    fn teacher_forced(
        &self,
        encoder_output: Tensor<B, 3>,
        text:           Tensor<B, 2, Int>,
        mut state:      RecurrentState<B>,
    ) -> AttentionDecoderOutput<B> {
        let [batch, enc_steps, _] = encoder_output.dims();
        let num_steps = self.num_steps();

        let mut hiddens   = Vec::with_capacity(num_steps);
        let mut attention = Vec::with_capacity(num_steps);

        for i in 0..num_steps {
            let chars = text.clone().slice([0..batch, i..i + 1]).reshape([batch]);
            let char_onehots = one_hot(chars, self.num_classes);

            let (next, alpha) = self.attention_cell.forward(state, encoder_output.clone(), char_onehots);
            hiddens.push(next.hidden.clone().unsqueeze_dim::<3>(1));
            attention.push(alpha.reshape([batch, 1, enc_steps]));
            state = next;
        }

        // One projection for every step at once
        let scores = self.generator.forward(Tensor::cat(hiddens, 1));
        AttentionDecoderOutput { scores, attention: Tensor::cat(attention, 1) }
    }

    fn greedy(
        &self,
        encoder_output: Tensor<B, 3>,
        mut state:      RecurrentState<B>,
        device:         &B::Device,
    ) -> AttentionDecoderOutput<B> {
        let [batch, enc_steps, _] = encoder_output.dims();
        let num_steps = self.num_steps();

        let mut targets   = Tensor::<B, 1, Int>::full([batch], self.go_index as i64, device);
        let mut scores    = Vec::with_capacity(num_steps);
        let mut attention = Vec::with_capacity(num_steps);

        for step in 0..num_steps {
            let char_onehots = one_hot(targets, self.num_classes);
            let (next, alpha) = self.attention_cell.forward(state, encoder_output.clone(), char_onehots);

            let step_scores = self.generator.forward(next.hidden.clone());
            targets = greedy_index(step_scores.clone());
            tracing::trace!("attention step {} decoded", step);

            scores.push(step_scores.unsqueeze_dim::<3>(1));
            attention.push(alpha.reshape([batch, 1, enc_steps]));
            state = next;
        }

        AttentionDecoderOutput {
            scores:    Tensor::cat(scores, 1),
            attention: Tensor::cat(attention, 1),
        }
    }
}

impl<B: Backend> SequenceDecoder<B> for AttentionDecoder<B> {
    fn output_steps(&self, _encoder_steps: usize) -> usize {
        self.num_steps()
    }

    fn decode(&self, input: DecoderInput<B>) -> DecodeResult<Tensor<B, 3>> {
        Ok(self.forward_with_attention(input)?.scores)
    }
}
