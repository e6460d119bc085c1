// ============================================================
// Layer 5 — Transformer Character Decoder
// ============================================================
// Drop-in alternative to the recurrent attention decoder, same
// inputs and output shape [batch, max_length + 1, num_classes].
//
// Training:
//   embed the first max_length + 1 target columns, add positions,
//   run the stack ONCE under a full causal mask and project every
//   position to class scores. No step depends on another.
//
// Inference:
//   start from [GO]; at step t rebuild the embeddings of the t + 1
//   known indices, rerun the stack under a (t + 1)² causal mask,
//   score the last position and append its argmax. Cost grows
//   quadratically with the decode length, which stays small.
//
// The causal mask is built per call; nothing is cached between
// calls except the positional table.

use burn::{
    module::Ignored,
    nn::{Embedding, EmbeddingConfig, Linear, LinearConfig},
    prelude::*,
};

use crate::domain::mode::DecodeMode;
use crate::ml::decoder::{DecoderInput, SequenceDecoder, SideContext};
use crate::ml::error::{DecodeError, DecodeResult};
use crate::ml::ops::{causal_mask, greedy_index};
use crate::ml::positional::{PositionalEncoding, PositionalEncodingConfig};
use crate::ml::transformer::{TransformerDecoder, TransformerDecoderConfig, TransformerDecoderLayerConfig};

#[derive(Config, Debug)]
pub struct TransformerCharDecoderConfig {
    /// Channels of the encoder output
    pub hidden_size:        usize,
    pub num_classes:        usize,
    pub embed_dim:          usize,
    #[config(default = 25)]
    pub max_length:         usize,
    #[config(default = 0)]
    pub go_index:           usize,
    #[config(default = 8)]
    pub n_heads:            usize,
    #[config(default = 2048)]
    pub d_ff:               usize,
    #[config(default = 6)]
    pub num_layers:         usize,
    #[config(default = 0.1)]
    pub dropout:            f64,
    #[config(default = false)]
    pub semantic_attention: bool,
    #[config(default = 512)]
    pub semantic_dim:       usize,
}

impl TransformerCharDecoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> DecodeResult<TransformerCharDecoder<B>> {
        if self.go_index >= self.num_classes {
            return Err(DecodeError::InvalidConfig(format!(
                "start index {} is outside {} classes",
                self.go_index, self.num_classes,
            )));
        }

        let layer = TransformerDecoderLayerConfig::new(self.embed_dim)
            .with_n_heads(self.n_heads)
            .with_d_ff(self.d_ff)
            .with_dropout(self.dropout)
            .with_semantic_attention(self.semantic_attention)
            .with_semantic_dim(self.semantic_dim);
        let decoder = TransformerDecoderConfig::new(layer)
            .with_num_layers(self.num_layers)
            .init(device)?;

        let pos_encoder = PositionalEncodingConfig::new(self.embed_dim)
            .with_max_len(self.max_length + 1)
            .with_dropout(self.dropout)
            .init();

        Ok(TransformerCharDecoder {
            hid_to_emb:     LinearConfig::new(self.hidden_size, self.embed_dim).init(device),
            emb:            EmbeddingConfig::new(self.num_classes, self.embed_dim).init(device),
            pos_encoder:    Ignored(pos_encoder),
            decoder,
            emb_to_classes: LinearConfig::new(self.embed_dim, self.num_classes).init(device),
            hidden_size:    self.hidden_size,
            num_classes:    self.num_classes,
            max_length:     self.max_length,
            go_index:       self.go_index,
        })
    }
}

#[derive(Module, Debug)]
pub struct TransformerCharDecoder<B: Backend> {
    /// Encoder channels → embedding width (memory)
    pub hid_to_emb:     Linear<B>,
    pub emb:            Embedding<B>,
    pub pos_encoder:    Ignored<PositionalEncoding>,
    pub decoder:        TransformerDecoder<B>,
    pub emb_to_classes: Linear<B>,
    pub hidden_size:    usize,
    pub num_classes:    usize,
    pub max_length:     usize,
    pub go_index:       usize,
}

impl<B: Backend> TransformerCharDecoder<B> {
    pub fn num_steps(&self) -> usize {
        self.max_length + 1
    }

    pub fn forward(&self, input: DecoderInput<B>) -> DecodeResult<Tensor<B, 3>> {
        input.check_channels(self.hidden_size)?;

        let text = match input.mode {
            DecodeMode::Train => Some(input.targets(self.num_steps(), self.num_classes)?),
            DecodeMode::Infer => None,
        };

        let batch  = input.batch_size();
        let side   = self.side_context(&input)?;
        let memory = self.hid_to_emb.forward(input.encoder_output.clone());

        tracing::debug!(
            "transformer decode: batch={} steps={} mode={:?}",
            batch, self.num_steps(), input.mode,
        );

        match text {
            Some(text) => self.parallel(text, memory, side, batch),
            None       => self.greedy(memory, side, batch),
        }
    }

    fn side_context<'a>(&self, input: &'a DecoderInput<B>) -> DecodeResult<Option<&'a SideContext<B>>> {
        match (self.decoder.uses_side_context(), input.side.as_ref()) {
            (true, None) => Err(DecodeError::MissingSideContext),
            (false, Some(_)) => {
                tracing::debug!("side context supplied but semantic attention is disabled; ignored");
                Ok(None)
            }
            (_, side) => Ok(side),
        }
    }

    fn parallel(
        &self,
        text:   Tensor<B, 2, Int>,
        memory: Tensor<B, 3>,
        side:   Option<&SideContext<B>>,
        batch:  usize,
    ) -> DecodeResult<Tensor<B, 3>> {
        let num_steps = self.num_steps();
        let device    = memory.device();

        // Extra trailing columns (the final [s] target) are not fed back
        let text = text.slice([0..batch, 0..num_steps]);
        let emb  = self.pos_encoder.0.forward(self.emb.forward(text), DecodeMode::Train)?;
        let mask = causal_mask(batch, num_steps, &device);

        let output = self.decoder.forward(emb, memory, side, Some(mask), DecodeMode::Train)?;
        Ok(self.emb_to_classes.forward(output))
    }

    fn greedy(
        &self,
        memory: Tensor<B, 3>,
        side:   Option<&SideContext<B>>,
        batch:  usize,
    ) -> DecodeResult<Tensor<B, 3>> {
        let num_steps = self.num_steps();
        let device    = memory.device();
        let [_, _, d_model] = memory.dims();

        let mut known  = vec![Tensor::<B, 2, Int>::full([batch, 1], self.go_index as i64, &device)];
        let mut scores = Vec::with_capacity(num_steps);

        for t in 0..num_steps {
            let prefix = Tensor::cat(known.clone(), 1);
            let emb    = self.pos_encoder.0.forward(self.emb.forward(prefix), DecodeMode::Infer)?;
            let mask   = causal_mask(batch, t + 1, &device);

            let output = self.decoder.forward(emb, memory.clone(), side, Some(mask), DecodeMode::Infer)?;
            let last   = output.slice([0..batch, t..t + 1, 0..d_model]);

            let step_scores = self.emb_to_classes.forward(last);
            let next = greedy_index(step_scores.clone().reshape([batch, self.num_classes]));
            tracing::trace!("transformer step {} decoded", t);

            scores.push(step_scores);
            known.push(next.reshape([batch, 1]));
        }

        Ok(Tensor::cat(scores, 1))
    }
}

impl<B: Backend> SequenceDecoder<B> for TransformerCharDecoder<B> {
    fn output_steps(&self, _encoder_steps: usize) -> usize {
        self.num_steps()
    }

    fn decode(&self, input: DecoderInput<B>) -> DecodeResult<Tensor<B, 3>> {
        self.forward(input)
    }
}
