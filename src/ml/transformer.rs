// ============================================================
// Layer 5 — Transformer Decoder Layer and Stack
// ============================================================
// Post-norm decoder layer, one sub-block after another:
//
//   1. masked self-attention over the target prefix
//   2. cross-attention from the target to encoder memory
//   3. semantic cross-attention to the projected `overlap`
//      embedding (only when `semantic_attention` is enabled)
//   4. feed-forward: linear → relu → dropout → linear
//
// Every sub-block output goes through dropout (training only),
// is added back to its input, and is layer-normalised.
//
// The stack applies `num_layers` independently initialised
// layers and a final LayerNorm.
//
// Reference: Vaswani et al. (2017) §3.1, burn::nn::attention

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::relu,
};

use crate::domain::mode::DecodeMode;
use crate::ml::decoder::SideContext;
use crate::ml::error::{DecodeError, DecodeResult};

// ─── Layer ────────────────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct TransformerDecoderLayerConfig {
    pub d_model:            usize,
    #[config(default = 8)]
    pub n_heads:            usize,
    #[config(default = 2048)]
    pub d_ff:               usize,
    #[config(default = 0.1)]
    pub dropout:            f64,
    /// Enables sub-block 3
    #[config(default = false)]
    pub semantic_attention: bool,
    /// Width of the `overlap` embedding fed to sub-block 3
    #[config(default = 512)]
    pub semantic_dim:       usize,
}

impl TransformerDecoderLayerConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> DecodeResult<TransformerDecoderLayer<B>> {
        if self.n_heads == 0 || self.d_model % self.n_heads != 0 {
            return Err(DecodeError::InvalidConfig(format!(
                "d_model {} is not divisible into {} heads",
                self.d_model, self.n_heads,
            )));
        }

        let semantic = self.semantic_attention.then(|| SemanticAttention {
            semantic_to_emb: LinearConfig::new(self.semantic_dim, self.d_model).init(device),
            attn:            self.attention(device),
            norm:            LayerNormConfig::new(self.d_model).init(device),
            semantic_dim:    self.semantic_dim,
        });

        Ok(TransformerDecoderLayer {
            self_attn:  self.attention(device),
            cross_attn: self.attention(device),
            semantic,
            linear1:    LinearConfig::new(self.d_model, self.d_ff).init(device),
            linear2:    LinearConfig::new(self.d_ff, self.d_model).init(device),
            norm1:      LayerNormConfig::new(self.d_model).init(device),
            norm2:      LayerNormConfig::new(self.d_model).init(device),
            norm_ff:    LayerNormConfig::new(self.d_model).init(device),
            dropout:    DropoutConfig::new(self.dropout).init(),
        })
    }

    // burn's internal attention dropout fires on any autodiff backend
    // regardless of mode, so it stays at zero; the sub-block outputs
    // are regularized instead, behind the mode gate.
    fn attention<B: Backend>(&self, device: &B::Device) -> MultiHeadAttention<B> {
        MultiHeadAttentionConfig::new(self.d_model, self.n_heads)
            .with_dropout(0.0)
            .init(device)
    }
}

/// Sub-block 3: attend from the target sequence to side context.
#[derive(Module, Debug)]
pub struct SemanticAttention<B: Backend> {
    pub semantic_to_emb: Linear<B>,
    pub attn:            MultiHeadAttention<B>,
    pub norm:            LayerNorm<B>,
    pub semantic_dim:    usize,
}

#[derive(Module, Debug)]
pub struct TransformerDecoderLayer<B: Backend> {
    pub self_attn:  MultiHeadAttention<B>,
    pub cross_attn: MultiHeadAttention<B>,
    pub semantic:   Option<SemanticAttention<B>>,
    pub linear1:    Linear<B>,
    pub linear2:    Linear<B>,
    pub norm1:      LayerNorm<B>,
    pub norm2:      LayerNorm<B>,
    pub norm_ff:    LayerNorm<B>,
    pub dropout:    Dropout,
}

impl<B: Backend> TransformerDecoderLayer<B> {
    /// tgt: [batch, S, d_model], memory: [batch, T, d_model],
    /// tgt_mask: [batch, S, S] with `true` on hidden positions.
    pub fn forward(
        &self,
        tgt:      Tensor<B, 3>,
        memory:   Tensor<B, 3>,
        side:     Option<&SideContext<B>>,
        tgt_mask: Option<Tensor<B, 3, Bool>>,
        mode:     DecodeMode,
    ) -> DecodeResult<Tensor<B, 3>> {
        // 1. masked self-attention
        let mut self_input = MhaInput::self_attn(tgt.clone());
        if let Some(mask) = tgt_mask {
            self_input = self_input.mask_attn(mask);
        }
        let tgt2 = self.self_attn.forward(self_input).context;
        let tgt  = self.norm1.forward(tgt + self.regularize(tgt2, mode));

        // 2. cross-attention to encoder memory
        let cross_input = MhaInput::new(tgt.clone(), memory.clone(), memory);
        let tgt2 = self.cross_attn.forward(cross_input).context;
        let tgt  = self.norm2.forward(tgt + self.regularize(tgt2, mode));

        // 3. semantic cross-attention
        let tgt = match &self.semantic {
            Some(block) => {
                let side    = side.ok_or(DecodeError::MissingSideContext)?;
                let overlap = block.project(side)?;
                let input   = MhaInput::new(tgt.clone(), overlap.clone(), overlap);
                let tgt2    = block.attn.forward(input).context;
                block.norm.forward(tgt + self.regularize(tgt2, mode))
            }
            None => tgt,
        };

        // 4. feed-forward
        let hidden = self.regularize(relu(self.linear1.forward(tgt.clone())), mode);
        let tgt2   = self.linear2.forward(hidden);
        Ok(self.norm_ff.forward(tgt + self.regularize(tgt2, mode)))
    }

    pub fn has_semantic_attention(&self) -> bool {
        self.semantic.is_some()
    }

    fn regularize<const D: usize>(&self, x: Tensor<B, D>, mode: DecodeMode) -> Tensor<B, D> {
        match mode {
            DecodeMode::Train => self.dropout.forward(x),
            DecodeMode::Infer => x,
        }
    }
}

impl<B: Backend> SemanticAttention<B> {
    /// overlap [batch, semantic_dim] → key/value sequence [batch, 1, d_model]
    fn project(&self, side: &SideContext<B>) -> DecodeResult<Tensor<B, 3>> {
        let [_, dim] = side.overlap.dims();
        if dim != self.semantic_dim {
            return Err(DecodeError::SideContextDim {
                name:     "overlap",
                expected: self.semantic_dim,
                actual:   dim,
            });
        }
        Ok(self.semantic_to_emb.forward(side.overlap.clone()).unsqueeze_dim::<3>(1))
    }
}

// ─── Stack ────────────────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct TransformerDecoderConfig {
    pub layer:      TransformerDecoderLayerConfig,
    #[config(default = 6)]
    pub num_layers: usize,
}

impl TransformerDecoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> DecodeResult<TransformerDecoder<B>> {
        // Each layer gets its own freshly initialised weights
        let layers = (0..self.num_layers)
            .map(|_| self.layer.init(device))
            .collect::<DecodeResult<Vec<_>>>()?;

        Ok(TransformerDecoder {
            layers,
            norm: LayerNormConfig::new(self.layer.d_model).init(device),
        })
    }
}

#[derive(Module, Debug)]
pub struct TransformerDecoder<B: Backend> {
    pub layers: Vec<TransformerDecoderLayer<B>>,
    pub norm:   LayerNorm<B>,
}

impl<B: Backend> TransformerDecoder<B> {
    pub fn forward(
        &self,
        tgt:      Tensor<B, 3>,
        memory:   Tensor<B, 3>,
        side:     Option<&SideContext<B>>,
        tgt_mask: Option<Tensor<B, 3, Bool>>,
        mode:     DecodeMode,
    ) -> DecodeResult<Tensor<B, 3>> {
        let mut output = tgt;
        for layer in &self.layers {
            output = layer.forward(output, memory.clone(), side, tgt_mask.clone(), mode)?;
        }
        Ok(self.norm.forward(output))
    }

    pub fn uses_side_context(&self) -> bool {
        self.layers.iter().any(|l| l.has_semantic_attention())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::ops::causal_mask;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type B = NdArray;

    fn layer_config() -> TransformerDecoderLayerConfig {
        TransformerDecoderLayerConfig::new(16)
            .with_n_heads(4)
            .with_d_ff(32)
            .with_dropout(0.0)
    }

    fn values(t: Tensor<B, 3>) -> Vec<f32> {
        t.into_data().to_vec().unwrap()
    }

    #[test]
    fn layer_keeps_target_shape() {
        let device = Default::default();
        let layer  = layer_config().init::<B>(&device).unwrap();

        let tgt    = Tensor::<B, 3>::random([2, 5, 16], Distribution::Default, &device);
        let memory = Tensor::<B, 3>::random([2, 9, 16], Distribution::Default, &device);
        let out    = layer
            .forward(tgt, memory, None, Some(causal_mask(2, 5, &device)), DecodeMode::Infer)
            .unwrap();
        assert_eq!(out.dims(), [2, 5, 16]);
    }

    #[test]
    fn infer_mode_is_repeatable_with_dropout_on_autodiff() {
        use burn::backend::Autodiff;
        type Ad = Autodiff<NdArray>;

        let device = Default::default();
        let stack  = TransformerDecoderConfig::new(layer_config().with_dropout(0.5))
            .with_num_layers(2)
            .init::<Ad>(&device)
            .unwrap();

        let tgt    = Tensor::<Ad, 3>::random([2, 4, 16], Distribution::Default, &device);
        let memory = Tensor::<Ad, 3>::random([2, 6, 16], Distribution::Default, &device);
        let mask   = causal_mask(2, 4, &device);

        let run = |tgt: Tensor<Ad, 3>| -> Vec<f32> {
            stack
                .forward(tgt, memory.clone(), None, Some(mask.clone()), DecodeMode::Infer)
                .unwrap()
                .into_data()
                .to_vec()
                .unwrap()
        };
        assert_eq!(run(tgt.clone()), run(tgt));
    }

    #[test]
    fn heads_must_divide_model_width() {
        let device = Default::default();
        let result = TransformerDecoderLayerConfig::new(10).with_n_heads(4).init::<B>(&device);
        assert!(matches!(result, Err(DecodeError::InvalidConfig(_))));
    }

    #[test]
    fn stack_builds_requested_depth() {
        let device = Default::default();
        let stack  = TransformerDecoderConfig::new(layer_config())
            .with_num_layers(3)
            .init::<B>(&device)
            .unwrap();
        assert_eq!(stack.layers.len(), 3);
        assert!(!stack.uses_side_context());
    }

    #[test]
    fn causal_mask_isolates_earlier_positions() {
        let device = Default::default();
        let stack  = TransformerDecoderConfig::new(layer_config())
            .with_num_layers(2)
            .init::<B>(&device)
            .unwrap();

        let memory = Tensor::<B, 3>::random([1, 6, 16], Distribution::Default, &device);
        let tgt_a  = Tensor::<B, 3>::random([1, 4, 16], Distribution::Default, &device);
        // Replace positions 2.. with different values
        let tail   = Tensor::<B, 3>::random([1, 2, 16], Distribution::Default, &device);
        let tgt_b  = Tensor::cat(vec![tgt_a.clone().slice([0..1, 0..2, 0..16]), tail], 1);

        let mask  = causal_mask(1, 4, &device);
        let out_a = stack.forward(tgt_a, memory.clone(), None, Some(mask.clone()), DecodeMode::Infer).unwrap();
        let out_b = stack.forward(tgt_b, memory, None, Some(mask), DecodeMode::Infer).unwrap();

        let head_a = values(out_a.clone().slice([0..1, 0..2, 0..16]));
        let head_b = values(out_b.clone().slice([0..1, 0..2, 0..16]));
        for (x, y) in head_a.iter().zip(head_b.iter()) {
            assert!((x - y).abs() < 1e-5);
        }

        // ...while the perturbed positions do change
        let tail_a = values(out_a.slice([0..1, 2..4, 0..16]));
        let tail_b = values(out_b.slice([0..1, 2..4, 0..16]));
        assert!(tail_a.iter().zip(tail_b.iter()).any(|(x, y)| (x - y).abs() > 1e-4));
    }

    #[test]
    fn semantic_block_needs_overlap() {
        let device = Default::default();
        let layer  = layer_config()
            .with_semantic_attention(true)
            .with_semantic_dim(12)
            .init::<B>(&device)
            .unwrap();
        assert!(layer.has_semantic_attention());

        let tgt    = Tensor::<B, 3>::zeros([2, 3, 16], &device);
        let memory = Tensor::<B, 3>::zeros([2, 4, 16], &device);
        let err    = layer
            .forward(tgt.clone(), memory.clone(), None, None, DecodeMode::Infer)
            .unwrap_err();
        assert_eq!(err, DecodeError::MissingSideContext);

        let side = SideContext {
            scene:   Tensor::<B, 2>::zeros([2, 5], &device),
            overlap: Tensor::<B, 2>::ones([2, 12], &device),
        };
        let out = layer.forward(tgt, memory, Some(&side), None, DecodeMode::Infer).unwrap();
        assert_eq!(out.dims(), [2, 3, 16]);
    }

    #[test]
    fn semantic_block_checks_overlap_width() {
        let device = Default::default();
        let layer  = layer_config()
            .with_semantic_attention(true)
            .with_semantic_dim(12)
            .init::<B>(&device)
            .unwrap();

        let side = SideContext {
            scene:   Tensor::<B, 2>::zeros([1, 5], &device),
            overlap: Tensor::<B, 2>::ones([1, 11], &device),
        };
        let err = layer
            .forward(
                Tensor::zeros([1, 3, 16], &device),
                Tensor::zeros([1, 4, 16], &device),
                Some(&side),
                None,
                DecodeMode::Infer,
            )
            .unwrap_err();
        assert_eq!(err, DecodeError::SideContextDim { name: "overlap", expected: 12, actual: 11 });
    }
}
