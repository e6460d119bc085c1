// ============================================================
// Layer 5 — Side-Context Initial State
// ============================================================
// Optional capability of the recurrent attention decoder: derive
// the initial (hidden, cell) pair from the two auxiliary image
// embeddings instead of starting from zeros.
//
//   overlap [batch, 972]  → fc → relu → fc → relu → cell   [batch, hidden]
//   scene   [batch, 1065] → fc → relu → fc → relu → hidden [batch, hidden]
//
// Off by default. When a decoder is built without it, side context
// passed in at call time is accepted and not consumed; when built
// with it, side context becomes a required input.

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::relu,
};

use crate::ml::attention_cell::RecurrentState;
use crate::ml::decoder::SideContext;
use crate::ml::error::{DecodeError, DecodeResult};

#[derive(Config, Debug)]
pub struct SemanticInitConfig {
    pub hidden_size: usize,
    #[config(default = 1065)]
    pub scene_dim:   usize,
    #[config(default = 972)]
    pub overlap_dim: usize,
    #[config(default = 500)]
    pub bottleneck:  usize,
}

impl SemanticInitConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SemanticInit<B> {
        SemanticInit {
            scene_fc1:   LinearConfig::new(self.scene_dim, self.bottleneck).init(device),
            scene_fc2:   LinearConfig::new(self.bottleneck, self.hidden_size).init(device),
            overlap_fc1: LinearConfig::new(self.overlap_dim, self.bottleneck).init(device),
            overlap_fc2: LinearConfig::new(self.bottleneck, self.hidden_size).init(device),
            scene_dim:   self.scene_dim,
            overlap_dim: self.overlap_dim,
        }
    }
}

#[derive(Module, Debug)]
pub struct SemanticInit<B: Backend> {
    pub scene_fc1:   Linear<B>,
    pub scene_fc2:   Linear<B>,
    pub overlap_fc1: Linear<B>,
    pub overlap_fc2: Linear<B>,
    pub scene_dim:   usize,
    pub overlap_dim: usize,
}

impl<B: Backend> SemanticInit<B> {
    pub fn forward(&self, side: &SideContext<B>, batch: usize) -> DecodeResult<RecurrentState<B>> {
        check_side_dims(side, batch, self.scene_dim, self.overlap_dim)?;

        let hidden = relu(self.scene_fc2.forward(relu(self.scene_fc1.forward(side.scene.clone()))));
        let cell   = relu(self.overlap_fc2.forward(relu(self.overlap_fc1.forward(side.overlap.clone()))));

        Ok(RecurrentState { hidden, cell })
    }
}

/// Reject side context whose batch or width disagrees with the projections.
pub fn check_side_dims<B: Backend>(
    side:        &SideContext<B>,
    batch:       usize,
    scene_dim:   usize,
    overlap_dim: usize,
) -> DecodeResult<()> {
    let checks = [
        ("scene",   side.scene.dims(),   scene_dim),
        ("overlap", side.overlap.dims(), overlap_dim),
    ];
    for (name, [rows, cols], expected) in checks {
        if rows != batch {
            return Err(DecodeError::BatchMismatch { input: name, expected: batch, actual: rows });
        }
        if cols != expected {
            return Err(DecodeError::SideContextDim { name, expected, actual: cols });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    fn side(batch: usize, scene: usize, overlap: usize) -> SideContext<B> {
        let device = Default::default();
        SideContext {
            scene:   Tensor::ones([batch, scene], &device),
            overlap: Tensor::ones([batch, overlap], &device),
        }
    }

    #[test]
    fn projects_to_hidden_size() {
        let device = Default::default();
        let init   = SemanticInitConfig::new(16)
            .with_scene_dim(12)
            .with_overlap_dim(10)
            .with_bottleneck(8)
            .init::<B>(&device);

        let state = init.forward(&side(3, 12, 10), 3).unwrap();
        assert_eq!(state.hidden.dims(), [3, 16]);
        assert_eq!(state.cell.dims(),   [3, 16]);

        // relu output is never negative
        let hidden: Vec<f32> = state.hidden.into_data().to_vec().unwrap();
        assert!(hidden.iter().all(|&h| h >= 0.0));
    }

    #[test]
    fn rejects_wrong_scene_width() {
        let err = check_side_dims(&side(2, 11, 10), 2, 12, 10).unwrap_err();
        assert_eq!(err, DecodeError::SideContextDim { name: "scene", expected: 12, actual: 11 });
    }

    #[test]
    fn rejects_wrong_overlap_batch() {
        let device = Default::default();
        let ctx = SideContext::<B> {
            scene:   Tensor::ones([2, 12], &device),
            overlap: Tensor::ones([3, 10], &device),
        };
        let err = check_side_dims(&ctx, 2, 12, 10).unwrap_err();
        assert_eq!(err, DecodeError::BatchMismatch { input: "overlap", expected: 2, actual: 3 });
    }
}
