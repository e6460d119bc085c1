// ============================================================
// Layer 5 — Attention Cell
// ============================================================
// One step of the recurrent attention decoder (Bahdanau-style):
//
//   e_t   = score(tanh(i2h(H) + h2h(s_{t-1})))      [batch, T, 1]
//   α_t   = softmax(e_t) over the T encoder positions
//   c_t   = Σ α_t · H                                [batch, C]
//   s_t   = LSTM([c_t ; onehot(y_{t-1})], s_{t-1})
//
// H is the encoder output, s the (hidden, cell) pair.
// Exactly one of i2h / h2h carries a bias; a second one would
// only shift every score by the same constant.
//
// Reference: Bahdanau et al. (2015), Baek et al. (2019)

use burn::{
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::{sigmoid, softmax, tanh},
};

#[derive(Config, Debug)]
pub struct AttentionCellConfig {
    /// Channels of the encoder output
    pub input_size:     usize,
    pub hidden_size:    usize,
    /// Width of the previous-character vector (= class count)
    pub num_embeddings: usize,
}

impl AttentionCellConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> AttentionCell<B> {
        AttentionCell {
            i2h:   LinearConfig::new(self.input_size, self.hidden_size)
                .with_bias(false)
                .init(device),
            h2h:   LinearConfig::new(self.hidden_size, self.hidden_size).init(device),
            score: LinearConfig::new(self.hidden_size, 1)
                .with_bias(false)
                .init(device),
            rnn:   LstmCellConfig::new(self.input_size + self.num_embeddings, self.hidden_size)
                .init(device),
            hidden_size: self.hidden_size,
        }
    }
}

#[derive(Module, Debug)]
pub struct AttentionCell<B: Backend> {
    pub i2h:         Linear<B>,
    pub h2h:         Linear<B>,
    pub score:       Linear<B>,
    pub rnn:         LstmCell<B>,
    pub hidden_size: usize,
}

impl<B: Backend> AttentionCell<B> {
    /// prev: previous (hidden, cell), each [batch, hidden]
    /// encoder_output: [batch, T, C]
    /// char_onehots: [batch, num_embeddings]
    ///
    /// Returns the next state and α: [batch, T, 1]
    pub fn forward(
        &self,
        prev:           RecurrentState<B>,
        encoder_output: Tensor<B, 3>,
        char_onehots:   Tensor<B, 2>,
    ) -> (RecurrentState<B>, Tensor<B, 3>) {
        let [batch, steps, channels] = encoder_output.dims();

        let enc_proj = self.i2h.forward(encoder_output.clone());
        let hid_proj = self.h2h
            .forward(prev.hidden.clone())
            .unsqueeze_dim::<3>(1)
            .expand([batch, steps, self.hidden_size]);

        let energy = self.score.forward(tanh(enc_proj + hid_proj));
        let alpha  = softmax(energy, 1);

        // [batch, 1, T] x [batch, T, C] → [batch, 1, C]
        let context = alpha
            .clone()
            .swap_dims(1, 2)
            .matmul(encoder_output)
            .reshape([batch, channels]);

        let concat_context = Tensor::cat(vec![context, char_onehots], 1);
        let next = self.rnn.forward(concat_context, prev);

        (next, alpha)
    }
}

// ─── Recurrent state ──────────────────────────────────────────────────────────

/// The (hidden, cell) pair carried between decode steps.
#[derive(Debug, Clone)]
pub struct RecurrentState<B: Backend> {
    pub hidden: Tensor<B, 2>,
    pub cell:   Tensor<B, 2>,
}

impl<B: Backend> RecurrentState<B> {
    pub fn zeros(batch: usize, hidden_size: usize, device: &B::Device) -> Self {
        Self {
            hidden: Tensor::zeros([batch, hidden_size], device),
            cell:   Tensor::zeros([batch, hidden_size], device),
        }
    }
}

// ─── LSTM cell ────────────────────────────────────────────────────────────────
// Single-step LSTM with both input and recurrent biases.
// Gate rows are stacked i, f, g, o.

#[derive(Config, Debug)]
pub struct LstmCellConfig {
    pub input_size:  usize,
    pub hidden_size: usize,
}

impl LstmCellConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> LstmCell<B> {
        LstmCell {
            input_gates:  LinearConfig::new(self.input_size, 4 * self.hidden_size).init(device),
            hidden_gates: LinearConfig::new(self.hidden_size, 4 * self.hidden_size).init(device),
            hidden_size:  self.hidden_size,
        }
    }
}

#[derive(Module, Debug)]
pub struct LstmCell<B: Backend> {
    pub input_gates:  Linear<B>,
    pub hidden_gates: Linear<B>,
    pub hidden_size:  usize,
}

impl<B: Backend> LstmCell<B> {
    pub fn forward(&self, input: Tensor<B, 2>, state: RecurrentState<B>) -> RecurrentState<B> {
        let [batch, _] = input.dims();
        let h = self.hidden_size;

        let gates = self.input_gates.forward(input) + self.hidden_gates.forward(state.hidden);
        let gate  = |k: usize| gates.clone().slice([0..batch, k * h..(k + 1) * h]);

        let input_gate  = sigmoid(gate(0));
        let forget_gate = sigmoid(gate(1));
        let candidate   = tanh(gate(2));
        let output_gate = sigmoid(gate(3));

        let cell   = forget_gate * state.cell + input_gate * candidate;
        let hidden = output_gate * tanh(cell.clone());

        RecurrentState { hidden, cell }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    fn cell(device: &<B as Backend>::Device) -> AttentionCell<B> {
        AttentionCellConfig::new(6, 8, 5).init(device)
    }

    #[test]
    fn attention_weights_sum_to_one() {
        let device  = Default::default();
        let cell    = cell(&device);
        let encoder = Tensor::<B, 3>::random([2, 7, 6], burn::tensor::Distribution::Default, &device);
        let onehots = Tensor::<B, 2>::zeros([2, 5], &device);

        let (_, alpha) = cell.forward(RecurrentState::zeros(2, 8, &device), encoder, onehots);
        assert_eq!(alpha.dims(), [2, 7, 1]);

        let sums: Vec<f32> = alpha.clone().sum_dim(1).into_data().to_vec().unwrap();
        for s in sums {
            assert!((s - 1.0).abs() < 1e-5, "attention sums to {s}");
        }
        let weights: Vec<f32> = alpha.into_data().to_vec().unwrap();
        assert!(weights.iter().all(|&w| w >= 0.0));
    }

    #[test]
    fn zero_encoder_output_gives_uniform_attention() {
        let device  = Default::default();
        let cell    = cell(&device);
        let encoder = Tensor::<B, 3>::zeros([1, 4, 6], &device);
        let onehots = Tensor::<B, 2>::zeros([1, 5], &device);

        let (_, alpha) = cell.forward(RecurrentState::zeros(1, 8, &device), encoder, onehots);
        let weights: Vec<f32> = alpha.into_data().to_vec().unwrap();
        for w in weights {
            assert!((w - 0.25).abs() < 1e-6);
        }
    }

    #[test]
    fn step_keeps_state_shape() {
        let device  = Default::default();
        let cell    = cell(&device);
        let encoder = Tensor::<B, 3>::ones([3, 4, 6], &device);
        let onehots = Tensor::<B, 2>::ones([3, 5], &device);

        let (next, _) = cell.forward(RecurrentState::zeros(3, 8, &device), encoder, onehots);
        assert_eq!(next.hidden.dims(), [3, 8]);
        assert_eq!(next.cell.dims(),   [3, 8]);
    }

    #[test]
    fn lstm_hidden_is_bounded() {
        let device = Default::default();
        let lstm   = LstmCellConfig::new(4, 3).init::<B>(&device);
        let input  = Tensor::<B, 2>::ones([2, 4], &device).mul_scalar(50.0);

        let next = lstm.forward(input, RecurrentState::zeros(2, 3, &device));
        let hidden: Vec<f32> = next.hidden.into_data().to_vec().unwrap();
        assert!(hidden.iter().all(|h| h.abs() <= 1.0));
    }
}
