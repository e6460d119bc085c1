// ============================================================
// Layer 5 — Linear Decoder
// ============================================================
// Position-wise classifier: one linear map applied to every
// encoder step. No recurrence, no attention, no notion of [GO];
// it emits one score vector per encoder position regardless of
// mode, so its output length follows the encoder, not max_length.

use burn::{
    nn::{Initializer, Linear, LinearConfig},
    prelude::*,
};

use crate::ml::decoder::{DecoderInput, SequenceDecoder};
use crate::ml::error::DecodeResult;

#[derive(Config, Debug)]
pub struct LinearDecoderConfig {
    pub num_classes: usize,
    #[config(default = 1024)]
    pub input_size:  usize,
    /// Weights are drawn from U(-init_range, init_range)
    #[config(default = 0.1)]
    pub init_range:  f64,
}

impl LinearDecoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> LinearDecoder<B> {
        let linear = LinearConfig::new(self.input_size, self.num_classes)
            .with_initializer(Initializer::Uniform {
                min: -self.init_range,
                max:  self.init_range,
            })
            .init(device);

        LinearDecoder { linear, input_size: self.input_size }
    }
}

#[derive(Module, Debug)]
pub struct LinearDecoder<B: Backend> {
    pub linear:     Linear<B>,
    pub input_size: usize,
}

impl<B: Backend> SequenceDecoder<B> for LinearDecoder<B> {
    fn output_steps(&self, encoder_steps: usize) -> usize {
        encoder_steps
    }

    fn decode(&self, input: DecoderInput<B>) -> DecodeResult<Tensor<B, 3>> {
        input.check_channels(self.input_size)?;
        Ok(self.linear.forward(input.encoder_output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::error::DecodeError;
    use burn::backend::NdArray;

    type B = NdArray;

    #[test]
    fn scores_every_encoder_position() {
        let device  = Default::default();
        let decoder = LinearDecoderConfig::new(10).with_input_size(12).init::<B>(&device);
        let encoder = Tensor::<B, 3>::ones([2, 7, 12], &device);

        assert_eq!(decoder.output_steps(7), 7);
        let scores = decoder.decode(DecoderInput::infer(encoder)).unwrap();
        assert_eq!(scores.dims(), [2, 7, 10]);
    }

    #[test]
    fn weights_stay_in_init_range() {
        let device  = Default::default();
        let decoder = LinearDecoderConfig::new(5).with_input_size(4).init::<B>(&device);

        let weights: Vec<f32> = decoder.linear.weight.val().into_data().to_vec().unwrap();
        assert!(weights.iter().all(|w| w.abs() <= 0.1 + 1e-6));
    }

    #[test]
    fn rejects_wrong_width() {
        let device  = Default::default();
        let decoder = LinearDecoderConfig::new(5).with_input_size(4).init::<B>(&device);
        let err     = decoder
            .decode(DecoderInput::infer(Tensor::<B, 3>::ones([1, 3, 6], &device)))
            .unwrap_err();
        assert_eq!(err, DecodeError::EncoderChannels { expected: 4, actual: 6 });
    }
}
