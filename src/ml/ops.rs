// ============================================================
// Layer 5 — Small Tensor Helpers
// ============================================================
// Shared by both decoders:
//   one_hot      — class index → one-hot row (previous character)
//   causal_mask  — upper-triangular Bool mask for self-attention
//   greedy_index — argmax over the class axis of one step

use burn::prelude::*;

/// Indices `[batch]` → one-hot rows `[batch, num_classes]`.
pub fn one_hot<B: Backend>(indices: Tensor<B, 1, Int>, num_classes: usize) -> Tensor<B, 2> {
    let [batch] = indices.dims();
    let device  = indices.device();

    let classes = Tensor::<B, 1, Int>::arange(0..num_classes as i64, &device)
        .unsqueeze_dim::<2>(0)
        .expand([batch, num_classes]);
    let indices = indices
        .unsqueeze_dim::<2>(1)
        .expand([batch, num_classes]);

    classes.equal(indices).float()
}

/// Causal mask `[batch, len, len]`; `true` marks a future position
/// that must not be attended to.
pub fn causal_mask<B: Backend>(batch: usize, len: usize, device: &B::Device) -> Tensor<B, 3, Bool> {
    Tensor::<B, 2>::ones([len, len], device)
        .triu(1)
        .greater_elem(0.5)
        .unsqueeze_dim::<3>(0)
        .expand([batch, len, len])
}

/// Step scores `[batch, num_classes]` → chosen class `[batch]`.
pub fn greedy_index<B: Backend>(scores: Tensor<B, 2>) -> Tensor<B, 1, Int> {
    let [batch, _] = scores.dims();
    scores.argmax(1).reshape([batch])
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    #[test]
    fn one_hot_then_argmax_returns_index() {
        let device  = Default::default();
        let indices = Tensor::<B, 1, Int>::from_ints([3, 0, 9], &device);

        let encoded = one_hot(indices.clone(), 10);
        assert_eq!(encoded.dims(), [3, 10]);

        let back: Vec<i64> = greedy_index(encoded)
            .into_data()
            .convert::<i64>()
            .to_vec()
            .unwrap();
        assert_eq!(back, vec![3, 0, 9]);
    }

    #[test]
    fn one_hot_rows_have_single_one() {
        let device  = Default::default();
        let indices = Tensor::<B, 1, Int>::from_ints([2, 5], &device);

        let sums: Vec<f32> = one_hot(indices, 6)
            .sum_dim(1)
            .into_data()
            .to_vec()
            .unwrap();
        assert_eq!(sums, vec![1.0, 1.0]);
    }

    #[test]
    fn causal_mask_hides_only_future_positions() {
        let device = Default::default();
        let mask: Vec<bool> = causal_mask::<B>(1, 3, &device)
            .into_data()
            .to_vec()
            .unwrap();

        #[rustfmt::skip]
        let expected = vec![
            false, true,  true,
            false, false, true,
            false, false, false,
        ];
        assert_eq!(mask, expected);
    }
}
