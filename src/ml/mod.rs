// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All burn code lives here. The domain layer stays free of
// tensors; the application layer only sees `Predictor`,
// `DecoderInput` and `read_out`.
//
// What's in this layer:
//
//   attention_cell.rs    — one recurrent attention step
//                          (additive attention + LSTM cell)
//   attention_decoder.rs — drives the cell over max_length + 1
//                          steps, teacher-forced or greedy
//   positional.rs        — fixed sinusoidal position table
//   transformer.rs       — decoder layer (self / cross / optional
//                          semantic attention + feed-forward) and
//                          the N-layer stack
//   tf_decoder.rs        — transformer alternative to the
//                          recurrent decoder, same signature
//   linear_decoder.rs    — position-wise linear classifier
//   side_context.rs      — optional scene/overlap → initial state
//   decoder.rs           — shared input type and decoder trait
//   prediction.rs        — head selection and greedy read-out
//   ops.rs               — one-hot, causal mask, argmax helpers
//   error.rs             — DecodeError
//
// Reference: Burn Book §3 (Building Blocks)
//            Bahdanau et al. (2015), Vaswani et al. (2017)

pub mod error;
pub mod ops;

/// Fixed sinusoidal position signal
pub mod positional;

/// Recurrent attention path
pub mod attention_cell;
pub mod attention_decoder;
pub mod side_context;

/// Transformer path
pub mod transformer;
pub mod tf_decoder;

pub mod linear_decoder;

/// Decoder seam and head selection
pub mod decoder;
pub mod prediction;
