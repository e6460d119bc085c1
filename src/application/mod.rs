// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates the other layers to accomplish one
// goal: turning encoder features into recognized text.
//
// Rules for this layer:
//   - No decoder internals here (that's Layer 5)
//   - No printing here (that's Layer 1)
//   - No direct file access (that's Layer 6)
//   - Only workflow coordination

// Settings, head construction and the decoding workflow
pub mod recognize_use_case;
