// ============================================================
// Layer 3 — Recognition Result
// ============================================================
// What the user gets back for one image: the decoded text and a
// confidence score. Confidence is the product of the winning
// class probability at every step up to and including [s], so a
// single uncertain character pulls the whole word down.

use serde::{Deserialize, Serialize};

use crate::domain::label_converter::{LabelConverter, LabelError, EOS_INDEX};

/// One greedy decode step: chosen class and its softmax probability
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepChoice {
    pub index:       usize,
    pub probability: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recognition {
    pub text:       String,
    pub confidence: f32,
}

impl Recognition {
    pub fn from_steps(converter: &LabelConverter, steps: &[StepChoice]) -> Result<Self, LabelError> {
        let indices: Vec<usize> = steps.iter().map(|s| s.index).collect();
        let text = converter.decode(&indices)?;

        // Steps past [s] are padding and do not count
        let mut confidence = 1.0f32;
        for step in steps {
            confidence *= step.probability;
            if step.index == EOS_INDEX {
                break;
            }
        }

        Ok(Self { text, confidence })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(index: usize, probability: f32) -> StepChoice {
        StepChoice { index, probability }
    }

    #[test]
    fn test_confidence_stops_at_eos() {
        let c     = LabelConverter::new("ab").unwrap();
        let steps = [step(2, 0.5), step(3, 0.5), step(1, 0.8), step(2, 0.01)];
        let r     = Recognition::from_steps(&c, &steps).unwrap();
        assert_eq!(r.text, "ab");
        assert!((r.confidence - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_no_eos_uses_every_step() {
        let c = LabelConverter::new("ab").unwrap();
        let r = Recognition::from_steps(&c, &[step(2, 0.5), step(2, 0.5)]).unwrap();
        assert_eq!(r.text, "aa");
        assert!((r.confidence - 0.25).abs() < 1e-6);
    }
}
