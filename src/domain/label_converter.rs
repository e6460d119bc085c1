// ============================================================
// Layer 3 — Attention Label Converter
// ============================================================
// Maps text to class indices and back for the attention decoders.
//
// Class layout:
//   0       → [GO]  start token, fed to the first decode step
//   1       → [s]   end-of-sequence marker
//   2..     → the character set, in order
//
// Encoding "ab" with max_length = 4 gives a row of width 6:
//   [GO] a b [s] 0 0
// Column 0 is the decoder input for step 0; a training caller
// feeds columns 0..=max_length and scores against 1..=max_length+1.
//
// Decoding reads indices until the first [s].

use std::collections::HashMap;
use thiserror::Error;

pub const GO_INDEX:  usize = 0;
pub const EOS_INDEX: usize = 1;

const GO_TOKEN:  &str = "[GO]";
const EOS_TOKEN: &str = "[s]";

/// Printable ASCII without whitespace: digits, letters, punctuation.
pub fn default_character_set() -> String {
    let digits  = '0'..='9';
    let lower   = 'a'..='z';
    let upper   = 'A'..='Z';
    let punct   = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~".chars();
    digits.chain(lower).chain(upper).chain(punct).collect()
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LabelError {
    #[error("character {0:?} is not in the character set")]
    UnknownCharacter(char),

    #[error("label has {len} characters, the decoder reads at most {max}")]
    TooLong { len: usize, max: usize },

    #[error("character set contains {0:?} more than once")]
    DuplicateCharacter(char),

    #[error("class index {0} is out of range")]
    UnknownIndex(usize),
}

#[derive(Debug, Clone)]
pub struct LabelConverter {
    characters: Vec<char>,
    index:      HashMap<char, usize>,
}

impl LabelConverter {
    pub fn new(character_set: &str) -> Result<Self, LabelError> {
        let characters: Vec<char> = character_set.chars().collect();
        let mut index = HashMap::with_capacity(characters.len());

        for (i, &c) in characters.iter().enumerate() {
            // offset by the two reserved tokens
            if index.insert(c, i + 2).is_some() {
                return Err(LabelError::DuplicateCharacter(c));
            }
        }
        Ok(Self { characters, index })
    }

    /// Number of decoder output classes, reserved tokens included
    pub fn num_classes(&self) -> usize {
        self.characters.len() + 2
    }

    /// Encode each label as `[GO] chars.. [s] 0..`, width `max_length + 2`.
    pub fn encode(&self, labels: &[&str], max_length: usize) -> Result<Vec<Vec<i64>>, LabelError> {
        labels
            .iter()
            .map(|label| {
                let len = label.chars().count();
                if len > max_length {
                    return Err(LabelError::TooLong { len, max: max_length });
                }

                let mut row = vec![GO_INDEX as i64; max_length + 2];
                for (pos, c) in label.chars().enumerate() {
                    let idx = self.index.get(&c).ok_or(LabelError::UnknownCharacter(c))?;
                    row[pos + 1] = *idx as i64;
                }
                row[len + 1] = EOS_INDEX as i64;
                Ok(row)
            })
            .collect()
    }

    /// Turn one decoded index row into text, stopping at `[s]`.
    pub fn decode(&self, indices: &[usize]) -> Result<String, LabelError> {
        let mut text = String::new();
        for &idx in indices {
            match idx {
                EOS_INDEX => break,
                GO_INDEX  => continue,
                _ => {
                    let c = self.characters
                        .get(idx - 2)
                        .ok_or(LabelError::UnknownIndex(idx))?;
                    text.push(*c);
                }
            }
        }
        Ok(text)
    }

    /// Human-readable token for a class index (for logs)
    pub fn token(&self, idx: usize) -> String {
        match idx {
            GO_INDEX  => GO_TOKEN.to_string(),
            EOS_INDEX => EOS_TOKEN.to_string(),
            _ => self.characters
                .get(idx - 2)
                .map(|c| c.to_string())
                .unwrap_or_else(|| format!("<{idx}>")),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_set_gives_96_classes() {
        let c = LabelConverter::new(&default_character_set()).unwrap();
        assert_eq!(c.num_classes(), 96);
    }

    #[test]
    fn test_encode_layout() {
        let c    = LabelConverter::new("abc").unwrap();
        let rows = c.encode(&["ba", ""], 3).unwrap();
        // a=2 b=3 c=4
        assert_eq!(rows[0], vec![0, 3, 2, 1, 0]);
        assert_eq!(rows[1], vec![0, 1, 0, 0, 0]);
    }

    #[test]
    fn test_decode_stops_at_eos() {
        let c = LabelConverter::new("abc").unwrap();
        assert_eq!(c.decode(&[4, 2, 1, 3, 3]).unwrap(), "ca");
    }

    #[test]
    fn test_encode_then_decode_skips_go() {
        let c    = LabelConverter::new(&default_character_set()).unwrap();
        let rows = c.encode(&["Hello!"], 25).unwrap();
        let ids: Vec<usize> = rows[0].iter().map(|&i| i as usize).collect();
        assert_eq!(c.decode(&ids).unwrap(), "Hello!");
    }

    #[test]
    fn test_rejects_unknown_character() {
        let c = LabelConverter::new("abc").unwrap();
        assert_eq!(c.encode(&["abz"], 5), Err(LabelError::UnknownCharacter('z')));
    }

    #[test]
    fn test_rejects_too_long_label() {
        let c = LabelConverter::new("abc").unwrap();
        assert_eq!(c.encode(&["abcab"], 4), Err(LabelError::TooLong { len: 5, max: 4 }));
    }

    #[test]
    fn test_rejects_duplicate_characters() {
        assert!(matches!(
            LabelConverter::new("aba"),
            Err(LabelError::DuplicateCharacter('a'))
        ));
    }

    #[test]
    fn test_decode_rejects_out_of_range_index() {
        let c = LabelConverter::new("ab").unwrap();
        assert_eq!(c.decode(&[9]), Err(LabelError::UnknownIndex(9)));
    }

    #[test]
    fn test_token_names() {
        let c = LabelConverter::new("ab").unwrap();
        assert_eq!(c.token(0), "[GO]");
        assert_eq!(c.token(1), "[s]");
        assert_eq!(c.token(3), "b");
    }
}
