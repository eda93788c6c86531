// ============================================================
// Layer 4 — Vocabulary
// ============================================================
// A word-level vocabulary shared by the encoder, the decoder,
// and both baselines. It is a thin wrapper over a HuggingFace
// `tokenizers::Tokenizer` with a WordLevel model, so the same
// JSON file can be saved next to the checkpoints and reloaded
// for inference.
//
// Fixed ids for the special tokens:
//   [PAD]  = 0   padding, ignored by the loss
//   [UNK]  = 1   out-of-vocabulary word
//   [SOS]  = 2   start of a sequence
//   [EOS]  = 3   end of a sequence
//   [HOLE] = 4   the gap in a retrieval template
//
// Corpus words follow from id 5, most frequent first.

use anyhow::Result;
use std::collections::HashMap;
use std::str::FromStr;
use tokenizers::Tokenizer;

pub const PAD_ID: u32  = 0;
pub const UNK_ID: u32  = 1;
pub const SOS_ID: u32  = 2;
pub const EOS_ID: u32  = 3;
pub const HOLE_ID: u32 = 4;

const SPECIALS: [(&str, u32); 5] = [
    ("[PAD]", PAD_ID),
    ("[UNK]", UNK_ID),
    ("[SOS]", SOS_ID),
    ("[EOS]", EOS_ID),
    ("[HOLE]", HOLE_ID),
];

#[derive(Clone)]
pub struct Vocab {
    tokenizer: Tokenizer,
}

impl Vocab {
    /// Count words in `texts` and keep the `max_size - 5` most frequent.
    pub fn from_texts<S: AsRef<str>>(texts: &[S], max_size: usize) -> Result<Self> {
        Self::from_json(&Self::build_json(texts, max_size))
    }

    /// Parse a tokenizer JSON document produced by [`Vocab::build_json`].
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        let tokenizer = Tokenizer::from_str(&json.to_string())
            .map_err(|e| anyhow::anyhow!("Invalid tokenizer JSON: {e}"))?;
        Ok(Self { tokenizer })
    }

    pub fn from_tokenizer(tokenizer: Tokenizer) -> Self {
        Self { tokenizer }
    }

    /// Build the HuggingFace tokenizer JSON for a word-level vocabulary.
    pub fn build_json<S: AsRef<str>>(texts: &[S], max_size: usize) -> serde_json::Value {
        let mut freq: HashMap<String, usize> = HashMap::new();
        for text in texts {
            for word in text.as_ref().split_whitespace() {
                *freq.entry(word.to_lowercase()).or_insert(0) += 1;
            }
        }

        // Frequency descending, then alphabetical so ties are stable
        let mut words: Vec<(String, usize)> = freq.into_iter().collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        words.truncate(max_size.saturating_sub(SPECIALS.len()));

        let mut vocab = serde_json::Map::new();
        for (token, id) in SPECIALS {
            vocab.insert(token.to_string(), serde_json::json!(id));
        }
        let mut next_id = SPECIALS.len();
        for (word, _) in words {
            if !vocab.contains_key(&word) {
                vocab.insert(word, serde_json::json!(next_id));
                next_id += 1;
            }
        }

        let added_tokens: Vec<serde_json::Value> = SPECIALS
            .iter()
            .map(|(token, id)| {
                serde_json::json!({
                    "id": id, "content": token, "single_word": false,
                    "lstrip": false, "rstrip": false, "normalized": false, "special": true
                })
            })
            .collect();

        serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": added_tokens,
            "normalizer": {
                "type": "BertNormalizer",
                "clean_text": true,
                "handle_chinese_chars": false,
                "strip_accents": false,
                "lowercase": true
            },
            "pre_tokenizer": { "type": "WhitespaceSplit" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": "[UNK]"
            }
        })
    }

    pub fn pad(&self) -> u32 { PAD_ID }
    pub fn unk(&self) -> u32 { UNK_ID }
    pub fn sos(&self) -> u32 { SOS_ID }
    pub fn eos(&self) -> u32 { EOS_ID }
    pub fn hole(&self) -> u32 { HOLE_ID }

    /// Number of ids, specials included. This is the embedding size.
    pub fn len(&self) -> usize {
        // Specials live in the WordLevel table too, so the model count is complete
        self.tokenizer.get_vocab_size(false)
    }

    pub fn is_special(&self, id: u32) -> bool {
        SPECIALS.iter().any(|&(_, special)| special == id)
    }

    /// Token ids for `text`, no markers added.
    pub fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let enc = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;
        Ok(enc.get_ids().to_vec())
    }

    /// `[SOS] ids.. [EOS]`, the form the neural model consumes.
    pub fn encode_wrapped(&self, text: &str) -> Result<Vec<u32>> {
        let mut ids = vec![SOS_ID];
        ids.extend(self.encode(text)?);
        ids.push(EOS_ID);
        Ok(ids)
    }

    /// Space-joined words, special tokens dropped.
    pub fn decode(&self, ids: &[u32]) -> Result<String> {
        self.tokenizer
            .decode(ids, true)
            .map_err(|e| anyhow::anyhow!("Decode error: {e}"))
    }

    /// Like [`Vocab::decode`] but keeps `[HOLE]` visible, for templates.
    pub fn decode_template(&self, ids: &[u32]) -> Result<String> {
        let words: Vec<String> = ids
            .iter()
            .map(|&id| {
                self.tokenizer
                    .id_to_token(id)
                    .unwrap_or_else(|| "[UNK]".to_string())
            })
            .collect();
        Ok(words.join(" "))
    }
}

impl std::fmt::Debug for Vocab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vocab").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> Vocab {
        Vocab::from_texts(&["jump twice", "JUMP JUMP", "walk"], 100).unwrap()
    }

    #[test]
    fn test_specials_have_fixed_ids() {
        let v = vocab();
        assert_eq!(v.encode("[HOLE]").unwrap(), vec![HOLE_ID]);
        assert_eq!(v.encode("[EOS]").unwrap(), vec![EOS_ID]);
        assert!(v.is_special(PAD_ID));
        assert!(!v.is_special(5));
    }

    #[test]
    fn test_most_frequent_word_first() {
        // "jump" appears three times after lowercasing
        let v = vocab();
        assert_eq!(v.encode("jump").unwrap(), vec![5]);
        assert_eq!(v.len(), 5 + 3);
    }

    #[test]
    fn test_unknown_word_maps_to_unk() {
        let v = vocab();
        assert_eq!(v.encode("jump sideways").unwrap(), vec![5, UNK_ID]);
    }

    #[test]
    fn test_wrapped_and_decode() {
        let v   = vocab();
        let ids = v.encode_wrapped("Jump twice").unwrap();
        assert_eq!(ids.first(), Some(&SOS_ID));
        assert_eq!(ids.last(), Some(&EOS_ID));
        assert_eq!(v.decode(&ids).unwrap(), "jump twice");
    }

    #[test]
    fn test_truncates_to_max_size() {
        let v = Vocab::from_texts(&["a b c d e f"], 7).unwrap();
        assert_eq!(v.len(), 7);
    }

    #[test]
    fn test_accented_words_keep_their_ids() {
        let v = Vocab::from_texts(&["café café naïve"], 100).unwrap();
        let ids = v.encode("Café naïve").unwrap();
        assert_eq!(ids, vec![5, 6]);
        assert_eq!(v.decode(&ids).unwrap(), "café naïve");
    }

    #[test]
    fn test_decode_template_keeps_hole() {
        let v   = vocab();
        let ids = v.encode("jump [HOLE]").unwrap();
        assert_eq!(v.decode_template(&ids).unwrap(), "jump [HOLE]");
    }
}
