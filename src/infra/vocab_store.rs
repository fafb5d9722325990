// ============================================================
// Layer 6 — Vocabulary Store
// ============================================================
// Manages the two vocabularies of a hier2hier experiment:
//
//   input_vocab.json  — tag tokens and node content symbols
//                       seen on the input side
//   output_vocab.json — tokens of the serialized output stream
//
// Both are word-level vocabularies written directly as
// HuggingFace tokenizer JSON and loaded back through the
// tokenizers crate. Building the JSON by hand sidesteps the
// Trainer::Model type mismatch in tokenizers 0.15 — same
// approach as training a tokenizer, minus the merge rules we
// never need for a closed symbol set.
//
// Special ids are fixed: PAD=0, UNK=1, SOS=2, EOS=3. PAD must
// stay at 0 because the loss masks pad positions by id.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tokenizers::Tokenizer;

use crate::domain::xml_tree::{
    EOS_ID, EOS_TOKEN, PAD_ID, PAD_TOKEN, SOS_ID, SOS_TOKEN, UNK_ID, UNK_TOKEN,
};

/// A loaded vocabulary — thin wrapper over a word-level
/// tokenizer providing the two lookups the pipeline needs.
pub struct Vocab {
    tokenizer: Tokenizer,
    size:      usize,
}

impl Vocab {
    pub fn token_to_id(&self, token: &str) -> u32 {
        self.tokenizer.token_to_id(token).unwrap_or(UNK_ID)
    }

    pub fn id_to_token(&self, id: u32) -> String {
        self.tokenizer
            .id_to_token(id)
            .unwrap_or_else(|| UNK_TOKEN.to_string())
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Map a token slice to ids, unknowns included.
    pub fn encode(&self, tokens: &[String]) -> Vec<u32> {
        tokens.iter().map(|t| self.token_to_id(t)).collect()
    }

    /// Map ids back to tokens.
    pub fn decode(&self, ids: &[u32]) -> Vec<String> {
        ids.iter().map(|&id| self.id_to_token(id)).collect()
    }
}

pub struct VocabStore {
    dir: PathBuf,
}

impl VocabStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Load `<name>.json` if present, otherwise build it from
    /// the given token universe and save it. Training and
    /// inference must see the same ids, so once built the file
    /// is authoritative.
    pub fn load_or_build<I>(&self, name: &str, tokens: I) -> Result<Vocab>
    where
        I: IntoIterator<Item = String>,
    {
        let path = self.dir.join(format!("{name}.json"));
        if path.exists() {
            tracing::info!("Loading existing vocabulary '{}'", path.display());
            self.load(name)
        } else {
            self.build_and_save(name, tokens)
        }
    }

    /// Load a previously saved vocabulary.
    pub fn load(&self, name: &str) -> Result<Vocab> {
        let path = self.dir.join(format!("{name}.json"));
        let tokenizer = Tokenizer::from_file(&path).map_err(|e| {
            anyhow::anyhow!("Cannot load vocabulary from '{}': {}", path.display(), e)
        })?;
        let size = tokenizer.get_vocab_size(true);
        Ok(Vocab { tokenizer, size })
    }

    fn build_and_save<I>(&self, name: &str, tokens: I) -> Result<Vocab>
    where
        I: IntoIterator<Item = String>,
    {
        std::fs::create_dir_all(&self.dir).ok();

        // ── Step 1: collect the token universe ────────────────────────────────
        // BTreeMap gives deterministic id assignment — the same
        // corpus always yields the same vocabulary file.
        let mut seen: BTreeMap<String, ()> = BTreeMap::new();
        for token in tokens {
            if !token.is_empty() {
                seen.entry(token).or_insert(());
            }
        }

        // ── Step 2: assign ids after the fixed specials ───────────────────────
        let mut vocab = serde_json::json!({
            PAD_TOKEN: PAD_ID,
            UNK_TOKEN: UNK_ID,
            SOS_TOKEN: SOS_ID,
            EOS_TOKEN: EOS_ID,
        });
        let mut next_id = 4u32;
        for token in seen.keys() {
            if vocab.get(token).is_none() {
                vocab[token] = serde_json::json!(next_id);
                next_id += 1;
            }
        }

        // ── Step 3: write tokenizer JSON in HuggingFace format ────────────────
        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [
                {"id": PAD_ID, "content": PAD_TOKEN, "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": UNK_ID, "content": UNK_TOKEN, "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": SOS_ID, "content": SOS_TOKEN, "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true},
                {"id": EOS_ID, "content": EOS_TOKEN, "single_word": false, "lstrip": false, "rstrip": false, "normalized": false, "special": true}
            ],
            "normalizer": null,
            "pre_tokenizer": {
                "type": "Whitespace"
            },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": UNK_TOKEN
            }
        });

        let path = self.dir.join(format!("{name}.json"));
        std::fs::write(&path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| format!("Cannot write vocabulary '{}'", path.display()))?;

        tracing::info!(
            "Vocabulary '{}' built with {} tokens, saved to '{}'",
            name,
            next_id,
            path.display()
        );

        self.load(name)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(label: &str) -> VocabStore {
        let dir = std::env::temp_dir().join(format!("hier2hier_vocab_{label}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        VocabStore::new(dir)
    }

    #[test]
    fn test_build_assigns_stable_ids() {
        let store = temp_store("stable");
        let tokens = ["<a>", "x", "<a>", "y"].iter().map(|s| s.to_string());
        let vocab  = store.load_or_build("input_vocab", tokens).unwrap();

        assert_eq!(vocab.token_to_id(PAD_TOKEN), PAD_ID);
        assert_eq!(vocab.token_to_id(SOS_TOKEN), SOS_ID);
        assert_eq!(vocab.token_to_id(EOS_TOKEN), EOS_ID);
        // BTreeMap order: "<a>" < "x" < "y"
        assert_eq!(vocab.token_to_id("<a>"), 4);
        assert_eq!(vocab.token_to_id("x"), 5);
        assert_eq!(vocab.token_to_id("y"), 6);
        assert_eq!(vocab.len(), 7);
    }

    #[test]
    fn test_unknown_maps_to_unk() {
        let store = temp_store("unk");
        let vocab = store
            .load_or_build("output_vocab", ["q".to_string()].into_iter())
            .unwrap();
        assert_eq!(vocab.token_to_id("never-seen"), UNK_ID);
        assert_eq!(vocab.id_to_token(999), UNK_TOKEN);
    }

    #[test]
    fn test_reload_preserves_ids() {
        let store = temp_store("reload");
        let tokens: Vec<String> = ["m", "n"].iter().map(|s| s.to_string()).collect();
        let first  = store.load_or_build("input_vocab", tokens.clone().into_iter()).unwrap();
        // Second call must load the saved file, even with a
        // different (empty) corpus.
        let second = store.load_or_build("input_vocab", Vec::new().into_iter()).unwrap();
        assert_eq!(first.token_to_id("m"), second.token_to_id("m"));
        assert_eq!(first.len(), second.len());
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let store = temp_store("roundtrip");
        let vocab = store
            .load_or_build("output_vocab", ["a".to_string(), "b".to_string()].into_iter())
            .unwrap();
        let tokens: Vec<String> = ["a", "b", "a"].iter().map(|s| s.to_string()).collect();
        let ids = vocab.encode(&tokens);
        assert_eq!(vocab.decode(&ids), tokens);
    }
}
