// ============================================================
// Layer 4 — Tree Dataset
// ============================================================
// One fully encoded training sample and the burn Dataset
// wrapper around a Vec of them. Everything here is already
// vocabulary ids and selector indices — no strings, no tensors.
// The batcher turns these into padded tensors per mini-batch.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::data::flatten::{flatten, FlatTree};
use crate::domain::xml_tree::{XmlTree, EOS_ID, SOS_ID};
use crate::infra::vocab_store::Vocab;

/// One encoded (input tree, output stream) sample.
/// Node vectors are in decreasing-fanout order; `target_ids`
/// is SOS + serialized output stream + EOS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeSample {
    /// Tag token id per node.
    pub tag_ids: Vec<u32>,

    /// Content symbol ids per node (attributes then text chars).
    pub content_ids: Vec<Vec<u32>>,

    /// Parent selector per node; root selects itself.
    pub parent: Vec<usize>,

    /// Child selectors per node.
    pub children: Vec<Vec<usize>>,

    /// Output token ids: [SOS] stream... [EOS].
    pub target_ids: Vec<u32>,
}

impl TreeSample {
    pub fn node_count(&self) -> usize {
        self.tag_ids.len()
    }

    pub fn max_fanout(&self) -> usize {
        self.children.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn max_content_len(&self) -> usize {
        self.content_ids.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// Encode one tree pair against the experiment vocabularies.
pub fn encode_pair(
    input:        &XmlTree,
    output:       &XmlTree,
    input_vocab:  &Vocab,
    output_vocab: &Vocab,
) -> TreeSample {
    let sample = encode_input(input, input_vocab);

    let mut target_ids = vec![SOS_ID];
    for token in output.serialize_tokens() {
        target_ids.push(output_vocab.token_to_id(&token));
    }
    target_ids.push(EOS_ID);

    TreeSample { target_ids, ..sample }
}

/// Encode just the input side — used at inference time where
/// there is no expected output.
pub fn encode_input(input: &XmlTree, input_vocab: &Vocab) -> TreeSample {
    let flat: FlatTree = flatten(input);
    TreeSample {
        tag_ids:     flat.tags.iter().map(|t| input_vocab.token_to_id(t)).collect(),
        content_ids: flat.contents.iter().map(|c| input_vocab.encode(c)).collect(),
        parent:      flat.parent,
        children:    flat.children,
        target_ids:  vec![SOS_ID, EOS_ID],
    }
}

/// All input-side tokens of a pair corpus, for vocabulary
/// building: tag tokens plus content symbols.
pub fn input_tokens(pairs: &[(XmlTree, XmlTree)]) -> Vec<String> {
    let mut tokens = Vec::new();
    for (input, _) in pairs {
        let flat = flatten(input);
        tokens.extend(flat.tags);
        for content in flat.contents {
            tokens.extend(content);
        }
    }
    tokens
}

/// All output-side tokens of a pair corpus.
pub fn output_tokens(pairs: &[(XmlTree, XmlTree)]) -> Vec<String> {
    pairs
        .iter()
        .flat_map(|(_, output)| output.serialize_tokens())
        .collect()
}

pub struct TreeDataset {
    samples: Vec<TreeSample>,
}

impl TreeDataset {
    pub fn new(samples: Vec<TreeSample>) -> Self {
        Self { samples }
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Longest target sequence in the dataset — the decoder
    /// never needs to unroll further during training.
    pub fn max_target_len(&self) -> usize {
        self.samples.iter().map(|s| s.target_ids.len()).max().unwrap_or(0)
    }
}

impl Dataset<TreeSample> for TreeDataset {
    fn get(&self, index: usize) -> Option<TreeSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::parser::parse_str;
    use crate::domain::xml_tree::{PAD_ID, UNK_ID};
    use crate::infra::vocab_store::VocabStore;

    fn vocabs_for(pairs: &[(XmlTree, XmlTree)], label: &str) -> (Vocab, Vocab) {
        let dir = std::env::temp_dir().join(format!("hier2hier_ds_{label}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let store = VocabStore::new(dir);
        let input  = store.load_or_build("input_vocab", input_tokens(pairs).into_iter()).unwrap();
        let output = store.load_or_build("output_vocab", output_tokens(pairs).into_iter()).unwrap();
        (input, output)
    }

    fn toy_pair() -> (XmlTree, XmlTree) {
        (
            parse_str("<toyrev>ab</toyrev>").unwrap(),
            parse_str("<toyrev>ba</toyrev>").unwrap(),
        )
    }

    #[test]
    fn test_target_wrapped_in_sos_eos() {
        let pairs = vec![toy_pair()];
        let (input_vocab, output_vocab) = vocabs_for(&pairs, "wrap");
        let sample = encode_pair(&pairs[0].0, &pairs[0].1, &input_vocab, &output_vocab);

        assert_eq!(sample.target_ids.first(), Some(&SOS_ID));
        assert_eq!(sample.target_ids.last(), Some(&EOS_ID));
        // <toyrev> b a </toyrev> plus the two specials
        assert_eq!(sample.target_ids.len(), 6);
        // No PAD and no unknowns inside a freshly built vocab.
        assert!(!sample.target_ids.contains(&PAD_ID));
        assert!(!sample.target_ids.contains(&UNK_ID));
    }

    #[test]
    fn test_selectors_survive_encoding() {
        let input = parse_str("<a><b>x</b><c>y</c></a>").unwrap();
        let pairs = vec![(input.clone(), input.clone())];
        let (input_vocab, output_vocab) = vocabs_for(&pairs, "selectors");
        let sample = encode_pair(&pairs[0].0, &pairs[0].1, &input_vocab, &output_vocab);

        assert_eq!(sample.node_count(), 3);
        assert_eq!(sample.max_fanout(), 2);
        for i in 0..sample.node_count() {
            assert!(sample.parent[i] < sample.node_count());
        }
    }

    #[test]
    fn test_dataset_get_and_len() {
        let pairs = vec![toy_pair()];
        let (input_vocab, output_vocab) = vocabs_for(&pairs, "dataset");
        let sample  = encode_pair(&pairs[0].0, &pairs[0].1, &input_vocab, &output_vocab);
        let dataset = TreeDataset::new(vec![sample.clone(), sample]);

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.max_target_len(), 6);
        assert!(dataset.get(0).is_some());
        assert!(dataset.get(2).is_none());
    }
}
