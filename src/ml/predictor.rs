// ============================================================
// Layer 5 — Predictor (Inference)
// ============================================================
// Loads a trained experiment (config + vocabularies + latest
// checkpoint) and serves single-document predictions. Used by
// both the post-training interactive prompt and the evaluate
// command.
//
// Inference runs on the plain Wgpu backend — no autodiff tape
// means less memory and faster forwards.
//
// Reference: Burn Book §6 (Inference)

use anyhow::{Context, Result};
use burn::data::dataloader::batcher::Batcher;

use crate::data::batcher::TreeBatcher;
use crate::data::dataset::encode_input;
use crate::data::parser::{parse_str, tree_to_string};
use crate::domain::traits::{Prediction, TreePredictor};
use crate::domain::xml_tree::{tokens_to_tree, EOS_ID, EOS_TOKEN, SOS_ID};
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::vocab_store::{Vocab, VocabStore};
use crate::ml::model::Hier2HierModel;
use crate::ml::trainer::model_config;

type InferBackend = burn::backend::Wgpu;

pub struct Predictor {
    model:        Hier2HierModel<InferBackend>,
    batcher:      TreeBatcher<InferBackend>,
    input_vocab:  Vocab,
    output_vocab: Vocab,
}

impl Predictor {
    /// Rebuild the trained model from an experiment directory:
    /// config first, then vocabularies, then the latest weights.
    pub fn from_checkpoint(ckpt_manager: &CheckpointManager) -> Result<Self> {
        let config = ckpt_manager
            .load_config()
            .context("Cannot set up the predictor without a training config")?;

        let vocab_store  = VocabStore::new(ckpt_manager.experiment_dir());
        let input_vocab  = vocab_store.load("input_vocab")?;
        let output_vocab = vocab_store.load("output_vocab")?;

        let device = burn::backend::wgpu::WgpuDevice::default();
        let model  = model_config(&config, input_vocab.len(), output_vocab.len()).init(&device);
        let model  = ckpt_manager.load_model(model, &device)?;

        Ok(Self {
            model,
            batcher: TreeBatcher::new(device),
            input_vocab,
            output_vocab,
        })
    }
}

impl TreePredictor for Predictor {
    fn predict(&self, xml: &str) -> Result<Prediction> {
        let tree   = parse_str(xml)?;
        let sample = encode_input(&tree, &self.input_vocab);
        let batch  = self.batcher.batch(vec![sample]);

        // Single-sample batch, so exactly one decoded sequence.
        let decoded = self.model.predict(&batch, SOS_ID, EOS_ID)?;
        let ids     = decoded.into_iter().next().unwrap_or_default();
        let tokens  = self.output_vocab.decode(&ids);

        let token_stream = {
            let mut parts = tokens.clone();
            parts.push(EOS_TOKEN.to_string());
            parts.join(" ")
        };
        let predicted_xml = tokens_to_tree(&tokens).map(|t| tree_to_string(&t));

        Ok(Prediction { token_stream, xml: predicted_xml })
    }
}
