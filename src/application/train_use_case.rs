// ============================================================
// Layer 2 — Train Use Case
// ============================================================
// Orchestrates a full training run end to end:
//
//   1. Load (input, expected output) XML pairs from disk
//   2. Build or reload the input/output vocabularies
//   3. Encode every pair into selector/id form
//   4. Split off a validation set (unless a dev dir is given)
//   5. Persist the config, then hand off to the training loop
//   6. Drop into an interactive prompt against the trained model
//
// The use case owns all the wiring; the ml layer only ever sees
// datasets and a checkpoint manager.
//
// Reference: Rust Book §12 (An I/O Project)

use std::io::{self, BufRead, Write};

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::data::dataset::{encode_pair, input_tokens, output_tokens, TreeDataset};
use crate::data::loader::XmlPairLoader;
use crate::data::splitter::split_train_val;
use crate::domain::traits::{SampleSource, TreePredictor};
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::vocab_store::VocabStore;
use crate::ml::predictor::Predictor;
use crate::ml::trainer::run_training;

// ─── TrainConfig ──────────────────────────────────────────────────────────────
/// Everything a training run needs, persisted as
/// train_config.json so inference can rebuild the architecture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Directory with dataIn_<i>.xml / dataOut_<i>.xml pairs.
    pub train_path: String,

    /// Optional held-out directory; when absent, a validation
    /// split is carved out of the training pairs.
    pub dev_path: Option<String>,

    /// Where vocabularies, config, metrics and checkpoints live.
    pub experiment_dir: String,

    // ─── Optimisation ─────────────────────────────────────────
    pub epochs:                usize,
    pub batch_size:            usize,
    pub lr:                    f64,
    pub teacher_forcing_ratio: f64,
    pub train_fraction:        f64,
    pub checkpoint_every:      usize,
    pub print_every:           usize,
    pub seed:                  Option<u64>,
    pub resume:                bool,

    // ─── Architecture ─────────────────────────────────────────
    pub symbol_vec_len:         usize,
    pub node_text_vec_len:      usize,
    pub propagated_info_len:    usize,
    pub propagator_stack_depth: usize,
    pub decoder_state_width:    usize,
    pub max_output_len:         usize,
    pub input_dropout_p:        f64,
    pub dropout_p:              f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            train_path:     "data/training/train".to_string(),
            dev_path:       None,
            experiment_dir: "runs/default".to_string(),

            epochs:                400,
            batch_size:            64,
            lr:                    1e-3,
            teacher_forcing_ratio: 0.5,
            train_fraction:        0.9,
            checkpoint_every:      10,
            print_every:           50,
            seed:                  None,
            resume:                false,

            symbol_vec_len:         32,
            node_text_vec_len:      96,
            propagated_info_len:    64,
            propagator_stack_depth: 12,
            decoder_state_width:    32,
            max_output_len:         200,
            input_dropout_p:        0.1,
            dropout_p:              0.1,
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<()> {
        let cfg = &self.config;

        // ── Step 1: load tree pairs ───────────────────────────────────────────
        let train_pairs = XmlPairLoader::new(&cfg.train_path).load_all()?;
        if train_pairs.is_empty() {
            bail!(
                "No training pairs found in '{}'. Run 'generate' first, or point --train-path at a dataset.",
                cfg.train_path
            );
        }
        tracing::info!("Loaded {} training pairs from '{}'", train_pairs.len(), cfg.train_path);

        let (train_pairs, val_pairs) = match &cfg.dev_path {
            Some(dev_path) => {
                let dev = XmlPairLoader::new(dev_path).load_all()?;
                if dev.is_empty() {
                    bail!("Dev directory '{}' contains no pairs", dev_path);
                }
                tracing::info!("Loaded {} validation pairs from '{}'", dev.len(), dev_path);
                (train_pairs, dev)
            }
            None => {
                let (train, val) = split_train_val(train_pairs, cfg.train_fraction, cfg.seed);
                tracing::info!("Split into {} train / {} validation pairs", train.len(), val.len());
                (train, val)
            }
        };

        // ── Step 2: vocabularies ──────────────────────────────────────────────
        // Built from the training side only; the validation set
        // may contain unknowns and that's fine.
        let vocab_store  = VocabStore::new(&cfg.experiment_dir);
        let input_vocab  = vocab_store.load_or_build("input_vocab", input_tokens(&train_pairs))?;
        let output_vocab = vocab_store.load_or_build("output_vocab", output_tokens(&train_pairs))?;
        tracing::info!(
            "Vocabularies ready: {} input tokens, {} output tokens",
            input_vocab.len(),
            output_vocab.len()
        );

        // ── Step 3: encode into datasets ──────────────────────────────────────
        let train_dataset = TreeDataset::new(
            train_pairs
                .iter()
                .map(|(i, o)| encode_pair(i, o, &input_vocab, &output_vocab))
                .collect(),
        );
        let val_dataset = TreeDataset::new(
            val_pairs
                .iter()
                .map(|(i, o)| encode_pair(i, o, &input_vocab, &output_vocab))
                .collect(),
        );

        let longest = train_dataset.max_target_len().max(val_dataset.max_target_len());
        if longest > cfg.max_output_len {
            tracing::warn!(
                "Longest target ({} tokens) exceeds max_output_len ({}); free-running decode will truncate",
                longest,
                cfg.max_output_len
            );
        }

        // ── Step 4: persist config, then train ────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.experiment_dir);
        ckpt_manager.save_config(cfg)?;

        run_training(
            cfg,
            train_dataset,
            val_dataset,
            input_vocab.len(),
            output_vocab.len(),
            &ckpt_manager,
        )?;

        // ── Step 5: interactive predictions ───────────────────────────────────
        let predictor = Predictor::from_checkpoint(&ckpt_manager)?;
        run_prompt_loop(&predictor)
    }
}

/// Read XML documents from stdin and print the model's output
/// for each, until a blank line or EOF.
fn run_prompt_loop(predictor: &dyn TreePredictor) -> Result<()> {
    println!();
    println!("Interactive mode. Paste an XML document and press Enter.");
    println!("A blank line quits.");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let line = line.trim();
        if line.is_empty() {
            break;
        }

        match predictor.predict(line) {
            Ok(prediction) => {
                println!("Predicted stream: {}", prediction.token_stream);
                match prediction.xml {
                    Some(xml) => println!("Predicted XML:    {xml}"),
                    None => println!("(stream does not form a well-formed tree)"),
                }
            }
            Err(e) => println!("Could not predict: {e}"),
        }
    }
    println!("Bye!");
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_reference_hyperparams() {
        let cfg = TrainConfig::default();
        assert_eq!(cfg.propagated_info_len, 64);
        assert_eq!(cfg.propagator_stack_depth, 12);
        assert_eq!(cfg.node_text_vec_len, 96);
        assert_eq!(cfg.decoder_state_width, 32);
        assert!((cfg.teacher_forcing_ratio - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_config_json_round_trip() {
        let cfg  = TrainConfig { epochs: 7, resume: true, ..TrainConfig::default() };
        let text = serde_json::to_string(&cfg).unwrap();
        let back: TrainConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back.epochs, 7);
        assert!(back.resume);
    }

    #[test]
    fn test_execute_fails_cleanly_without_data() {
        let dir = std::env::temp_dir()
            .join(format!("hier2hier_train_nodata_{}", std::process::id()));
        let cfg = TrainConfig {
            train_path: dir.join("missing").display().to_string(),
            experiment_dir: dir.join("exp").display().to_string(),
            ..TrainConfig::default()
        };
        let err = TrainUseCase::new(cfg).execute().unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
