// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `generate`, `train` and
// `evaluate`, and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::generate_use_case::GenerateConfig;
use crate::application::train_use_case::TrainConfig;
use crate::domain::schema::ToySchema;

/// The top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a synthetic toy dataset (train/dev/test splits)
    Generate(GenerateArgs),

    /// Train the tree-to-tree model on an XML pair dataset
    Train(TrainArgs),

    /// Score a trained checkpoint on a held-out test split
    Evaluate(EvaluateArgs),
}

/// All arguments for the `generate` command.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Toy schema to generate: reverse (toy0) or rotate (toy1)
    #[arg(short, long, default_value = "reverse")]
    pub schema: ToySchema,

    /// Directory to place <schema>/{train,dev,test} under
    #[arg(long, default_value = "data/training")]
    pub data_dir: String,

    /// Element tag wrapping the text in the reverse schema
    #[arg(short, long, default_value = "toyrev")]
    pub element: String,

    /// Maximum text length / tag-name length
    #[arg(long, default_value_t = 10)]
    pub max_len: usize,

    /// Number of distinct tags the rotate schema draws from
    #[arg(long, default_value_t = 30)]
    pub tag_pool_size: usize,

    /// Number of training samples
    #[arg(long, default_value_t = 10_000)]
    pub train_size: usize,

    /// Number of dev samples
    #[arg(long, default_value_t = 1_000)]
    pub dev_size: usize,

    /// Number of test samples
    #[arg(long, default_value_t = 1_000)]
    pub test_size: usize,

    /// RNG seed — the same seed reproduces the same dataset
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl From<GenerateArgs> for GenerateConfig {
    fn from(a: GenerateArgs) -> Self {
        GenerateConfig {
            schema:        a.schema,
            data_dir:      a.data_dir,
            element:       a.element,
            max_len:       a.max_len,
            tag_pool_size: a.tag_pool_size,
            train_size:    a.train_size,
            dev_size:      a.dev_size,
            test_size:     a.test_size,
            seed:          a.seed,
        }
    }
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory with dataIn_<i>.xml / dataOut_<i>.xml pairs
    #[arg(long, default_value = "data/training/reverse/train")]
    pub train_path: String,

    /// Optional held-out validation directory; without it a
    /// split is carved out of the training pairs
    #[arg(long)]
    pub dev_path: Option<String>,

    /// Experiment directory for vocabularies, config, metrics
    /// and checkpoints
    #[arg(long, default_value = "runs/default")]
    pub experiment_dir: String,

    /// Number of full passes through the training data
    #[arg(long, default_value_t = 400)]
    pub epochs: usize,

    /// Number of samples processed together in one forward pass
    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    /// How fast the model learns — too high causes instability,
    /// too low causes slow convergence
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Probability a training batch is fed the ground-truth
    /// prefix instead of its own predictions
    #[arg(long, default_value_t = 0.5)]
    pub teacher_forcing_ratio: f64,

    /// Fraction kept for training when no --dev-path is given
    #[arg(long, default_value_t = 0.9)]
    pub train_fraction: f64,

    /// Save a checkpoint every N epochs
    #[arg(long, default_value_t = 10)]
    pub checkpoint_every: usize,

    /// Log batch loss every N optimiser steps (0 disables)
    #[arg(long, default_value_t = 50)]
    pub print_every: usize,

    /// RNG seed for the train/validation split and shuffling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Continue from the latest checkpoint in --experiment-dir
    #[arg(long, default_value_t = false)]
    pub resume: bool,

    /// Embedding width of tags and content symbols
    #[arg(long, default_value_t = 32)]
    pub symbol_vec_len: usize,

    /// Width of the per-node content summary vector
    #[arg(long, default_value_t = 96)]
    pub node_text_vec_len: usize,

    /// Width of the information vector propagated through the
    /// tree
    #[arg(long, default_value_t = 64)]
    pub propagated_info_len: usize,

    /// Number of propagation hops — information travels at most
    /// this many edges
    #[arg(long, default_value_t = 12)]
    pub propagator_stack_depth: usize,

    /// Hidden width of the output decoder GRU
    #[arg(long, default_value_t = 32)]
    pub decoder_state_width: usize,

    /// Hard cap on free-running decode length
    #[arg(long, default_value_t = 200)]
    pub max_output_len: usize,

    /// Dropout on node inputs before propagation
    #[arg(long, default_value_t = 0.1)]
    pub input_dropout_p: f64,

    /// Dropout between propagation hops
    #[arg(long, default_value_t = 0.1)]
    pub dropout_p: f64,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// This is the boundary between Layer 1 and Layer 2 —
/// the application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            train_path:     a.train_path,
            dev_path:       a.dev_path,
            experiment_dir: a.experiment_dir,

            epochs:                a.epochs,
            batch_size:            a.batch_size,
            lr:                    a.lr,
            teacher_forcing_ratio: a.teacher_forcing_ratio,
            train_fraction:        a.train_fraction,
            checkpoint_every:      a.checkpoint_every,
            print_every:           a.print_every,
            seed:                  a.seed,
            resume:                a.resume,

            symbol_vec_len:         a.symbol_vec_len,
            node_text_vec_len:      a.node_text_vec_len,
            propagated_info_len:    a.propagated_info_len,
            propagator_stack_depth: a.propagator_stack_depth,
            decoder_state_width:    a.decoder_state_width,
            max_output_len:         a.max_output_len,
            input_dropout_p:        a.input_dropout_p,
            dropout_p:              a.dropout_p,
        }
    }
}

/// All arguments for the `evaluate` command
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Directory with dataIn_<i>.xml / dataOut_<i>.xml test pairs
    #[arg(long, default_value = "data/training/reverse/test")]
    pub test_path: String,

    /// Experiment directory of the trained model
    #[arg(long, default_value = "runs/default")]
    pub experiment_dir: String,

    /// How many per-sample blocks to print before going quiet
    #[arg(long, default_value_t = 20)]
    pub max_printed: usize,
}
