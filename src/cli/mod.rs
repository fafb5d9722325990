// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `generate` — writes a synthetic toy dataset to disk
//   2. `train`    — trains the model, then opens an interactive
//                   prompt against the trained checkpoint
//   3. `evaluate` — scores the latest checkpoint on a test split
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

// Declare the commands submodule
pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, GenerateArgs, TrainArgs};

/// The main CLI struct — clap reads the fields and generates
/// argument parsing code automatically via the Parser derive macro.
#[derive(Parser, Debug)]
#[command(
    name = "hier2hier",
    version = "0.1.0",
    about = "Train a hierarchical tree-to-tree model on XML pairs, then predict interactively."
)]
pub struct Cli {
    /// The subcommand to run (generate, train or evaluate)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    /// This keeps the CLI layer thin — it only routes, never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Generate(args) => Self::run_generate(args),
            Commands::Train(args)    => Self::run_train(args),
            Commands::Evaluate(args) => Self::run_evaluate(args),
        }
    }

    /// Handles the `generate` subcommand.
    fn run_generate(args: GenerateArgs) -> Result<()> {
        use crate::application::generate_use_case::GenerateUseCase;

        tracing::info!("Generating '{}' dataset under: {}", args.schema, args.data_dir);

        let use_case = GenerateUseCase::new(args.into());
        use_case.execute()?;

        println!("Dataset generation complete.");
        Ok(())
    }

    /// Handles the `train` subcommand.
    /// Converts CLI args into a TrainConfig and hands off to Layer 2.
    fn run_train(args: TrainArgs) -> Result<()> {
        use crate::application::train_use_case::TrainUseCase;

        tracing::info!("Starting training on pairs in: {}", args.train_path);

        // Convert CLI args → application config (separates presentation from domain)
        let use_case = TrainUseCase::new(args.into());
        use_case.execute()?;

        println!("Training session finished.");
        Ok(())
    }

    /// Handles the `evaluate` subcommand.
    fn run_evaluate(args: EvaluateArgs) -> Result<()> {
        use crate::application::evaluate_use_case::EvaluateUseCase;

        let use_case = EvaluateUseCase::new(
            args.test_path.clone(),
            args.experiment_dir.clone(),
            args.max_printed,
        );
        use_case.execute()
    }
}
