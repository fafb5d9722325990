// ============================================================
// Layer 2 — Evaluate Use Case
// ============================================================
// Runs a trained model over a held-out test split and prints a
// human-readable block per sample:
//
//   Tree Input:       <toyrev>13579</toyrev>
//   Predicted Output: 9 7 5 3 1 [EOS]
//   Expected Output:  9 7 5 3 1 [EOS]
//
// plus exact-match accuracy at the end. Predictions go through
// the same TreePredictor trait the interactive prompt uses, so
// what you see here is exactly what you'd get at the prompt.

use anyhow::{bail, Result};

use crate::data::loader::XmlPairLoader;
use crate::data::parser::tree_to_string;
use crate::domain::traits::{SampleSource, TreePredictor};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::predictor::Predictor;

pub struct EvaluateUseCase {
    test_path:      String,
    experiment_dir: String,
    /// Print at most this many sample blocks; accuracy always
    /// covers the whole split.
    max_printed: usize,
}

impl EvaluateUseCase {
    pub fn new(test_path: String, experiment_dir: String, max_printed: usize) -> Self {
        Self { test_path, experiment_dir, max_printed }
    }

    pub fn execute(&self) -> Result<()> {
        let pairs = XmlPairLoader::new(&self.test_path).load_all()?;
        if pairs.is_empty() {
            bail!("No test pairs found in '{}'", self.test_path);
        }

        let ckpt_manager = CheckpointManager::new(&self.experiment_dir);
        let predictor    = Predictor::from_checkpoint(&ckpt_manager)?;

        self.run_with(&predictor, &pairs)
    }

    fn run_with(
        &self,
        predictor: &dyn TreePredictor,
        pairs:     &[(crate::domain::xml_tree::XmlTree, crate::domain::xml_tree::XmlTree)],
    ) -> Result<()> {
        let mut exact = 0usize;

        for (index, (input, expected)) in pairs.iter().enumerate() {
            let input_xml  = tree_to_string(input);
            let prediction = predictor.predict(&input_xml)?;
            let expected_stream = expected.serialize_tokens().join(" ");

            let matched = prediction
                .xml
                .as_deref()
                .map(|xml| xml == tree_to_string(expected))
                .unwrap_or(false);
            if matched {
                exact += 1;
            }

            if index < self.max_printed {
                println!("Tree Input:       {input_xml}");
                println!("Predicted Output: {}", prediction.token_stream);
                println!("Expected Output:  {expected_stream} [EOS]");
                println!();
            }
        }

        println!(
            "Exact match: {}/{} ({:.1}%)",
            exact,
            pairs.len(),
            100.0 * exact as f64 / pairs.len() as f64,
        );
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::parser::parse_str;
    use crate::domain::traits::Prediction;

    /// Echoes the input back — a "perfect" model for the
    /// identity task.
    struct EchoPredictor;

    impl TreePredictor for EchoPredictor {
        fn predict(&self, xml: &str) -> Result<Prediction> {
            let tree = parse_str(xml)?;
            Ok(Prediction {
                token_stream: format!("{} [EOS]", tree.serialize_tokens().join(" ")),
                xml: Some(tree_to_string(&tree)),
            })
        }
    }

    #[test]
    fn test_echo_predictor_scores_perfectly_on_identity() {
        let tree  = parse_str("<a>hi</a>").unwrap();
        let pairs = vec![(tree.clone(), tree)];
        let use_case = EvaluateUseCase::new(
            "unused".to_string(),
            "unused".to_string(),
            5,
        );
        use_case.run_with(&EchoPredictor, &pairs).unwrap();
    }
}
