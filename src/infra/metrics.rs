// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training metrics to a CSV file after each epoch.
//
// Metrics recorded per epoch:
//   epoch      — the epoch number (1, 2, 3, ...)
//   train_loss — average cross-entropy on the training set
//   val_loss   — average cross-entropy on the validation set
//   token_acc  — fraction of non-pad output tokens predicted
//                exactly
//   seq_acc    — fraction of validation samples whose whole
//                output sequence matched
//
// Output file: experiment_dir/metrics.csv, append-only so
// resumed runs keep extending the same learning curve.
//
// How to read it: losses should fall; val_loss rising while
// train_loss falls means overfitting; on the toy tasks seq_acc
// reaching 1.0 is the "it works" signal.

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// One row of metrics for a single training epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:      usize,
    pub train_loss: f64,
    pub val_loss:   f64,
    /// Fraction of non-pad tokens predicted exactly, in [0, 1].
    pub token_acc:  f64,
    /// Fraction of whole sequences predicted exactly, in [0, 1].
    pub seq_acc:    f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, val_loss: f64, token_acc: f64, seq_acc: f64) -> Self {
        Self { epoch, train_loss, val_loss, token_acc, seq_acc }
    }

    /// True if this epoch improved on the previous best val_loss.
    pub fn is_improvement(&self, best_val_loss: f64) -> bool {
        self.val_loss < best_val_loss
    }
}

/// Appends epoch metrics to the experiment's CSV file.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet, so
    /// resumed runs append instead of truncating.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = PathBuf::from(dir.into());
        fs::create_dir_all(&dir)?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut file = fs::File::create(&csv_path)?;
            writeln!(file, "epoch,train_loss,val_loss,token_acc,seq_acc")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new CSV row.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.csv_path)?;
        writeln!(
            file,
            "{},{:.6},{:.6},{:.6},{:.6}",
            m.epoch, m.train_loss, m.val_loss, m.token_acc, m.seq_acc,
        )?;
        Ok(())
    }

    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_improvement() {
        let m = EpochMetrics::new(2, 2.5, 2.3, 0.2, 0.1);
        assert!(m.is_improvement(3.0));
        assert!(!m.is_improvement(2.0));
    }

    #[test]
    fn test_appends_rows_across_instances() {
        let dir = std::env::temp_dir()
            .join(format!("hier2hier_metrics_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);

        let logger = MetricsLogger::new(&dir).unwrap();
        logger.log(&EpochMetrics::new(1, 3.0, 3.1, 0.1, 0.0)).unwrap();
        // A second logger on the same dir must append, not truncate.
        let logger = MetricsLogger::new(&dir).unwrap();
        logger.log(&EpochMetrics::new(2, 2.0, 2.1, 0.3, 0.1)).unwrap();

        let text  = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "epoch,train_loss,val_loss,token_acc,seq_acc");
        assert!(lines[2].starts_with("2,"));
    }
}
