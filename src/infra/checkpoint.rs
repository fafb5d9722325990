// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Owns the on-disk layout of one experiment:
//
//   experiment_dir/
//     input_vocab.json         (written by VocabStore)
//     output_vocab.json
//     train_config.json        (model architecture + hyperparams)
//     metrics.csv              (written by MetricsLogger)
//     checkpoints/
//       latest.json            (epoch/step of the newest checkpoint)
//       Chk<epoch>.<step>/
//         encoder.mpk.gz       (tree-encoder weights)
//         decoder.mpk.gz       (output-decoder weights)
//         model_checkpoint.json (manifest: epoch, step, schema version)
//
// Why save the config separately? The predictor must rebuild
// the exact architecture before weights can be loaded into it;
// config + vocab files make a checkpoint self-describing.
//
// Burn's CompactRecorder serialises parameters to MessagePack,
// gzip-compressed, and refuses to load into a mismatched
// architecture.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::Hier2HierModel;

/// Bumped when the checkpoint layout or model record shape
/// changes incompatibly.
pub const CUR_SCHEMA_VERSION: u32 = 1;

/// Manifest written next to the weights of each checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointManifest {
    pub epoch:          usize,
    pub step:           usize,
    pub schema_version: u32,
}

/// Pointer to the newest checkpoint of an experiment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LatestPointer {
    pub epoch: usize,
    pub step:  usize,
}

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a manager rooted at the experiment directory,
    /// creating it (and `checkpoints/`) if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = PathBuf::from(dir.into());
        fs::create_dir_all(dir.join("checkpoints")).ok();
        Self { dir }
    }

    pub fn experiment_dir(&self) -> &PathBuf {
        &self.dir
    }

    fn checkpoint_dir(&self, epoch: usize, step: usize) -> PathBuf {
        self.dir.join("checkpoints").join(format!("Chk{epoch}.{step}"))
    }

    /// Save encoder and decoder weights plus the manifest, then
    /// advance the latest pointer.
    pub fn save_model<B: AutodiffBackend>(
        &self,
        model: &Hier2HierModel<B>,
        epoch: usize,
        step:  usize,
    ) -> Result<()> {
        let dir = self.checkpoint_dir(epoch, step);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", dir.display()))?;

        let recorder = CompactRecorder::new();
        recorder
            .record(model.encoder.clone().into_record(), dir.join("encoder"))
            .with_context(|| format!("Failed to save encoder to '{}'", dir.display()))?;
        recorder
            .record(model.decoder.clone().into_record(), dir.join("decoder"))
            .with_context(|| format!("Failed to save decoder to '{}'", dir.display()))?;

        let manifest = CheckpointManifest { epoch, step, schema_version: CUR_SCHEMA_VERSION };
        fs::write(
            dir.join("model_checkpoint.json"),
            serde_json::to_string_pretty(&manifest)?,
        )
        .with_context(|| "Failed to write model_checkpoint.json")?;

        let pointer = LatestPointer { epoch, step };
        fs::write(
            self.dir.join("checkpoints").join("latest.json"),
            serde_json::to_string(&pointer)?,
        )
        .with_context(|| "Failed to write latest.json")?;

        tracing::debug!("Saved checkpoint Chk{}.{}", epoch, step);
        Ok(())
    }

    /// Load weights from the latest checkpoint into a freshly
    /// built model of the matching architecture.
    pub fn load_model<B: Backend>(
        &self,
        model:  Hier2HierModel<B>,
        device: &B::Device,
    ) -> Result<Hier2HierModel<B>> {
        let pointer = self.latest()?.context(
            "No checkpoint found. Have you trained the model first?",
        )?;
        let dir = self.checkpoint_dir(pointer.epoch, pointer.step);
        tracing::info!("Loading checkpoint Chk{}.{}", pointer.epoch, pointer.step);

        let recorder = CompactRecorder::new();
        let encoder_record = recorder
            .load(dir.join("encoder"), device)
            .with_context(|| format!("Cannot load encoder from '{}'", dir.display()))?;
        let decoder_record = recorder
            .load(dir.join("decoder"), device)
            .with_context(|| format!("Cannot load decoder from '{}'", dir.display()))?;

        Ok(Hier2HierModel {
            encoder: model.encoder.load_record(encoder_record),
            decoder: model.decoder.load_record(decoder_record),
        })
    }

    /// The newest checkpoint, or None for a fresh experiment.
    pub fn latest(&self) -> Result<Option<LatestPointer>> {
        let path = self.dir.join("checkpoints").join("latest.json");
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// Save the training configuration. Must happen before the
    /// first checkpoint so inference can always rebuild the
    /// model.
    pub fn save_config(&self, config: &TrainConfig) -> Result<()> {
        let path = self.dir.join("train_config.json");
        fs::write(&path, serde_json::to_string_pretty(config)?)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join("train_config.json");
        let text = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Make sure you have run 'train' before this.",
                path.display()
            )
        })?;
        Ok(serde_json::from_str(&text)?)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_is_none_for_fresh_experiment() {
        let dir = std::env::temp_dir()
            .join(format!("hier2hier_ckpt_fresh_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        let manager = CheckpointManager::new(&dir);
        assert!(manager.latest().unwrap().is_none());
    }

    #[test]
    fn test_config_round_trip() {
        let dir = std::env::temp_dir()
            .join(format!("hier2hier_ckpt_cfg_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        let manager = CheckpointManager::new(&dir);

        let config = TrainConfig::default();
        manager.save_config(&config).unwrap();
        let loaded = manager.load_config().unwrap();
        assert_eq!(loaded.epochs, config.epochs);
        assert_eq!(loaded.propagated_info_len, config.propagated_info_len);
    }
}
