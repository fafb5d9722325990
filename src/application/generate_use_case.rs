// ============================================================
// Layer 2 — Generate Use Case
// ============================================================
// Wraps the toy dataset generator: one invocation produces the
// train/dev/test splits for a schema under
// data_dir/<schema>/{train,dev,test}.
//
// Split sizes follow the reference benchmark: a large training
// split and smaller held-out dev/test splits.

use std::path::PathBuf;

use anyhow::Result;

use crate::data::generator::{GeneratorConfig, ToyGenerator};
use crate::domain::schema::ToySchema;

#[derive(Debug, Clone)]
pub struct GenerateConfig {
    pub schema:        ToySchema,
    pub data_dir:      String,
    pub element:       String,
    pub max_len:       usize,
    pub tag_pool_size: usize,
    pub train_size:    usize,
    pub dev_size:      usize,
    pub test_size:     usize,
    pub seed:          u64,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            schema:        ToySchema::Reverse,
            data_dir:      "data/training".to_string(),
            element:       "toyrev".to_string(),
            max_len:       10,
            tag_pool_size: 30,
            train_size:    10_000,
            dev_size:      1_000,
            test_size:     1_000,
            seed:          42,
        }
    }
}

pub struct GenerateUseCase {
    config: GenerateConfig,
}

impl GenerateUseCase {
    pub fn new(config: GenerateConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<()> {
        let cfg  = &self.config;
        let root = PathBuf::from(&cfg.data_dir).join(cfg.schema.to_string());

        let mut generator = ToyGenerator::new(GeneratorConfig {
            schema:        cfg.schema,
            element:       cfg.element.clone(),
            max_len:       cfg.max_len,
            tag_pool_size: cfg.tag_pool_size,
            seed:          cfg.seed,
        })?;

        for (name, size) in [
            ("train", cfg.train_size),
            ("dev",   cfg.dev_size),
            ("test",  cfg.test_size),
        ] {
            let dir = generator.generate_split(&root, name, size)?;
            println!("Wrote {size} samples to {}", dir.display());
        }

        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::XmlPairLoader;
    use crate::domain::traits::SampleSource;

    #[test]
    fn test_generates_all_three_splits() {
        let dir = std::env::temp_dir()
            .join(format!("hier2hier_gen_uc_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);

        let config = GenerateConfig {
            data_dir:   dir.display().to_string(),
            train_size: 4,
            dev_size:   2,
            test_size:  2,
            ..GenerateConfig::default()
        };
        GenerateUseCase::new(config).execute().unwrap();

        let base = dir.join("reverse");
        for (name, size) in [("train", 4), ("dev", 2), ("test", 2)] {
            let pairs = XmlPairLoader::new(base.join(name)).load_all().unwrap();
            assert_eq!(pairs.len(), size, "split {name}");
        }
    }
}
