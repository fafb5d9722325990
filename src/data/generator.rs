// ============================================================
// Layer 4 — Toy Dataset Generator
// ============================================================
// Generates the synthetic benchmark datasets used to smoke-test
// the training pipeline. For every sample the generator draws a
// random input tree from the schema, applies the schema's
// deterministic transform, and writes both trees to disk:
//
//   data_dir/<schema>/
//     train/   dataIn_0.xml dataOut_0.xml ... data.txt
//     dev/     ...
//     test/    ...
//
// data.txt mirrors each pair as tab-separated token streams —
// handy for eyeballing what the model is actually asked to
// learn; training itself reads the XML files.
//
// The RNG is an explicitly seeded StdRng: the same seed must
// produce byte-identical datasets.
//
// Reference: rand crate documentation
//            Rust Book §12 (I/O)

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::data::parser;
use crate::domain::schema::ToySchema;
use crate::domain::xml_tree::{XmlNode, XmlTree};

// Characters text content is drawn from.
const TEXT_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

// Characters tag names are drawn from (tags must start with a
// letter, so the pool uses lowercase only).
const TAG_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Configuration for one generation run.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub schema:        ToySchema,
    /// Element tag used by the reverse schema (`toy.sh -e`).
    pub element:       String,
    /// Maximum text length / tag-name length.
    pub max_len:       usize,
    /// Number of distinct tags the rotate schema draws from.
    pub tag_pool_size: usize,
    pub seed:          u64,
}

#[derive(Debug)]
pub struct ToyGenerator {
    config:   GeneratorConfig,
    rng:      StdRng,
    tag_pool: Vec<String>,
}

impl ToyGenerator {
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        if config.max_len == 0 {
            bail!("max_len must be at least 1 (got 0)");
        }
        if config.schema == ToySchema::Rotate && config.tag_pool_size == 0 {
            bail!("tag_pool_size must be at least 1 for the rotate schema (got 0)");
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        // The tag pool is shared across all splits so dev/test
        // tags are never out-of-vocabulary surprises.
        let tag_pool = (0..config.tag_pool_size)
            .map(|_| random_word(&mut rng, TAG_ALPHABET, config.max_len))
            .collect();
        Ok(Self { config, rng, tag_pool })
    }

    /// Generate one split (train/dev/test) of `size` samples
    /// under `root/<name>/`.
    pub fn generate_split(&mut self, root: &Path, name: &str, size: usize) -> Result<PathBuf> {
        let dir = root.join(name);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;

        let data_path = dir.join("data.txt");
        let mut data_file = fs::File::create(&data_path)
            .with_context(|| format!("Cannot create '{}'", data_path.display()))?;

        for index in 0..size {
            let input  = self.sample_input();
            let output = self.config.schema.transform(&input)?;

            fs::write(dir.join(format!("dataIn_{index}.xml")), parser::tree_to_string(&input))?;
            fs::write(dir.join(format!("dataOut_{index}.xml")), parser::tree_to_string(&output))?;

            writeln!(
                data_file,
                "{}\t{}",
                input.serialize_tokens().join(" "),
                output.serialize_tokens().join(" "),
            )?;
        }

        tracing::info!("Generated {} samples in '{}'", size, dir.display());
        Ok(dir)
    }

    /// Draw one random input tree for the configured schema.
    fn sample_input(&mut self) -> XmlTree {
        match self.config.schema {
            ToySchema::Reverse => {
                // One element wrapping a random string.
                let len  = self.rng.gen_range(1..=self.config.max_len);
                let text: String = (0..len)
                    .map(|_| TEXT_ALPHABET[self.rng.gen_range(0..TEXT_ALPHABET.len())] as char)
                    .collect();
                XmlTree::new(XmlNode::with_text(&self.config.element, text))
            }
            ToySchema::Rotate => {
                // Root with a single child, both tags from the pool.
                let tag1 = self.tag_pool[self.rng.gen_range(0..self.tag_pool.len())].clone();
                let tag2 = self.tag_pool[self.rng.gen_range(0..self.tag_pool.len())].clone();
                let mut root = XmlNode::new(tag1);
                root.children.push(XmlNode::new(tag2));
                XmlTree::new(root)
            }
        }
    }
}

fn random_word(rng: &mut StdRng, alphabet: &[u8], max_len: usize) -> String {
    let len = rng.gen_range(1..=max_len.max(1));
    (0..len)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::traits::SampleSource;

    fn temp_root(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("hier2hier_gen_{label}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn reverse_config(seed: u64) -> GeneratorConfig {
        GeneratorConfig {
            schema:        ToySchema::Reverse,
            element:       "toyrev".to_string(),
            max_len:       10,
            tag_pool_size: 30,
            seed,
        }
    }

    #[test]
    fn test_outputs_are_the_transform_of_inputs() {
        let root = temp_root("transform");
        let dir  = ToyGenerator::new(reverse_config(7))
            .unwrap()
            .generate_split(&root, "train", 20)
            .unwrap();

        let pairs = crate::data::loader::XmlPairLoader::new(dir).load_all().unwrap();
        assert_eq!(pairs.len(), 20);
        for (input, output) in &pairs {
            let expected = ToySchema::Reverse.transform(input).unwrap();
            assert_eq!(output, &expected);
        }
    }

    #[test]
    fn test_same_seed_same_dataset() {
        let root_a = temp_root("seed_a");
        let root_b = temp_root("seed_b");
        ToyGenerator::new(reverse_config(42)).unwrap().generate_split(&root_a, "dev", 5).unwrap();
        ToyGenerator::new(reverse_config(42)).unwrap().generate_split(&root_b, "dev", 5).unwrap();

        for i in 0..5 {
            let a = fs::read_to_string(root_a.join("dev").join(format!("dataIn_{i}.xml"))).unwrap();
            let b = fs::read_to_string(root_b.join("dev").join(format!("dataIn_{i}.xml"))).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_rotate_samples_have_one_child() {
        let root = temp_root("rotate");
        let config = GeneratorConfig {
            schema:        ToySchema::Rotate,
            element:       "unused".to_string(),
            max_len:       6,
            tag_pool_size: 4,
            seed:          1,
        };
        let dir   = ToyGenerator::new(config).unwrap().generate_split(&root, "test", 10).unwrap();
        let pairs = crate::data::loader::XmlPairLoader::new(dir).load_all().unwrap();
        for (input, output) in &pairs {
            assert_eq!(input.root.children.len(), 1);
            assert_eq!(output.root.children.len(), 1);
            assert_eq!(output.root.tag, input.root.children[0].tag);
        }
    }

    #[test]
    fn test_rejects_zero_max_len() {
        let mut config = reverse_config(1);
        config.max_len = 0;
        let err = ToyGenerator::new(config).unwrap_err();
        assert!(err.to_string().contains("max_len"));
    }

    #[test]
    fn test_rotate_rejects_empty_tag_pool() {
        let config = GeneratorConfig {
            schema:        ToySchema::Rotate,
            element:       "unused".to_string(),
            max_len:       4,
            tag_pool_size: 0,
            seed:          1,
        };
        let err = ToyGenerator::new(config).unwrap_err();
        assert!(err.to_string().contains("tag_pool_size"));
    }

    #[test]
    fn test_data_txt_mirrors_samples() {
        let root = temp_root("datatxt");
        let dir  = ToyGenerator::new(reverse_config(3)).unwrap().generate_split(&root, "train", 3).unwrap();
        let text = fs::read_to_string(dir.join("data.txt")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        for line in lines {
            let (input, output) = line.split_once('\t').unwrap();
            assert!(input.starts_with("<toyrev>"));
            assert!(output.ends_with("</toyrev>"));
        }
    }
}
