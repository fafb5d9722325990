// ============================================================
// Layer 4 — XML Pair Loader
// ============================================================
// Loads (input, expected output) tree pairs from a dataset
// split directory. The on-disk convention comes from the toy
// data generator:
//
//   split_dir/
//     data.txt          (tab-separated token streams, informational)
//     dataIn_0.xml      ← input tree for sample 0
//     dataOut_0.xml     ← expected output tree for sample 0
//     dataIn_1.xml
//     dataOut_1.xml
//     ...
//
// A dataIn without a matching dataOut, or a file that fails to
// parse, is logged and skipped — one bad sample must not sink
// a training run.
//
// Reference: Rust Book §9 (Error Handling), §12 (I/O)

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::data::parser;
use crate::domain::traits::SampleSource;
use crate::domain::xml_tree::XmlTree;

/// Loads all dataIn/dataOut pairs from one split directory.
pub struct XmlPairLoader {
    dir: PathBuf,
}

impl XmlPairLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl SampleSource for XmlPairLoader {
    fn load_all(&self) -> Result<Vec<(XmlTree, XmlTree)>> {
        if !self.dir.exists() {
            bail!("Dataset directory '{}' does not exist", self.dir.display());
        }

        // Collect sample indices from the dataIn_<i>.xml names,
        // sorted so epochs see a stable order before shuffling.
        let mut indices: Vec<u64> = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Cannot read directory '{}'", self.dir.display()))?
        {
            let entry = entry?;
            if let Some(index) = sample_index(&entry.path()) {
                indices.push(index);
            }
        }
        indices.sort_unstable();

        let mut pairs = Vec::with_capacity(indices.len());
        for index in indices {
            let in_path  = self.dir.join(format!("dataIn_{index}.xml"));
            let out_path = self.dir.join(format!("dataOut_{index}.xml"));

            if !out_path.exists() {
                tracing::warn!("Skipping sample {index}: missing '{}'", out_path.display());
                continue;
            }

            match load_pair(&in_path, &out_path) {
                Ok(pair) => pairs.push(pair),
                Err(e) => {
                    tracing::warn!("Skipping sample {index}: {e:#}");
                }
            }
        }

        tracing::info!(
            "Loaded {} sample pairs from '{}'",
            pairs.len(),
            self.dir.display()
        );
        Ok(pairs)
    }
}

/// Extract `<i>` from a `dataIn_<i>.xml` path.
fn sample_index(path: &Path) -> Option<u64> {
    let name = path.file_name()?.to_str()?;
    name.strip_prefix("dataIn_")?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

fn load_pair(in_path: &Path, out_path: &Path) -> Result<(XmlTree, XmlTree)> {
    let input = fs::read_to_string(in_path)
        .with_context(|| format!("Cannot read '{}'", in_path.display()))?;
    let output = fs::read_to_string(out_path)
        .with_context(|| format!("Cannot read '{}'", out_path.display()))?;
    let input_tree = parser::parse_str(&input)
        .with_context(|| format!("Bad XML in '{}'", in_path.display()))?;
    let output_tree = parser::parse_str(&output)
        .with_context(|| format!("Bad XML in '{}'", out_path.display()))?;
    Ok((input_tree, output_tree))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn temp_split(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("hier2hier_loader_{label}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_loads_pairs_in_index_order() {
        let dir = temp_split("order");
        // Write out of order on purpose.
        fs::write(dir.join("dataIn_1.xml"), "<t>b</t>").unwrap();
        fs::write(dir.join("dataOut_1.xml"), "<t>b</t>").unwrap();
        fs::write(dir.join("dataIn_0.xml"), "<t>a</t>").unwrap();
        fs::write(dir.join("dataOut_0.xml"), "<t>a</t>").unwrap();

        let pairs = XmlPairLoader::new(&dir).load_all().unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0.root.text, "a");
        assert_eq!(pairs[1].0.root.text, "b");
    }

    #[test]
    fn test_skips_malformed_and_unpaired() {
        let dir = temp_split("skip");
        fs::write(dir.join("dataIn_0.xml"), "<t>ok</t>").unwrap();
        fs::write(dir.join("dataOut_0.xml"), "<t>ko</t>").unwrap();
        fs::write(dir.join("dataIn_1.xml"), "<broken").unwrap();
        fs::write(dir.join("dataOut_1.xml"), "<t>x</t>").unwrap();
        fs::write(dir.join("dataIn_2.xml"), "<t>orphan</t>").unwrap();

        let pairs = XmlPairLoader::new(&dir).load_all().unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].1.root.text, "ko");
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let loader = XmlPairLoader::new("/nonexistent/hier2hier/split");
        let err = loader.load_all().unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
