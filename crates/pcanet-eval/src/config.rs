use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::evaluation::Regime;

/// Number of leading samples taken from each split.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DataSize {
    pub n_train: usize,
    pub n_test: usize,
}

impl Default for DataSize {
    fn default() -> Self {
        Self {
            n_train: 20,
            n_test: 20,
        }
    }
}

/// Where a run reads its data from and writes its artifacts to.
///
/// Every field is optional in the JSON file; missing fields keep their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Directory holding the four MNIST IDX files.
    pub mnist_dir: PathBuf,
    /// Directory trained models are written to. Must already exist.
    pub pickle_dir: PathBuf,
    /// Append-only JSON results file.
    pub result_file: PathBuf,
    pub datasize: DataSize,
    /// Regimes to run, in order.
    pub regimes: Vec<Regime>,
    /// Seed for ensemble bootstrap sampling; entropy when absent.
    pub seed: Option<u64>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            mnist_dir: PathBuf::from("mnist"),
            pickle_dir: PathBuf::from("pickles"),
            result_file: PathBuf::from("result.json"),
            datasize: DataSize::default(),
            regimes: vec![Regime::Normal, Regime::Ensemble],
            seed: None,
        }
    }
}

/// Load a run configuration from a JSON file.
pub fn load_evaluation_config<P: AsRef<Path>>(path: P) -> Result<EvaluationConfig> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
    let config: EvaluationConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
    Ok(config)
}
