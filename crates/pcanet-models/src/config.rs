use serde::{Deserialize, Serialize};

/// Hyper-parameters of a two-stage PCANet.
///
/// All shapes are square: `filter_shape_l1 = 4` means a 4x4 window.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TransformerParams {
    pub image_shape: usize,
    pub filter_shape_l1: usize,
    pub step_shape_l1: usize,
    pub n_l1_output: usize,
    pub filter_shape_l2: usize,
    pub step_shape_l2: usize,
    pub n_l2_output: usize,
    pub block_shape: usize,
}

impl Default for TransformerParams {
    /// The configuration used for 28x28 MNIST digits.
    fn default() -> Self {
        Self {
            image_shape: 28,
            filter_shape_l1: 4,
            step_shape_l1: 2,
            n_l1_output: 3,
            filter_shape_l2: 4,
            step_shape_l2: 1,
            n_l2_output: 3,
            block_shape: 5,
        }
    }
}

/// Hyper-parameters of the bagging ensemble.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct EnsembleParams {
    /// Number of bootstrap members.
    pub n_estimators: usize,
    /// Fraction of the training set drawn (with replacement) for each member.
    pub sampling_ratio: f64,
    /// Upper bound on members fitted concurrently; zero or negative uses every core.
    pub n_jobs: i64,
    /// Seed for bootstrap sampling. `None` draws from OS entropy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl EnsembleParams {
    pub fn new(n_estimators: usize, sampling_ratio: f64, n_jobs: i64) -> Self {
        Self {
            n_estimators,
            sampling_ratio,
            n_jobs,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
