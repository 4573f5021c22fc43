use ndarray::Array2;

use crate::error::ModelError;

/// The contract a downstream classifier offers to the evaluation code.
///
/// Features are row-major (`(n_samples, n_features)`) and labels are the
/// dataset's integer class ids.
pub trait ClassifierModel {
    /// Fit the model on `x` and the matching labels `y`.
    fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<(), ModelError>;

    /// Predict one label per row of `x`.
    fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>, ModelError>;

    /// Optional human readable name for the model
    fn name(&self) -> &str {
        "classifier"
    }
}
