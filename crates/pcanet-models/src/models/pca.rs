//! Streaming principal component analysis.
//!
//! PCANet learns its filters from every patch of every training image, which
//! is far more rows than we want to hold at once. `IncrementalPca` keeps only
//! the running count, column sums and scatter matrix, so memory stays at
//! `O(n_features^2)` regardless of how many batches are fed in.
use linfa_linalg::eigh::{EigSort, Eigh};
use ndarray::{s, Array1, Array2, Axis};

use crate::error::ModelError;

#[derive(Debug, Clone)]
pub struct IncrementalPca {
    n_components: usize,
    n_samples: usize,
    sum: Array1<f64>,
    scatter: Array2<f64>,
}

impl IncrementalPca {
    pub fn new(n_components: usize, n_features: usize) -> Self {
        IncrementalPca {
            n_components,
            n_samples: 0,
            sum: Array1::zeros(n_features),
            scatter: Array2::zeros((n_features, n_features)),
        }
    }

    pub fn n_features(&self) -> usize {
        self.sum.len()
    }

    pub fn n_samples_seen(&self) -> usize {
        self.n_samples
    }

    /// Accumulate one batch of observations (one per row).
    pub fn partial_fit(&mut self, x: &Array2<f64>) -> Result<(), ModelError> {
        if x.ncols() != self.n_features() {
            return Err(ModelError::ShapeMismatch {
                expected: format!("{} features", self.n_features()),
                actual: format!("{} features", x.ncols()),
            });
        }
        self.sum += &x.sum_axis(Axis(0));
        self.scatter += &x.t().dot(x);
        self.n_samples += x.nrows();
        Ok(())
    }

    /// Leading principal axes, one per row, ordered by decreasing variance.
    ///
    /// Each axis is flipped so that its largest-magnitude coordinate is
    /// positive, which makes the result independent of the solver's sign
    /// convention.
    pub fn components(&self) -> Result<Array2<f64>, ModelError> {
        if self.n_samples == 0 {
            return Err(ModelError::EmptyInput(
                "no observations were passed to partial_fit".to_string(),
            ));
        }
        if self.n_components > self.n_features() {
            return Err(ModelError::Configuration(format!(
                "cannot extract {} components from {} features",
                self.n_components,
                self.n_features()
            )));
        }

        let n = self.n_samples as f64;
        let mean = &self.sum / n;
        let mean_col = mean.view().insert_axis(Axis(1));
        let covariance = &self.scatter / n - &mean_col.dot(&mean_col.t());

        let (_variances, axes) = covariance.eigh()?.sort_eig_desc();
        let mut components = axes.slice(s![.., ..self.n_components]).t().to_owned();

        for mut axis in components.rows_mut() {
            let dominant = axis
                .iter()
                .copied()
                .fold(0.0f64, |best, v| if v.abs() > best.abs() { v } else { best });
            if dominant < 0.0 {
                axis.mapv_inplace(|v| -v);
            }
        }
        Ok(components)
    }
}
