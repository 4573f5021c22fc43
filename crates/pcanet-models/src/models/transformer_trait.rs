use ndarray::{Array2, ArrayView3};

use crate::error::ModelError;

/// A feature extractor mapping a stack of images `(n_images, height, width)`
/// to a feature matrix `(n_images, n_features)`.
pub trait FeatureTransformer {
    /// Check the configured geometry without touching any data.
    ///
    /// Callers run this before `fit` so an inconsistent configuration fails
    /// before any expensive work starts.
    fn validate_structure(&self) -> Result<(), ModelError>;

    fn fit(&mut self, images: ArrayView3<f64>) -> Result<(), ModelError>;

    fn transform(&self, images: ArrayView3<f64>) -> Result<Array2<f64>, ModelError>;
}
