//! PCANet feature transformer.
//!
//! Two cascaded PCA filter banks learned from image patches, followed by
//! binary hashing of the second-stage responses and block-wise histograms of
//! the resulting codes (Chan et al., "PCANet: A Simple Deep Learning Baseline
//! for Image Classification?").
use ndarray::{Array2, ArrayView2, ArrayView3, Axis};
use serde::{Deserialize, Serialize};

use crate::config::TransformerParams;
use crate::error::ModelError;
use crate::math::{
    binarize, binary_to_decimal, block_histogram, convolve, patch_matrix, remove_patch_mean,
    steps,
};
use crate::models::pca::IncrementalPca;
use crate::models::transformer_trait::FeatureTransformer;

/// Codes are packed into `u32` and every code gets its own histogram bin.
pub const MAX_L2_OUTPUT: usize = 16;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PcaNet {
    params: TransformerParams,
    filters_l1: Option<Array2<f64>>,
    filters_l2: Option<Array2<f64>>,
}

impl PcaNet {
    pub fn new(params: TransformerParams) -> Self {
        PcaNet {
            params,
            filters_l1: None,
            filters_l2: None,
        }
    }

    pub fn params(&self) -> &TransformerParams {
        &self.params
    }

    pub fn is_fitted(&self) -> bool {
        self.filters_l1.is_some() && self.filters_l2.is_some()
    }

    /// Learned first-stage filters, one flattened filter per row.
    pub fn filters_l1(&self) -> Option<&Array2<f64>> {
        self.filters_l1.as_ref()
    }

    pub fn filters_l2(&self) -> Option<&Array2<f64>> {
        self.filters_l2.as_ref()
    }

    /// Number of histogram bins per block: one per `n_l2_output`-bit code.
    /// Histogram bins per block. Only valid once `check_code_width` passed.
    fn n_bins(&self) -> usize {
        1 << self.params.n_l2_output
    }

    /// Decimal codes are built from `n_l2_output` bits.
    fn check_code_width(&self) -> Result<(), ModelError> {
        if self.params.n_l2_output > MAX_L2_OUTPUT {
            return Err(ModelError::Configuration(format!(
                "layer 2: at most {MAX_L2_OUTPUT} outputs are supported, got {}",
                self.params.n_l2_output
            )));
        }
        Ok(())
    }

    /// Length of the feature vector produced for one image.
    pub fn n_features(&self) -> Result<usize, ModelError> {
        let [_, _, blocks] = self.stage_sizes()?;
        self.check_code_width()?;
        Ok(self.params.n_l1_output * blocks * blocks * self.n_bins())
    }

    /// Output side lengths of layer 1, layer 2 and the block grid.
    fn stage_sizes(&self) -> Result<[usize; 3], ModelError> {
        let p = &self.params;
        let l1 = check_stage("layer 1", p.image_shape, p.filter_shape_l1, p.step_shape_l1)?;
        let l2 = check_stage("layer 2", l1, p.filter_shape_l2, p.step_shape_l2)?;
        let blocks = check_stage("block", l2, p.block_shape, p.block_shape)?;
        Ok([l1, l2, blocks])
    }

    fn check_images(&self, images: &ArrayView3<f64>) -> Result<(), ModelError> {
        let (n, h, w) = images.dim();
        if n == 0 {
            return Err(ModelError::EmptyInput("no images were given".to_string()));
        }
        let side = self.params.image_shape;
        if h != side || w != side {
            return Err(ModelError::ShapeMismatch {
                expected: format!("{side}x{side} images"),
                actual: format!("{h}x{w} images"),
            });
        }
        Ok(())
    }

    /// Feature vector of a single image.
    fn image_features(
        &self,
        image: ArrayView2<f64>,
        filters_l1: &Array2<f64>,
        filters_l2: &Array2<f64>,
    ) -> Vec<f64> {
        let p = &self.params;
        let n_bins = self.n_bins();

        let maps_l1 = convolve(image, filters_l1, p.filter_shape_l1, p.step_shape_l1);
        let mut features = Vec::new();
        for map in maps_l1.outer_iter() {
            let maps_l2 = convolve(map, filters_l2, p.filter_shape_l2, p.step_shape_l2);
            let codes = binary_to_decimal(&binarize(&maps_l2));
            features.extend(block_histogram(codes.view(), p.block_shape, n_bins));
        }
        features
    }
}

impl FeatureTransformer for PcaNet {
    /// Check that every stage's windows visit all pixels of its input, i.e.
    /// the last window ends exactly on the border, and that the requested
    /// number of filters can be extracted from each stage's patches.
    fn validate_structure(&self) -> Result<(), ModelError> {
        let p = &self.params;
        self.stage_sizes()?;

        check_outputs("layer 1", p.n_l1_output, p.filter_shape_l1)?;
        check_outputs("layer 2", p.n_l2_output, p.filter_shape_l2)?;
        self.check_code_width()
    }

    fn fit(&mut self, images: ArrayView3<f64>) -> Result<(), ModelError> {
        self.validate_structure()?;
        self.check_images(&images)?;
        let p = self.params.clone();

        let mut pca_l1 = IncrementalPca::new(p.n_l1_output, p.filter_shape_l1 * p.filter_shape_l1);
        for image in images.outer_iter() {
            let patches = patch_matrix(image, p.filter_shape_l1, p.step_shape_l1);
            pca_l1.partial_fit(&remove_patch_mean(patches))?;
        }
        let filters_l1 = pca_l1.components()?;
        log::trace!(
            "Layer 1: {} filters from {} patches",
            filters_l1.nrows(),
            pca_l1.n_samples_seen()
        );

        let mut pca_l2 = IncrementalPca::new(p.n_l2_output, p.filter_shape_l2 * p.filter_shape_l2);
        for image in images.outer_iter() {
            let maps = convolve(image, &filters_l1, p.filter_shape_l1, p.step_shape_l1);
            for map in maps.outer_iter() {
                let patches = patch_matrix(map, p.filter_shape_l2, p.step_shape_l2);
                pca_l2.partial_fit(&remove_patch_mean(patches))?;
            }
        }
        let filters_l2 = pca_l2.components()?;
        log::trace!(
            "Layer 2: {} filters from {} patches",
            filters_l2.nrows(),
            pca_l2.n_samples_seen()
        );

        self.filters_l1 = Some(filters_l1);
        self.filters_l2 = Some(filters_l2);
        Ok(())
    }

    fn transform(&self, images: ArrayView3<f64>) -> Result<Array2<f64>, ModelError> {
        let (filters_l1, filters_l2) = match (&self.filters_l1, &self.filters_l2) {
            (Some(l1), Some(l2)) => (l1, l2),
            _ => return Err(ModelError::NotFitted("PcaNet")),
        };
        self.check_images(&images)?;

        let n_features = self.n_features()?;
        let mut out = Array2::zeros((images.len_of(Axis(0)), n_features));
        for (image, mut row) in images.outer_iter().zip(out.rows_mut()) {
            let features = self.image_features(image, filters_l1, filters_l2);
            row.iter_mut()
                .zip(features.iter())
                .for_each(|(o, &v)| *o = v);
        }
        Ok(out)
    }
}

/// Output side length of one stage, or a configuration error when the
/// windows do not tile the input exactly.
fn check_stage(stage: &str, input: usize, filter: usize, step: usize) -> Result<usize, ModelError> {
    if filter == 0 || step == 0 {
        return Err(ModelError::Configuration(format!(
            "{stage}: window ({filter}) and step ({step}) must be positive"
        )));
    }
    let offsets = steps(input, filter, step);
    match offsets.last() {
        Some(&last) if last + filter == input => Ok(offsets.len()),
        _ => Err(ModelError::Configuration(format!(
            "{stage}: a {filter}px window with step {step} does not tile a {input}px input"
        ))),
    }
}

fn check_outputs(stage: &str, n_output: usize, filter: usize) -> Result<(), ModelError> {
    if n_output == 0 || n_output > filter * filter {
        return Err(ModelError::Configuration(format!(
            "{stage}: number of outputs must be in 1..={}, got {n_output}",
            filter * filter
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn digits_like(n: usize) -> Array3<f64> {
        Array3::from_shape_fn((n, 28, 28), |(i, y, x)| {
            let stroke = match i % 3 {
                0 => (x as isize - 14).abs() < 3,
                1 => (y as isize - 14).abs() < 3,
                _ => (x as isize - y as isize).abs() < 3,
            };
            let noise = ((i * 31 + y * 7 + x * 3) % 17) as f64;
            if stroke {
                200.0 + noise
            } else {
                noise
            }
        })
    }

    #[test]
    fn default_structure_is_valid() {
        let net = PcaNet::new(TransformerParams::default());
        assert!(net.validate_structure().is_ok());
        // 3 L1 maps * 2x2 blocks * 2^3 bins
        assert_eq!(net.n_features().unwrap(), 3 * 4 * 8);
    }

    #[test]
    fn oversized_first_filter_is_a_configuration_error() {
        let params = TransformerParams {
            filter_shape_l1: 30,
            step_shape_l1: 30,
            ..TransformerParams::default()
        };
        let err = PcaNet::new(params).validate_structure().unwrap_err();
        assert!(matches!(err, ModelError::Configuration(_)));
    }

    #[test]
    fn window_that_misses_the_border_is_rejected() {
        // offsets 0, 3, ..., 24 end at 28 - 1
        let params = TransformerParams {
            filter_shape_l1: 3,
            step_shape_l1: 3,
            ..TransformerParams::default()
        };
        assert!(PcaNet::new(params).validate_structure().is_err());
    }

    #[test]
    fn feature_length_rejects_wide_codes() {
        for n_l2_output in [MAX_L2_OUTPUT + 1, 64, 200] {
            let params = TransformerParams {
                n_l2_output,
                ..TransformerParams::default()
            };
            assert!(matches!(
                PcaNet::new(params).n_features(),
                Err(ModelError::Configuration(_))
            ));
        }
    }

    #[test]
    fn too_many_outputs_are_rejected() {
        let params = TransformerParams {
            n_l1_output: 17,
            ..TransformerParams::default()
        };
        assert!(PcaNet::new(params).validate_structure().is_err());

        let params = TransformerParams {
            n_l2_output: 0,
            ..TransformerParams::default()
        };
        assert!(PcaNet::new(params).validate_structure().is_err());
    }

    #[test]
    fn fit_then_transform_produces_histograms() {
        let images = digits_like(6);
        let mut net = PcaNet::new(TransformerParams::default());
        net.fit(images.view()).unwrap();
        assert!(net.is_fitted());
        assert_eq!(net.filters_l1().unwrap().shape(), &[3, 16]);
        assert_eq!(net.filters_l2().unwrap().shape(), &[3, 16]);

        let features = net.transform(images.view()).unwrap();
        assert_eq!(features.shape(), &[6, 96]);
        // each L1 map contributes 4 blocks of 25 codes
        for row in features.rows() {
            assert_eq!(row.sum(), (3 * 4 * 25) as f64);
        }
    }

    #[test]
    fn transform_is_deterministic() {
        let images = digits_like(4);
        let mut a = PcaNet::new(TransformerParams::default());
        let mut b = PcaNet::new(TransformerParams::default());
        a.fit(images.view()).unwrap();
        b.fit(images.view()).unwrap();
        assert_eq!(
            a.transform(images.view()).unwrap(),
            b.transform(images.view()).unwrap()
        );
    }

    #[test]
    fn transform_requires_fit_and_matching_shape() {
        let net = PcaNet::new(TransformerParams::default());
        let err = net.transform(digits_like(1).view()).unwrap_err();
        assert!(matches!(err, ModelError::NotFitted(_)));

        let mut net = PcaNet::new(TransformerParams::default());
        net.fit(digits_like(3).view()).unwrap();
        let small = Array3::<f64>::zeros((2, 20, 20));
        let err = net.transform(small.view()).unwrap_err();
        assert!(matches!(err, ModelError::ShapeMismatch { .. }));
    }
}
