//! Bootstrap aggregation of PCANet + linear classifier pairs.
//!
//! Every member gets its own bootstrap sample of the training images, learns
//! its own filter banks and its own classifier, and votes on each test image.
//! Members are fitted on a dedicated rayon pool bounded by `n_jobs`.
use ndarray::{ArrayView3, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{EnsembleParams, TransformerParams};
use crate::error::ModelError;
use crate::models::classifier_trait::ClassifierModel;
use crate::models::pcanet::PcaNet;
use crate::models::pipeline::PcaNetPipeline;
use crate::models::svm::{LinearSvc, DEFAULT_C};
use crate::models::transformer_trait::FeatureTransformer;
use crate::stats::most_frequent_label;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bagging {
    n_estimators: usize,
    sampling_ratio: f64,
    n_jobs: i64,
    seed: Option<u64>,
    transformer_params: TransformerParams,
    c: f64,
    estimators: Vec<PcaNetPipeline>,
}

/// Bootstrap sample drawn for one member.
struct MemberPlan {
    indices: Vec<usize>,
}

impl Bagging {
    pub fn new(
        n_estimators: usize,
        sampling_ratio: f64,
        n_jobs: i64,
        transformer_params: TransformerParams,
    ) -> Self {
        Bagging {
            n_estimators,
            sampling_ratio,
            n_jobs,
            seed: None,
            transformer_params,
            c: DEFAULT_C,
            estimators: Vec::new(),
        }
    }

    pub fn from_params(params: &EnsembleParams, transformer_params: TransformerParams) -> Self {
        let bagging = Bagging::new(
            params.n_estimators,
            params.sampling_ratio,
            params.n_jobs,
            transformer_params,
        );
        match params.seed {
            Some(seed) => bagging.with_seed(seed),
            None => bagging,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn n_estimators(&self) -> usize {
        self.n_estimators
    }

    pub fn sampling_ratio(&self) -> f64 {
        self.sampling_ratio
    }

    pub fn n_jobs(&self) -> i64 {
        self.n_jobs
    }

    pub fn transformer_params(&self) -> &TransformerParams {
        &self.transformer_params
    }

    /// Fitted members, empty before `fit`.
    pub fn estimators(&self) -> &[PcaNetPipeline] {
        &self.estimators
    }

    /// Bootstrap sample size for a training set of `n_images`.
    pub fn sample_size(&self, n_images: usize) -> usize {
        (n_images as f64 * self.sampling_ratio).floor() as usize
    }

    /// Worker threads used by `fit`: `n_jobs`, or every core when it is not
    /// positive, never more than there are members.
    pub fn n_workers(&self) -> usize {
        let requested = if self.n_jobs > 0 {
            self.n_jobs as usize
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        };
        requested.min(self.n_estimators).max(1)
    }

    /// Reject ensemble settings that cannot produce a member.
    pub fn validate(&self, n_images: usize) -> Result<(), ModelError> {
        if self.n_estimators == 0 {
            return Err(ModelError::Configuration(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if !self.sampling_ratio.is_finite() || self.sampling_ratio <= 0.0 {
            return Err(ModelError::Configuration(format!(
                "sampling_ratio must be a positive number, got {}",
                self.sampling_ratio
            )));
        }
        if self.sample_size(n_images) == 0 {
            return Err(ModelError::Configuration(format!(
                "sampling_ratio {} of {} images leaves an empty bootstrap sample",
                self.sampling_ratio, n_images
            )));
        }
        PcaNet::new(self.transformer_params.clone()).validate_structure()
    }

    /// Draw every member's bootstrap sample up front from one generator so
    /// the result does not depend on how members are scheduled.
    fn plan_members(&self, n_images: usize) -> Vec<MemberPlan> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let n_samples = self.sample_size(n_images);
        (0..self.n_estimators)
            .map(|_| MemberPlan {
                indices: (0..n_samples).map(|_| rng.gen_range(0..n_images)).collect(),
            })
            .collect()
    }

    pub fn fit(&mut self, images: ArrayView3<f64>, y: &[usize]) -> Result<(), ModelError> {
        let n_images = images.len_of(Axis(0));
        if n_images != y.len() {
            return Err(ModelError::LengthMismatch {
                expected: n_images,
                actual: y.len(),
            });
        }
        self.validate(n_images)?;

        let plans = self.plan_members(n_images);
        let workers = self.n_workers();
        log::info!(
            "Fitting {} members on {} samples each with {} workers",
            self.n_estimators,
            self.sample_size(n_images),
            workers
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| ModelError::ThreadPool(e.to_string()))?;

        let params = &self.transformer_params;
        let c = self.c;
        let estimators = pool.install(|| {
            plans
                .par_iter()
                .enumerate()
                .map(|(member, plan)| {
                    log::trace!("Fitting member {}", member);
                    fit_estimator(params, c, images, y, plan)
                })
                .collect::<Result<Vec<_>, ModelError>>()
        })?;

        self.estimators = estimators;
        Ok(())
    }

    /// Majority vote of all members; ties go to the smallest label.
    pub fn predict(&self, images: ArrayView3<f64>) -> Result<Vec<usize>, ModelError> {
        if self.estimators.is_empty() {
            return Err(ModelError::NotFitted("Bagging"));
        }
        let votes = self
            .estimators
            .iter()
            .map(|member| member.predict(images))
            .collect::<Result<Vec<_>, ModelError>>()?;

        let n_images = images.len_of(Axis(0));
        Ok((0..n_images)
            .map(|i| {
                let column: Vec<usize> = votes.iter().map(|v| v[i]).collect();
                most_frequent_label(&column).unwrap_or_default()
            })
            .collect())
    }
}

fn fit_estimator(
    params: &TransformerParams,
    c: f64,
    images: ArrayView3<f64>,
    y: &[usize],
    plan: &MemberPlan,
) -> Result<PcaNetPipeline, ModelError> {
    let sample = images.select(Axis(0), &plan.indices);
    let labels: Vec<usize> = plan.indices.iter().map(|&i| y[i]).collect();

    let mut transformer = PcaNet::new(params.clone());
    transformer.validate_structure()?;
    transformer.fit(sample.view())?;
    let features = transformer.transform(sample.view())?;

    let mut classifier = LinearSvc::new(c);
    classifier.fit(&features, &labels)?;

    Ok(PcaNetPipeline::new(transformer, classifier))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn striped(n: usize) -> (Array3<f64>, Vec<usize>) {
        let images = Array3::from_shape_fn((n, 28, 28), |(i, y, x)| {
            let on = if i % 2 == 0 { x % 7 < 3 } else { y % 7 < 3 };
            let noise = ((i * 13 + x * 5 + y * 3) % 11) as f64;
            if on {
                180.0 + noise
            } else {
                noise
            }
        });
        let labels = (0..n).map(|i| i % 2).collect();
        (images, labels)
    }

    #[test]
    fn n_workers_is_bounded() {
        let bagging = Bagging::new(3, 0.5, 8, TransformerParams::default());
        assert_eq!(bagging.n_workers(), 3);
        let bagging = Bagging::new(5, 0.5, 2, TransformerParams::default());
        assert_eq!(bagging.n_workers(), 2);
        let bagging = Bagging::new(5, 0.5, -1, TransformerParams::default());
        assert!(bagging.n_workers() >= 1 && bagging.n_workers() <= 5);
    }

    #[test]
    fn invalid_settings_fail_before_fitting() {
        let (images, labels) = striped(4);
        let mut bagging = Bagging::new(0, 0.5, 1, TransformerParams::default());
        assert!(matches!(
            bagging.fit(images.view(), &labels),
            Err(ModelError::Configuration(_))
        ));

        let mut bagging = Bagging::new(2, 0.1, 1, TransformerParams::default());
        assert!(matches!(
            bagging.fit(images.view(), &labels),
            Err(ModelError::Configuration(_))
        ));
        assert!(bagging.estimators().is_empty());
    }

    #[test]
    fn seeded_fit_is_reproducible() {
        let (images, labels) = striped(8);
        let mut a = Bagging::new(3, 0.75, 2, TransformerParams::default()).with_seed(11);
        let mut b = Bagging::new(3, 0.75, 1, TransformerParams::default()).with_seed(11);
        a.fit(images.view(), &labels).unwrap();
        b.fit(images.view(), &labels).unwrap();

        assert_eq!(a.estimators().len(), 3);
        assert_eq!(a.estimators(), b.estimators());
        assert_eq!(
            a.predict(images.view()).unwrap(),
            b.predict(images.view()).unwrap()
        );
    }

    #[test]
    fn predict_before_fit_errors() {
        let (images, _) = striped(2);
        let bagging = Bagging::new(2, 0.5, 1, TransformerParams::default());
        assert!(matches!(
            bagging.predict(images.view()),
            Err(ModelError::NotFitted(_))
        ));
    }
}
