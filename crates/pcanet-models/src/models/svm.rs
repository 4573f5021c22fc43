use linfa::traits::Fit;
use linfa::Dataset;
use linfa_svm::{Svm, SvmError, SvmParams};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::models::classifier_trait::ClassifierModel;

/// Regularisation strength used by the evaluation harness.
pub const DEFAULT_C: f64 = 10.0;

/// Linear support vector classifier.
///
/// Each class gets a one-vs-rest linear-kernel `linfa_svm::Svm` with the same
/// weight `c` on both sides; prediction picks the class whose hyperplane gives
/// the largest decision value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinearSvc {
    c: f64,
    classes: Vec<usize>,
    n_features: usize,
    /// One machine per entry of `classes`, empty for a single-class fit.
    machines: Vec<Svm<f64, bool>>,
}

impl LinearSvc {
    pub fn new(c: f64) -> Self {
        LinearSvc {
            c,
            classes: Vec::new(),
            n_features: 0,
            machines: Vec::new(),
        }
    }

    pub fn c(&self) -> f64 {
        self.c
    }

    /// Sorted class labels seen during `fit`.
    pub fn classes(&self) -> &[usize] {
        &self.classes
    }

    pub fn is_fitted(&self) -> bool {
        !self.classes.is_empty()
    }

    fn check_features(&self, x: &Array2<f64>) -> Result<(), ModelError> {
        if !self.is_fitted() {
            return Err(ModelError::NotFitted("LinearSvc"));
        }
        if x.ncols() != self.n_features {
            return Err(ModelError::ShapeMismatch {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(())
    }

    /// Signed distance of every row to every class hyperplane,
    /// shape `(n_samples, n_classes)`.
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array2<f64>, ModelError> {
        self.check_features(x)?;
        let mut scores = Array2::zeros((x.nrows(), self.machines.len()));
        for (mut column, machine) in scores.columns_mut().into_iter().zip(&self.machines) {
            for (score, row) in column.iter_mut().zip(x.rows()) {
                *score = machine.weighted_sum(&row) - machine.rho;
            }
        }
        Ok(scores)
    }

    fn fit_machine(
        &self,
        x: &Array2<f64>,
        targets: Array1<bool>,
    ) -> Result<Svm<f64, bool>, ModelError> {
        let params: SvmParams<f64, bool> = Svm::<f64, bool>::params()
            .linear_kernel()
            .pos_neg_weights(self.c, self.c);
        let dataset = Dataset::new(x.to_owned(), targets);
        let machine = <SvmParams<f64, bool> as Fit<_, _, SvmError>>::fit(&params, &dataset)?;
        log::trace!("LinearSvc: {}", machine);
        Ok(machine)
    }
}

impl ClassifierModel for LinearSvc {
    fn fit(&mut self, x: &Array2<f64>, y: &[usize]) -> Result<(), ModelError> {
        if x.nrows() != y.len() {
            return Err(ModelError::LengthMismatch {
                expected: x.nrows(),
                actual: y.len(),
            });
        }
        if y.is_empty() {
            return Err(ModelError::EmptyInput("no training samples".to_string()));
        }

        let mut classes = y.to_vec();
        classes.sort_unstable();
        classes.dedup();

        if classes.len() == 1 {
            log::warn!(
                "LinearSvc trained on a single class ({}); every prediction will be that class",
                classes[0]
            );
            self.machines = Vec::new();
        } else {
            self.machines = classes
                .iter()
                .map(|&class| {
                    let targets = y.iter().map(|&label| label == class).collect();
                    self.fit_machine(x, targets)
                })
                .collect::<Result<Vec<_>, ModelError>>()?;
        }

        self.n_features = x.ncols();
        self.classes = classes;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>, ModelError> {
        self.check_features(x)?;
        if self.classes.len() == 1 {
            return Ok(vec![self.classes[0]; x.nrows()]);
        }

        let scores = self.decision_function(x)?;
        Ok(scores
            .rows()
            .into_iter()
            .map(|row| {
                let mut best = 0;
                for (k, &score) in row.iter().enumerate() {
                    if score > row[best] {
                        best = k;
                    }
                }
                self.classes[best]
            })
            .collect())
    }

    fn name(&self) -> &str {
        "linear_svc"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_clusters() -> (Array2<f64>, Vec<usize>) {
        let centers = [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0)];
        let mut data = Vec::new();
        let mut labels = Vec::new();
        for (label, &(cx, cy)) in centers.iter().enumerate() {
            for i in 0..6 {
                let jitter = (i as f64 - 2.5) * 0.3;
                data.push(cx + jitter);
                data.push(cy - jitter);
                labels.push(label * 2 + 1); // labels 1, 3, 5
            }
        }
        (Array2::from_shape_vec((labels.len(), 2), data).unwrap(), labels)
    }

    #[test]
    fn separable_clusters_are_learned() {
        let (x, y) = three_clusters();
        let mut svc = LinearSvc::new(DEFAULT_C);
        svc.fit(&x, &y).unwrap();

        assert_eq!(svc.classes(), &[1, 3, 5]);
        assert_eq!(svc.predict(&x).unwrap(), y);

        let unseen = Array2::from_shape_vec((3, 2), vec![0.5, 0.5, 9.0, 1.0, 1.0, 9.0]).unwrap();
        assert_eq!(svc.predict(&unseen).unwrap(), vec![1, 3, 5]);
    }

    #[test]
    fn decision_function_has_one_column_per_class() {
        let (x, y) = three_clusters();
        let mut svc = LinearSvc::new(DEFAULT_C);
        svc.fit(&x, &y).unwrap();
        let scores = svc.decision_function(&x).unwrap();
        assert_eq!(scores.shape(), &[18, 3]);
        // first sample sits in the class-1 cluster
        assert!(scores[[0, 0]] > 0.0);
        assert!(scores[[0, 1]] < 0.0);
    }

    #[test]
    fn fitting_is_deterministic() {
        let (x, y) = three_clusters();
        let mut a = LinearSvc::new(DEFAULT_C);
        let mut b = LinearSvc::new(DEFAULT_C);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn single_class_predicts_constant() {
        let x = Array2::from_shape_vec((3, 2), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let mut svc = LinearSvc::new(DEFAULT_C);
        svc.fit(&x, &[7, 7, 7]).unwrap();
        assert_eq!(svc.predict(&x).unwrap(), vec![7, 7, 7]);
    }

    #[test]
    fn predict_before_fit_errors() {
        let svc = LinearSvc::new(DEFAULT_C);
        let err = svc.predict(&Array2::zeros((2, 2))).unwrap_err();
        assert!(matches!(err, ModelError::NotFitted(_)));
    }

    #[test]
    fn mismatched_inputs_error() {
        let (x, y) = three_clusters();
        let mut svc = LinearSvc::new(DEFAULT_C);
        assert!(matches!(
            svc.fit(&x, &y[..5]),
            Err(ModelError::LengthMismatch { .. })
        ));

        svc.fit(&x, &y).unwrap();
        assert!(matches!(
            svc.predict(&Array2::zeros((1, 3))),
            Err(ModelError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn fitted_model_survives_serialization() {
        let (x, y) = three_clusters();
        let mut svc = LinearSvc::new(DEFAULT_C);
        svc.fit(&x, &y).unwrap();
        let json = serde_json::to_string(&svc).unwrap();
        let restored: LinearSvc = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.predict(&x).unwrap(), y);
    }
}
