use std::time::Instant;

use ndarray::{Array2, ArrayView3};
use pcanet_models::config::{EnsembleParams, TransformerParams};
use pcanet_models::error::ModelError;
use pcanet_models::models::bagging::Bagging;
use pcanet_models::models::classifier_trait::ClassifierModel;
use pcanet_models::models::pcanet::PcaNet;
use pcanet_models::models::pipeline::PcaNetPipeline;
use pcanet_models::models::svm::LinearSvc;
use pcanet_models::models::transformer_trait::FeatureTransformer;
use pcanet_models::stats::accuracy_score;

/// Regularisation of the classifier trained on PCANet features.
pub const CLASSIFIER_C: f64 = 10.0;

/// A trained model with its test accuracy and fit duration in seconds.
#[derive(Debug, Clone)]
pub struct TrainingOutput<M> {
    pub model: M,
    pub accuracy: f64,
    pub training_time: f64,
}

/// Fit a linear classifier on the training features and predict the test
/// features.
pub fn run_classifier(
    x_train: &Array2<f64>,
    x_test: &Array2<f64>,
    y_train: &[usize],
) -> Result<(LinearSvc, Vec<usize>), ModelError> {
    let mut classifier = LinearSvc::new(CLASSIFIER_C);
    log::debug!(
        "Fitting {} on {} samples with {} features",
        classifier.name(),
        x_train.nrows(),
        x_train.ncols()
    );
    classifier.fit(x_train, y_train)?;
    let y_pred = classifier.predict(x_test)?;
    Ok((classifier, y_pred))
}

/// Train one PCANet and score it through a linear classifier.
///
/// The structure is validated before the clock starts; `training_time`
/// covers the transformer fit only.
pub fn run_pcanet_normal(
    transformer_params: &TransformerParams,
    images_train: ArrayView3<f64>,
    images_test: ArrayView3<f64>,
    y_train: &[usize],
    y_test: &[usize],
) -> Result<TrainingOutput<PcaNetPipeline>, ModelError> {
    let mut transformer = PcaNet::new(transformer_params.clone());
    transformer.validate_structure()?;

    let start = Instant::now();
    transformer.fit(images_train)?;
    let training_time = start.elapsed().as_secs_f64();

    let x_train = transformer.transform(images_train)?;
    let x_test = transformer.transform(images_test)?;
    let (classifier, y_pred) = run_classifier(&x_train, &x_test, y_train)?;
    let accuracy = accuracy_score(y_test, &y_pred)?;

    Ok(TrainingOutput {
        model: PcaNetPipeline::new(transformer, classifier),
        accuracy,
        training_time,
    })
}

/// Train a bagging ensemble of PCANet + classifier pairs and score its
/// majority vote. `training_time` covers the whole ensemble fit.
pub fn run_pcanet_ensemble(
    ensemble_params: &EnsembleParams,
    transformer_params: &TransformerParams,
    images_train: ArrayView3<f64>,
    images_test: ArrayView3<f64>,
    y_train: &[usize],
    y_test: &[usize],
) -> Result<TrainingOutput<Bagging>, ModelError> {
    let mut model = Bagging::from_params(ensemble_params, transformer_params.clone());
    model.validate(y_train.len())?;

    let start = Instant::now();
    model.fit(images_train, y_train)?;
    let training_time = start.elapsed().as_secs_f64();

    let y_pred = model.predict(images_test)?;
    let accuracy = accuracy_score(y_test, &y_pred)?;

    Ok(TrainingOutput {
        model,
        accuracy,
        training_time,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn invalid_structure_fails_before_fitting() {
        let params = TransformerParams {
            filter_shape_l1: 30,
            step_shape_l1: 30,
            ..TransformerParams::default()
        };
        let images = Array3::<f64>::zeros((2, 28, 28));
        let err = run_pcanet_normal(&params, images.view(), images.view(), &[0, 1], &[0, 1])
            .unwrap_err();
        assert!(matches!(err, ModelError::Configuration(_)));
    }

    #[test]
    fn invalid_ensemble_fails_before_fitting() {
        let images = Array3::<f64>::zeros((2, 28, 28));
        let err = run_pcanet_ensemble(
            &EnsembleParams::new(0, 0.5, 1),
            &TransformerParams::default(),
            images.view(),
            images.view(),
            &[0, 1],
            &[0, 1],
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::Configuration(_)));
    }

    #[test]
    fn classifier_predicts_every_test_row() {
        let x_train =
            Array2::from_shape_vec((4, 2), vec![0.0, 0.0, 0.2, 0.1, 5.0, 5.0, 5.2, 4.9]).unwrap();
        let x_test = Array2::from_shape_vec((2, 2), vec![0.1, 0.0, 5.1, 5.0]).unwrap();
        let (classifier, y_pred) = run_classifier(&x_train, &x_test, &[2, 2, 8, 8]).unwrap();
        assert_eq!(classifier.c(), CLASSIFIER_C);
        assert_eq!(y_pred, vec![2, 8]);
    }
}
