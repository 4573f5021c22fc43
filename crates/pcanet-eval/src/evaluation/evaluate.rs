use serde_json::Value;

use pcanet_models::config::{EnsembleParams, TransformerParams};
use pcanet_models::error::ModelError;
use pcanet_models::models::bagging::Bagging;
use pcanet_models::models::pcanet::PcaNet;
use pcanet_models::models::transformer_trait::FeatureTransformer;
use pcanet_models::persist::{ModelStore, StoredModel};

use crate::config::EvaluationConfig;
use crate::data::{load_mnist, pick, Split};
use crate::error::EvaluationError;
use crate::evaluation::trainer::{run_pcanet_ensemble, run_pcanet_normal};
use crate::evaluation::Regime;
use crate::report::{build_record, export_records, params_to_str, to_record, Record};

/// Result of one regime run: where its model was stored and how it scored.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationOutcome {
    pub regime: Regime,
    pub model_filename: String,
    pub accuracy: f64,
    pub training_time: f64,
}

impl EvaluationOutcome {
    /// `<regime>-model`, `<regime>-accuracy` and `<regime>-training-time`.
    pub fn to_record(&self) -> Record {
        let prefix = self.regime.as_str();
        let mut record = Record::new();
        record.insert(
            format!("{prefix}-model"),
            Value::from(self.model_filename.clone()),
        );
        record.insert(format!("{prefix}-accuracy"), Value::from(self.accuracy));
        record.insert(
            format!("{prefix}-training-time"),
            Value::from(self.training_time),
        );
        record
    }
}

pub fn evaluate_normal(
    train: &Split,
    test: &Split,
    transformer_params: &TransformerParams,
    store: &ModelStore,
) -> Result<EvaluationOutcome, EvaluationError> {
    log::info!(
        "Evaluating normal regime: {}",
        params_to_str(&to_record(transformer_params)?)
    );
    let output = run_pcanet_normal(
        transformer_params,
        train.images.view(),
        test.images.view(),
        &train.labels,
        &test.labels,
    )?;
    let model_filename = store.save(&StoredModel::from(output.model))?;
    log::info!(
        "Normal regime: accuracy {:.4}, training time {:.3}s",
        output.accuracy,
        output.training_time
    );

    Ok(EvaluationOutcome {
        regime: Regime::Normal,
        model_filename,
        accuracy: output.accuracy,
        training_time: output.training_time,
    })
}

pub fn evaluate_ensemble(
    train: &Split,
    test: &Split,
    ensemble_params: &EnsembleParams,
    transformer_params: &TransformerParams,
    store: &ModelStore,
) -> Result<EvaluationOutcome, EvaluationError> {
    log::info!(
        "Evaluating ensemble regime: {}",
        params_to_str(&to_record(ensemble_params)?)
    );
    let output = run_pcanet_ensemble(
        ensemble_params,
        transformer_params,
        train.images.view(),
        test.images.view(),
        &train.labels,
        &test.labels,
    )?;
    let model_filename = store.save(&StoredModel::from(output.model))?;
    log::info!(
        "Ensemble regime: accuracy {:.4}, training time {:.3}s",
        output.accuracy,
        output.training_time
    );

    Ok(EvaluationOutcome {
        regime: Regime::Ensemble,
        model_filename,
        accuracy: output.accuracy,
        training_time: output.training_time,
    })
}

/// Check every configured regime's settings against the training split
/// before anything is fitted or written.
fn validate_regimes(
    regimes: &[Regime],
    n_train: usize,
    transformer_params: &TransformerParams,
    ensemble_params: &EnsembleParams,
) -> Result<(), ModelError> {
    for regime in regimes {
        match regime {
            Regime::Normal => PcaNet::new(transformer_params.clone()).validate_structure()?,
            Regime::Ensemble => {
                Bagging::from_params(ensemble_params, transformer_params.clone())
                    .validate(n_train)?
            }
        }
    }
    Ok(())
}

/// Run every configured regime on already loaded splits and append one
/// record per regime to the results file.
///
/// Records are appended only once every regime has finished. If any regime
/// fails, the results file is left untouched and the models saved earlier in
/// the run are deleted.
pub fn evaluate_splits(
    config: &EvaluationConfig,
    train: &Split,
    test: &Split,
    transformer_params: &TransformerParams,
    ensemble_params: &EnsembleParams,
) -> Result<Vec<Record>, EvaluationError> {
    let (train, test) = pick(
        train,
        test,
        config.datasize.n_train,
        config.datasize.n_test,
    );
    let store = ModelStore::new(&config.pickle_dir);

    let mut ensemble_params = ensemble_params.clone();
    if ensemble_params.seed.is_none() {
        ensemble_params.seed = config.seed;
    }
    validate_regimes(
        &config.regimes,
        train.len(),
        transformer_params,
        &ensemble_params,
    )?;

    let mut saved = Vec::with_capacity(config.regimes.len());
    let outcome = run_regimes(
        config,
        &train,
        &test,
        transformer_params,
        &ensemble_params,
        &store,
        &mut saved,
    )
    .and_then(|records| {
        export_records(&records, &config.result_file)?;
        Ok(records)
    });

    if outcome.is_err() {
        for filename in &saved {
            if let Err(e) = store.remove(filename) {
                log::warn!("Could not remove model {}: {}", filename, e);
            }
        }
    }
    outcome
}

/// Evaluate each regime in order, pushing the name of every saved model to
/// `saved` as soon as it is written.
fn run_regimes(
    config: &EvaluationConfig,
    train: &Split,
    test: &Split,
    transformer_params: &TransformerParams,
    ensemble_params: &EnsembleParams,
    store: &ModelStore,
    saved: &mut Vec<String>,
) -> Result<Vec<Record>, EvaluationError> {
    let datasize = to_record(&config.datasize)?;
    let transformer = to_record(transformer_params)?;

    let mut records = Vec::with_capacity(config.regimes.len());
    for &regime in &config.regimes {
        let record = match regime {
            Regime::Normal => {
                let outcome = evaluate_normal(train, test, transformer_params, store)?;
                saved.push(outcome.model_filename.clone());
                build_record(regime, &[&datasize, &transformer, &outcome.to_record()])
            }
            Regime::Ensemble => {
                let outcome =
                    evaluate_ensemble(train, test, ensemble_params, transformer_params, store)?;
                saved.push(outcome.model_filename.clone());
                let ensemble = to_record(ensemble_params)?;
                build_record(
                    regime,
                    &[&datasize, &transformer, &ensemble, &outcome.to_record()],
                )
            }
        };
        records.push(record);
    }
    Ok(records)
}

/// Load MNIST from `config.mnist_dir` and run [`evaluate_splits`].
pub fn run_evaluation(
    config: &EvaluationConfig,
    transformer_params: &TransformerParams,
    ensemble_params: &EnsembleParams,
) -> Result<Vec<Record>, EvaluationError> {
    let (train, test) = load_mnist(&config.mnist_dir)?;
    evaluate_splits(config, &train, &test, transformer_params, ensemble_params)
}
