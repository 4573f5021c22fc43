use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command, ValueHint};

use pcanet_models::config::{EnsembleParams, TransformerParams};

use crate::config::{load_evaluation_config, EvaluationConfig};

/// Environment variable naming the JSON run configuration.
pub const CONFIG_ENV: &str = "PCANET_CONFIG";

/// Integer hyper-parameter flags, as `(id, long name, help)`.
const SIZE_FLAGS: [(&str, &str, &str); 9] = [
    ("image_shape", "image-shape", "Side length of the square input images"),
    ("filter_shape_l1", "filter-shape-l1", "Side length of the layer 1 filters"),
    ("step_shape_l1", "step-shape-l1", "Stride of the layer 1 filters"),
    ("n_l1_output", "n-l1-output", "Number of layer 1 filters"),
    ("filter_shape_l2", "filter-shape-l2", "Side length of the layer 2 filters"),
    ("step_shape_l2", "step-shape-l2", "Stride of the layer 2 filters"),
    ("n_l2_output", "n-l2-output", "Number of layer 2 filters"),
    ("block_shape", "block-shape", "Side length of the histogram blocks"),
    ("n_estimators", "n-estimators", "Number of ensemble members"),
];

pub fn build_command() -> Command {
    let mut command = Command::new("pcanet-eval")
        .version(clap::crate_version!())
        .about("Evaluate PCANet on MNIST as a single model and as a bagging ensemble")
        .after_help(
            "Data, model and result locations are read from the JSON file named by \
             PCANET_CONFIG; built-in paths are used when it is unset.",
        )
        .arg_required_else_help(true);

    for (id, long, help) in SIZE_FLAGS {
        command = command.arg(
            Arg::new(id)
                .long(long)
                .help(help)
                .required(true)
                .value_parser(clap::value_parser!(usize))
                .value_hint(ValueHint::Other),
        );
    }

    command
        .arg(
            Arg::new("sampling_ratio")
                .long("sampling-ratio")
                .help("Fraction of the training set drawn for each ensemble member")
                .required(true)
                .value_parser(clap::value_parser!(f64))
                .value_hint(ValueHint::Other),
        )
        .arg(
            Arg::new("n_jobs")
                .long("n-jobs")
                .help("Ensemble members fitted in parallel; zero or negative uses every core")
                .required(true)
                .allow_negative_numbers(true)
                .value_parser(clap::value_parser!(i64))
                .value_hint(ValueHint::Other),
        )
}

/// Everything one invocation needs, resolved from the command line.
#[derive(Debug, Clone)]
pub struct RunArguments {
    pub transformer: TransformerParams,
    pub ensemble: EnsembleParams,
    pub config: EvaluationConfig,
}

impl RunArguments {
    /// Resolve the hyper-parameters from `matches` and the run configuration
    /// from `PCANET_CONFIG`.
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let config_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        Self::with_config_path(matches, config_path.as_deref())
    }

    pub fn with_config_path(matches: &ArgMatches, config_path: Option<&Path>) -> Result<Self> {
        let size = |id: &str| -> Result<usize> {
            matches
                .get_one::<usize>(id)
                .copied()
                .with_context(|| format!("Missing required argument: {id}"))
        };

        let transformer = TransformerParams {
            image_shape: size("image_shape")?,
            filter_shape_l1: size("filter_shape_l1")?,
            step_shape_l1: size("step_shape_l1")?,
            n_l1_output: size("n_l1_output")?,
            filter_shape_l2: size("filter_shape_l2")?,
            step_shape_l2: size("step_shape_l2")?,
            n_l2_output: size("n_l2_output")?,
            block_shape: size("block_shape")?,
        };

        let sampling_ratio = matches
            .get_one::<f64>("sampling_ratio")
            .copied()
            .context("Missing required argument: sampling_ratio")?;
        let n_jobs = matches
            .get_one::<i64>("n_jobs")
            .copied()
            .context("Missing required argument: n_jobs")?;
        let ensemble = EnsembleParams::new(size("n_estimators")?, sampling_ratio, n_jobs);

        let config = match config_path {
            Some(path) => load_evaluation_config(path)?,
            None => EvaluationConfig::default(),
        };

        Ok(RunArguments {
            transformer,
            ensemble,
            config,
        })
    }
}
