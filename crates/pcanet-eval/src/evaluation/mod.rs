pub mod evaluate;
pub mod trainer;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use evaluate::{
    evaluate_ensemble, evaluate_normal, evaluate_splits, run_evaluation, EvaluationOutcome,
};
pub use trainer::{run_classifier, run_pcanet_ensemble, run_pcanet_normal, TrainingOutput};

/// Training regime; also the prefix of the outcome keys in a result record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Regime {
    Normal,
    Ensemble,
}

impl Regime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Regime::Normal => "normal",
            Regime::Ensemble => "ensemble",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Regime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(Regime::Normal),
            "ensemble" => Ok(Regime::Ensemble),
            other => Err(format!("Unknown regime: {other}")),
        }
    }
}
