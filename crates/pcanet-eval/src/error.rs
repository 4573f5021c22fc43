use std::path::PathBuf;

use pcanet_models::error::ModelError;
use pcanet_models::persist::PersistError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    /// A dataset file exists but is not in the expected format.
    #[error("Invalid dataset file {path}: {reason}")]
    Dataset { path: PathBuf, reason: String },

    #[error("Split has {images} images but {labels} labels")]
    SplitMismatch { images: usize, labels: usize },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EvaluationError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EvaluationError::Io {
            path: path.into(),
            source,
        }
    }
}
