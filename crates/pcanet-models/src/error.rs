use thiserror::Error;

/// Errors raised while configuring, fitting or applying a model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The hyper-parameters describe a network that cannot be built.
    #[error("Invalid network structure: {0}")]
    Configuration(String),

    /// Input arrays do not have the shape the model was configured for.
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// Paired inputs (samples and labels, truth and predictions) differ in length.
    #[error("Length mismatch: expected {expected} entries, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// `transform`/`predict` was called before `fit`.
    #[error("{0} has not been fitted")]
    NotFitted(&'static str),

    #[error("Eigendecomposition failed: {0}")]
    Linalg(#[from] linfa_linalg::LinalgError),

    #[error("SVM training failed: {0}")]
    Svm(#[from] linfa_svm::SvmError),

    #[error("Failed to start worker pool: {0}")]
    ThreadPool(String),
}
