//! pcanet-eval: runs PCANet experiments end to end.
//!
//! Loads MNIST, carves deterministic train/test prefixes, trains the
//! single-model and bagging-ensemble regimes, stores each trained model under
//! a fresh hashed name and appends one JSON record per regime to a results
//! file.
pub mod config;
pub mod data;
pub mod error;
pub mod evaluation;
pub mod input;
pub mod report;
