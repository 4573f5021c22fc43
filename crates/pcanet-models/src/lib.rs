//! pcanet-models: the learning components behind the PCANet evaluation harness.
//!
//! This crate provides the PCANet feature transformer (two cascaded PCA filter
//! banks followed by binary hashing and block histograms), a one-vs-rest
//! linear max-margin classifier, a bagging ensemble of transformer/classifier
//! pairs, and a versioned on-disk format for trained models.
//!
//! The orchestration layer only talks to these types through the
//! [`models::transformer_trait::FeatureTransformer`] and
//! [`models::classifier_trait::ClassifierModel`] contracts plus the
//! [`persist`] helpers.
pub mod config;
pub mod error;
pub mod math;
pub mod models;
pub mod persist;
pub mod stats;
