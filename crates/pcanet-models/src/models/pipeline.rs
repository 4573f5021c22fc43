use ndarray::{Array2, ArrayView3};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::models::classifier_trait::ClassifierModel;
use crate::models::pcanet::PcaNet;
use crate::models::svm::LinearSvc;
use crate::models::transformer_trait::FeatureTransformer;

/// A fitted PCANet together with the linear classifier trained on its
/// features. Used both as the single-model result and as one bagging member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PcaNetPipeline {
    pub transformer: PcaNet,
    pub classifier: LinearSvc,
}

impl PcaNetPipeline {
    pub fn new(transformer: PcaNet, classifier: LinearSvc) -> Self {
        PcaNetPipeline {
            transformer,
            classifier,
        }
    }

    pub fn transform(&self, images: ArrayView3<f64>) -> Result<Array2<f64>, ModelError> {
        self.transformer.transform(images)
    }

    pub fn predict(&self, images: ArrayView3<f64>) -> Result<Vec<usize>, ModelError> {
        let features = self.transformer.transform(images)?;
        self.classifier.predict(&features)
    }
}
