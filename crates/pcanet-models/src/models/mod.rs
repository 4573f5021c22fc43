pub mod bagging;
pub mod pca;
pub mod pcanet;
pub mod pipeline;
pub mod svm;

pub mod classifier_trait;
pub mod transformer_trait;
