// Attribute prediction: topic, marks and weightage from embeddings.
//
// All three predictors are multinomial logistic regression models fit once
// on the reference corpus. Marks and weightage are treated as classes over
// the values seen in the dataset, so predictions are always one of them.

pub mod metrics;
pub mod predictors;
pub mod softmax;

pub use predictors::{
    AttributePrediction, AttributePredictors, TopicPrediction, TopicPredictor, ValuePredictor,
    DEFAULT_CONFIDENCE_FLOOR, UNKNOWN_TOPIC,
};
pub use softmax::{SoftmaxClassifier, TrainingConfig};
