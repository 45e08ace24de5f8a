// Topic, marks and weightage predictors fit on the reference corpus.
//
// The topic predictor refuses to guess on low-confidence input: when the
// top class probability is under the confidence floor it answers "Unknown".
// Marks and weightage always return one of the values seen in the dataset,
// or 0 when the dataset had none.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::softmax::{SoftmaxClassifier, TrainingConfig};
use crate::corpus::ReferenceQuestion;
use crate::error::PredictionError;

/// Label returned when the topic model is not confident enough.
pub const UNKNOWN_TOPIC: &str = "Unknown";

/// Minimum top-class probability for a topic prediction to be reported.
pub const DEFAULT_CONFIDENCE_FLOOR: f64 = 0.3;

/// Predicted marks and weightage for one question.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributePrediction {
    pub marks: f64,
    pub weightage: f64,
}

/// A topic prediction with the model's confidence in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicPrediction {
    pub topic: String,
    pub confidence: f64,
}

impl TopicPrediction {
    pub fn unknown() -> Self {
        Self {
            topic: UNKNOWN_TOPIC.to_string(),
            confidence: 0.0,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.topic == UNKNOWN_TOPIC
    }
}

#[derive(Debug, Clone)]
pub struct TopicPredictor {
    classifier: Option<SoftmaxClassifier<String>>,
    confidence_floor: f64,
}

impl TopicPredictor {
    /// Fit on every reference question that has a topic.
    pub fn fit(
        questions: &[&ReferenceQuestion],
        confidence_floor: f64,
        config: &TrainingConfig,
    ) -> Self {
        let samples: Vec<(&[f64], String)> = questions
            .iter()
            .filter_map(|q| Some((q.embedding.as_slice(), q.topic.clone()?)))
            .collect();

        let classifier = SoftmaxClassifier::fit(&samples, config);
        if let Some(ref clf) = classifier {
            info!(
                topics = clf.labels().len(),
                samples = samples.len(),
                "Trained topic predictor"
            );
        }

        Self {
            classifier,
            confidence_floor,
        }
    }

    /// Predict the topic of `embedding`.
    ///
    /// Returns "Unknown" when the top probability is below the confidence
    /// floor, or when the model had no labelled questions to learn from.
    pub fn predict(&self, embedding: &[f64]) -> Result<TopicPrediction, PredictionError> {
        let Some(ref clf) = self.classifier else {
            return Ok(TopicPrediction::unknown());
        };

        let (topic, confidence) = clf.predict(embedding)?;
        Ok(apply_confidence_floor(topic, confidence, self.confidence_floor))
    }

    pub fn confidence_floor(&self) -> f64 {
        self.confidence_floor
    }

    pub fn is_fitted(&self) -> bool {
        self.classifier.is_some()
    }
}

fn apply_confidence_floor(topic: String, confidence: f64, floor: f64) -> TopicPrediction {
    if confidence < floor {
        TopicPrediction {
            topic: UNKNOWN_TOPIC.to_string(),
            confidence,
        }
    } else {
        TopicPrediction { topic, confidence }
    }
}

/// Which numeric attribute a `ValuePredictor` learns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Marks,
    Weightage,
}

impl Attribute {
    pub fn name(self) -> &'static str {
        match self {
            Attribute::Marks => "marks",
            Attribute::Weightage => "weightage",
        }
    }

    fn value_of(self, q: &ReferenceQuestion) -> Option<f64> {
        match self {
            Attribute::Marks => q.marks,
            Attribute::Weightage => q.weightage,
        }
    }
}

/// Classifier over the distinct values of one numeric attribute.
#[derive(Debug, Clone)]
pub struct ValuePredictor {
    attribute: Attribute,
    classifier: Option<SoftmaxClassifier<f64>>,
}

impl ValuePredictor {
    pub fn fit(questions: &[&ReferenceQuestion], attribute: Attribute, config: &TrainingConfig) -> Self {
        let samples: Vec<(&[f64], f64)> = questions
            .iter()
            .filter_map(|q| Some((q.embedding.as_slice(), attribute.value_of(q)?)))
            .collect();

        let classifier = SoftmaxClassifier::fit(&samples, config);
        if let Some(ref clf) = classifier {
            info!(
                attribute = attribute.name(),
                classes = clf.labels().len(),
                samples = samples.len(),
                "Trained value predictor"
            );
        }

        Self {
            attribute,
            classifier,
        }
    }

    /// Predict the attribute value, or 0 when nothing was learned.
    pub fn predict(&self, embedding: &[f64]) -> Result<f64, PredictionError> {
        match self.classifier {
            Some(ref clf) => Ok(clf.predict(embedding)?.0),
            None => Ok(0.0),
        }
    }

    pub fn attribute(&self) -> Attribute {
        self.attribute
    }

    /// The distinct values this predictor can return.
    pub fn classes(&self) -> &[f64] {
        self.classifier.as_ref().map(|c| c.labels()).unwrap_or(&[])
    }

    /// Value recorded for `q`, if any. Used to score hold-out predictions.
    pub(crate) fn target(&self, q: &ReferenceQuestion) -> Option<f64> {
        self.attribute.value_of(q)
    }
}

/// The three fitted predictors, shared read-only across queries.
#[derive(Debug, Clone)]
pub struct AttributePredictors {
    pub topic: TopicPredictor,
    pub marks: ValuePredictor,
    pub weightage: ValuePredictor,
}

impl AttributePredictors {
    pub fn fit(questions: &[&ReferenceQuestion], confidence_floor: f64, config: &TrainingConfig) -> Self {
        Self {
            topic: TopicPredictor::fit(questions, confidence_floor, config),
            marks: ValuePredictor::fit(questions, Attribute::Marks, config),
            weightage: ValuePredictor::fit(questions, Attribute::Weightage, config),
        }
    }

    /// Marks and weightage for one embedding. Fails as a unit so callers
    /// can substitute the default prediction.
    pub fn predict_attributes(&self, embedding: &[f64]) -> Result<AttributePrediction, PredictionError> {
        Ok(AttributePrediction {
            marks: self.marks.predict(embedding)?,
            weightage: self.weightage.predict(embedding)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(embedding: Vec<f64>, topic: Option<&str>, marks: Option<f64>) -> ReferenceQuestion {
        ReferenceQuestion {
            text: String::new(),
            topic: topic.map(str::to_string),
            marks,
            weightage: marks.map(|m| m * 2.0),
            embedding,
        }
    }

    #[test]
    fn test_confidence_floor_returns_unknown() {
        let low = apply_confidence_floor("Math".to_string(), 0.29, DEFAULT_CONFIDENCE_FLOOR);
        assert!(low.is_unknown());
        assert!((low.confidence - 0.29).abs() < f64::EPSILON);

        let at_floor = apply_confidence_floor("Math".to_string(), 0.3, DEFAULT_CONFIDENCE_FLOOR);
        assert_eq!(at_floor.topic, "Math");
    }

    #[test]
    fn test_topic_predictor_spreads_over_many_topics() {
        // Five orthogonal topics; a query equally close to all of them gets
        // probability ~0.2 each, below the floor.
        let qs: Vec<ReferenceQuestion> = (0..5)
            .map(|i| {
                let mut e = vec![0.0; 5];
                e[i] = 1.0;
                question(e, Some(&format!("T{i}")), Some(1.0))
            })
            .collect();
        let refs: Vec<&ReferenceQuestion> = qs.iter().collect();
        let predictor = TopicPredictor::fit(&refs, DEFAULT_CONFIDENCE_FLOOR, &TrainingConfig::default());

        let uniform = predictor.predict(&[1.0, 1.0, 1.0, 1.0, 1.0]).unwrap();
        assert!(uniform.is_unknown(), "got {uniform:?}");

        let clear = predictor.predict(&[0.0, 0.0, 1.0, 0.0, 0.0]).unwrap();
        assert_eq!(clear.topic, "T2");
    }

    #[test]
    fn test_zero_floor_always_returns_label() {
        let qs = vec![
            question(vec![1.0, 0.0], Some("A"), None),
            question(vec![0.0, 1.0], Some("B"), None),
        ];
        let refs: Vec<&ReferenceQuestion> = qs.iter().collect();
        let predictor = TopicPredictor::fit(&refs, 0.0, &TrainingConfig::default());
        assert!(!predictor.predict(&[1.0, 1.0]).unwrap().is_unknown());
    }

    #[test]
    fn test_unfitted_topic_predictor_is_unknown() {
        let qs = vec![question(vec![1.0, 0.0], None, Some(1.0))];
        let refs: Vec<&ReferenceQuestion> = qs.iter().collect();
        let predictor = TopicPredictor::fit(&refs, DEFAULT_CONFIDENCE_FLOOR, &TrainingConfig::default());

        assert!(!predictor.is_fitted());
        assert!(predictor.predict(&[1.0, 0.0]).unwrap().is_unknown());
    }

    #[test]
    fn test_value_predictor_returns_observed_value() {
        let qs = vec![
            question(vec![1.0, 0.0], Some("A"), Some(2.0)),
            question(vec![0.0, 1.0], Some("B"), Some(10.0)),
        ];
        let refs: Vec<&ReferenceQuestion> = qs.iter().collect();
        let predictors = AttributePredictors::fit(&refs, DEFAULT_CONFIDENCE_FLOOR, &TrainingConfig::default());

        let prediction = predictors.predict_attributes(&[0.1, 0.9]).unwrap();
        assert_eq!(prediction.marks, 10.0);
        assert_eq!(prediction.weightage, 20.0);
        assert_eq!(predictors.marks.classes(), &[2.0, 10.0]);
    }

    #[test]
    fn test_value_predictor_without_values_is_zero() {
        let qs = vec![question(vec![1.0, 0.0], Some("A"), None)];
        let refs: Vec<&ReferenceQuestion> = qs.iter().collect();
        let predictor = ValuePredictor::fit(&refs, Attribute::Marks, &TrainingConfig::default());

        assert_eq!(predictor.predict(&[1.0, 0.0]).unwrap(), 0.0);
        assert!(predictor.classes().is_empty());
    }

    #[test]
    fn test_attribute_prediction_dimension_mismatch() {
        let qs = vec![
            question(vec![1.0, 0.0], Some("A"), Some(1.0)),
            question(vec![0.0, 1.0], Some("B"), Some(3.0)),
        ];
        let refs: Vec<&ReferenceQuestion> = qs.iter().collect();
        let predictors = AttributePredictors::fit(&refs, DEFAULT_CONFIDENCE_FLOOR, &TrainingConfig::default());

        assert!(matches!(
            predictors.predict_attributes(&[1.0, 0.0, 0.0]),
            Err(PredictionError::DimensionMismatch { expected: 2, actual: 3 })
        ));
    }
}
