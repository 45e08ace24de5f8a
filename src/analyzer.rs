// Batch analysis: one record per submitted question, in input order.
//
// The whole batch is embedded in one call. If that call fails, every
// question is embedded on its own so a single bad input only fails its own
// record. Prediction failures are local to the marks/weightage fields.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::context::InferenceContext;
use crate::embedding::Embedding;
use crate::error::EmbeddingError;
use crate::matcher::SimilarityResult;
use crate::predict::{AttributePrediction, UNKNOWN_TOPIC};

/// Result for one question of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub question: String,
    #[serde(flatten)]
    pub similarity: SimilarityResult,
    #[serde(flatten)]
    pub attributes: AttributePrediction,
    /// Why this record carries defaults, if it does.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisRecord {
    /// A record for a question that could not be embedded at all.
    pub fn failed(question: &str, error: &EmbeddingError) -> Self {
        Self {
            question: question.to_string(),
            similarity: SimilarityResult::unmatched(UNKNOWN_TOPIC),
            attributes: AttributePrediction::default(),
            error: Some(error.to_string()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

impl InferenceContext {
    /// Analyze every question independently. Output order matches input.
    pub fn analyze_batch(&self, questions: &[String]) -> Vec<AnalysisRecord> {
        let embeddings = self.embed_each(questions);

        let records: Vec<AnalysisRecord> = questions
            .iter()
            .zip(embeddings)
            .enumerate()
            .map(|(index, (question, embedding))| match embedding {
                Ok(embedding) => self.analyze_embedding(question, &embedding),
                Err(e) => {
                    warn!(index, error = %e, "Could not embed question");
                    AnalysisRecord::failed(question, &e)
                }
            })
            .collect();

        let degraded = records.iter().filter(|r| r.is_degraded()).count();
        info!(
            questions = records.len(),
            degraded,
            duplicates = records.iter().filter(|r| r.similarity.similar_exists).count(),
            "Batch analyzed"
        );
        records
    }

    fn analyze_embedding(&self, question: &str, embedding: &[f64]) -> AnalysisRecord {
        let (similarity, _) = self.match_embedding(embedding, None);
        let (attributes, error) = self.predict_attributes(embedding);
        AnalysisRecord {
            question: question.to_string(),
            similarity,
            attributes,
            error,
        }
    }

    /// One embedding result per question, whole batch first.
    fn embed_each(&self, questions: &[String]) -> Vec<Result<Embedding, EmbeddingError>> {
        match self.embedder().embed_batch(questions) {
            Ok(embeddings) if embeddings.len() == questions.len() => {
                embeddings.into_iter().map(Ok).collect()
            }
            Ok(embeddings) => {
                warn!(
                    expected = questions.len(),
                    actual = embeddings.len(),
                    "Batch embedding returned wrong count, embedding individually"
                );
                questions.iter().map(|q| self.embed(q)).collect()
            }
            Err(e) => {
                debug!(error = %e, "Batch embedding failed, embedding individually");
                questions.iter().map(|q| self.embed(q)).collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_record_has_defaults() {
        let err = EmbeddingError::Inference("boom".to_string());
        let record = AnalysisRecord::failed("What is 2+2?", &err);

        assert!(record.is_degraded());
        assert!(!record.similarity.similar_exists);
        assert_eq!(record.similarity.matched_question, None);
        assert_eq!(record.similarity.predicted_topic, UNKNOWN_TOPIC);
        assert_eq!(record.attributes, AttributePrediction::default());
        assert!(record.error.as_deref().is_some_and(|m| m.contains("boom")));
    }

    #[test]
    fn test_record_serializes_flat() {
        let record = AnalysisRecord {
            question: "q".to_string(),
            similarity: SimilarityResult::unmatched("Math"),
            attributes: AttributePrediction {
                marks: 2.0,
                weightage: 1.0,
            },
            error: None,
        };
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["question"], "q");
        assert_eq!(json["predicted_topic"], "Math");
        assert_eq!(json["marks"], 2.0);
        assert!(json.get("error").is_none());
        assert!(json.get("similarity").is_none());
    }
}
