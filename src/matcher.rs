// Near-duplicate search over the reference corpus.
//
// Every reference question whose cosine similarity to the query reaches the
// threshold counts as a match. Matches are kept in corpus order and the
// reported duplicate is the first one in that order, not the closest one.

use serde::{Deserialize, Serialize};

use crate::corpus::ReferenceCorpus;

/// Default similarity threshold. A score equal to the threshold matches.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.6;

/// Cosine similarity between two embedding vectors, in [-1, 1].
///
/// Returns 0.0 for empty input, mismatched dimensions, or a zero vector.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    let denom = mag_a * mag_b;
    if denom < f64::EPSILON {
        0.0
    } else {
        (dot / denom).clamp(-1.0, 1.0)
    }
}

/// A reference question that scored at or above the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMatch {
    /// Position in the reference corpus.
    pub index: usize,
    pub score: f64,
}

/// Outcome of comparing one query against the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub similar_exists: bool,
    pub same_topic: bool,
    pub predicted_topic: String,
    pub matched_question: Option<String>,
}

impl SimilarityResult {
    /// The result for a query that could not be compared at all.
    pub fn unmatched(predicted_topic: &str) -> Self {
        Self {
            similar_exists: false,
            same_topic: false,
            predicted_topic: predicted_topic.to_string(),
            matched_question: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityMatcher {
    threshold: f64,
}

impl Default for SimilarityMatcher {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

impl SimilarityMatcher {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Whether a similarity score counts as a match. Inclusive.
    pub fn is_similar(&self, score: f64) -> bool {
        score >= self.threshold
    }

    /// All reference questions at or above the threshold, in corpus order.
    pub fn find_matches(&self, corpus: &ReferenceCorpus, query: &[f64]) -> Vec<ScoredMatch> {
        corpus
            .questions()
            .iter()
            .enumerate()
            .filter_map(|(index, q)| {
                let score = cosine_similarity(query, &q.embedding);
                self.is_similar(score).then_some(ScoredMatch { index, score })
            })
            .collect()
    }

    /// Compare `query` against the corpus.
    ///
    /// `resolved_topic` is the caller-supplied topic, or the predicted one
    /// when the caller gave none; `same_topic` is true when any match carries
    /// it. `predicted_topic` is reported as-is.
    pub fn evaluate(
        &self,
        corpus: &ReferenceCorpus,
        query: &[f64],
        resolved_topic: &str,
        predicted_topic: &str,
    ) -> SimilarityResult {
        let matches = self.find_matches(corpus, query);
        let questions = corpus.questions();

        let same_topic = matches
            .iter()
            .any(|m| questions[m.index].topic.as_deref() == Some(resolved_topic));
        let matched_question = matches.first().map(|m| questions[m.index].text.clone());

        SimilarityResult {
            similar_exists: !matches.is_empty(),
            same_topic,
            predicted_topic: predicted_topic.to_string(),
            matched_question,
        }
    }
}
