// Hold-out evaluation of the attribute predictors.
//
// A seeded shuffle splits the corpus 80/20, throwaway models are fit on
// the 80% and scored on the 20%. The serving models are always fit on the
// whole corpus; these numbers are diagnostic only.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;

use super::predictors::{Attribute, TopicPredictor, ValuePredictor};
use super::softmax::TrainingConfig;
use crate::corpus::{ReferenceCorpus, ReferenceQuestion};

/// Seed for the hold-out shuffle.
pub const SPLIT_SEED: u64 = 42;

/// Fraction of the corpus held out for scoring.
pub const TEST_FRACTION: f64 = 0.2;

/// Smallest corpus for which a split is attempted.
pub const MIN_ROWS_FOR_SPLIT: usize = 5;

/// Corpus counts that are always reported.
pub fn corpus_counts(corpus: &ReferenceCorpus) -> BTreeMap<String, f64> {
    let mut metrics = BTreeMap::new();
    metrics.insert("corpus_size".to_string(), corpus.len() as f64);
    metrics.insert(
        "topic_count".to_string(),
        corpus.distinct_topics().len() as f64,
    );
    metrics
}

/// Split indices `0..n` into (train, test) with a seeded shuffle.
pub fn train_test_split(n: usize, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));

    let test_len = ((n as f64) * TEST_FRACTION).ceil() as usize;
    let train = indices.split_off(test_len.min(n));
    (train, indices)
}

/// Corpus counts plus hold-out accuracies for topic, marks and weightage.
///
/// Accuracies are omitted when the corpus is smaller than
/// `MIN_ROWS_FOR_SPLIT` or a split has no labelled rows for an attribute.
pub fn holdout_metrics(
    corpus: &ReferenceCorpus,
    confidence_floor: f64,
    config: &TrainingConfig,
) -> BTreeMap<String, f64> {
    let mut metrics = corpus_counts(corpus);
    if corpus.len() < MIN_ROWS_FOR_SPLIT {
        return metrics;
    }

    let questions = corpus.questions();
    let (train_idx, test_idx) = train_test_split(questions.len(), SPLIT_SEED);
    let train: Vec<&ReferenceQuestion> = train_idx.iter().map(|&i| &questions[i]).collect();
    let test: Vec<&ReferenceQuestion> = test_idx.iter().map(|&i| &questions[i]).collect();

    metrics.insert("train_size".to_string(), train.len() as f64);
    metrics.insert("test_size".to_string(), test.len() as f64);

    let topic = TopicPredictor::fit(&train, confidence_floor, config);
    if topic.is_fitted() {
        let scored: Vec<bool> = test
            .iter()
            .filter_map(|q| {
                let expected = q.topic.as_deref()?;
                let predicted = topic.predict(&q.embedding).ok()?;
                Some(predicted.topic == expected)
            })
            .collect();
        if let Some(acc) = accuracy(&scored) {
            metrics.insert("topic_accuracy".to_string(), acc);
        }
    }

    for attribute in [Attribute::Marks, Attribute::Weightage] {
        let predictor = ValuePredictor::fit(&train, attribute, config);
        if predictor.classes().is_empty() {
            continue;
        }
        let scored: Vec<bool> = test
            .iter()
            .filter_map(|q| {
                let expected = predictor.target(q)?;
                let predicted = predictor.predict(&q.embedding).ok()?;
                Some(predicted == expected)
            })
            .collect();
        if let Some(acc) = accuracy(&scored) {
            metrics.insert(format!("{}_accuracy", attribute.name()), acc);
        }
    }

    info!(?metrics, "Computed hold-out metrics");
    metrics
}

fn accuracy(outcomes: &[bool]) -> Option<f64> {
    if outcomes.is_empty() {
        return None;
    }
    let correct = outcomes.iter().filter(|&&ok| ok).count();
    Some(correct as f64 / outcomes.len() as f64)
}
