// Inference context — everything a query needs, built once at startup.
//
// Holds the embedder, the embedded corpus, the fitted predictors and the
// training metrics. Nothing in it changes after construction, so one
// instance is shared by reference (or Arc) across all concurrent queries.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{Config, EmbedderBackend};
use crate::corpus::{load_dataset, DatasetRow, ReferenceCorpus, ReferenceQuestion};
use crate::embedding::download::embedding_model_dir;
use crate::embedding::hashing::HashEmbedder;
use crate::embedding::onnx::SentenceEmbedder;
use crate::embedding::{Embedder, Embedding};
use crate::error::{ContextError, EmbeddingError};
use crate::matcher::{SimilarityMatcher, SimilarityResult, DEFAULT_SIMILARITY_THRESHOLD};
use crate::predict::metrics::{corpus_counts, holdout_metrics};
use crate::predict::{
    AttributePrediction, AttributePredictors, TopicPrediction, TrainingConfig,
    DEFAULT_CONFIDENCE_FLOOR,
};

/// Tunables applied when the context is built.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextSettings {
    pub similarity_threshold: f64,
    pub topic_confidence_floor: f64,
    pub training: TrainingConfig,
    /// Fit throwaway models on an 80/20 split to report accuracies.
    pub holdout_metrics: bool,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            topic_confidence_floor: DEFAULT_CONFIDENCE_FLOOR,
            training: TrainingConfig::default(),
            holdout_metrics: true,
        }
    }
}

/// How the topic of a query was settled.
///
/// With no caller topic the prediction is used directly. With one, the
/// prediction is compared against it; `mismatch` is true when they differ
/// (reported to clients as `invalid_topic`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TopicResolution {
    Predicted {
        predicted: TopicPrediction,
    },
    Checked {
        expected: String,
        predicted: TopicPrediction,
        mismatch: bool,
    },
}

impl TopicResolution {
    /// The topic matches are compared against: the caller's if given,
    /// otherwise the predicted one.
    pub fn resolved_topic(&self) -> &str {
        match self {
            TopicResolution::Predicted { predicted } => &predicted.topic,
            TopicResolution::Checked { expected, .. } => expected,
        }
    }

    pub fn predicted(&self) -> &TopicPrediction {
        match self {
            TopicResolution::Predicted { predicted } => predicted,
            TopicResolution::Checked { predicted, .. } => predicted,
        }
    }

    /// `Some(true)` when a caller topic was given and differs from the
    /// prediction, `None` when no topic was given.
    pub fn mismatch(&self) -> Option<bool> {
        match self {
            TopicResolution::Predicted { .. } => None,
            TopicResolution::Checked { mismatch, .. } => Some(*mismatch),
        }
    }
}

/// Full answer for one submitted question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionCheck {
    pub question: String,
    pub similarity: SimilarityResult,
    pub topic: TopicResolution,
    pub attributes: AttributePrediction,
    /// Set when marks/weightage fell back to 0.
    pub prediction_error: Option<String>,
}

pub struct InferenceContext {
    embedder: Box<dyn Embedder>,
    corpus: ReferenceCorpus,
    predictors: AttributePredictors,
    matcher: SimilarityMatcher,
    metrics: BTreeMap<String, f64>,
    initialized_at: DateTime<Utc>,
}

impl fmt::Debug for InferenceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceContext")
            .field("model_id", &self.embedder.model_id())
            .field("questions", &self.corpus.len())
            .field("threshold", &self.matcher.threshold())
            .field("metrics", &self.metrics)
            .field("initialized_at", &self.initialized_at)
            .finish_non_exhaustive()
    }
}

impl InferenceContext {
    /// Embed `rows` and fit every model.
    pub fn build(
        embedder: Box<dyn Embedder>,
        rows: Vec<DatasetRow>,
        settings: &ContextSettings,
    ) -> Result<Self, ContextError> {
        let corpus = ReferenceCorpus::build(rows, embedder.as_ref())?;
        Self::from_corpus(embedder, corpus, settings)
    }

    /// Fit every model on an already-embedded corpus.
    ///
    /// Fails if the corpus was embedded by a different model than `embedder`.
    pub fn from_corpus(
        embedder: Box<dyn Embedder>,
        corpus: ReferenceCorpus,
        settings: &ContextSettings,
    ) -> Result<Self, ContextError> {
        if corpus.model_id() != embedder.model_id() {
            return Err(ContextError::ModelMismatch {
                corpus: corpus.model_id().to_string(),
                query: embedder.model_id().to_string(),
            });
        }

        let started = Instant::now();
        let all: Vec<&ReferenceQuestion> = corpus.questions().iter().collect();
        let predictors =
            AttributePredictors::fit(&all, settings.topic_confidence_floor, &settings.training);

        let metrics = if settings.holdout_metrics {
            holdout_metrics(&corpus, settings.topic_confidence_floor, &settings.training)
        } else {
            corpus_counts(&corpus)
        };

        info!(
            questions = corpus.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Inference context ready"
        );

        Ok(Self {
            embedder,
            corpus,
            predictors,
            matcher: SimilarityMatcher::new(settings.similarity_threshold),
            metrics,
            initialized_at: Utc::now(),
        })
    }

    /// Replace the fitted predictors, keeping the corpus and metrics.
    ///
    /// Predictors fit on another embedding dimension fail every query with a
    /// dimension mismatch; callers see that as a prediction error.
    pub fn with_predictors(mut self, predictors: AttributePredictors) -> Self {
        self.predictors = predictors;
        self
    }

    pub fn corpus(&self) -> &ReferenceCorpus {
        &self.corpus
    }

    pub fn predictors(&self) -> &AttributePredictors {
        &self.predictors
    }

    pub fn matcher(&self) -> &SimilarityMatcher {
        &self.matcher
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    pub fn initialized_at(&self) -> DateTime<Utc> {
        self.initialized_at
    }

    /// Embed a query with the same model the corpus was built with.
    pub fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        self.embedder.embed(text)
    }

    /// Predict the topic of `embedding` and, if the caller named one,
    /// compare the two. A blank expected topic counts as none.
    pub fn resolve_topic(&self, embedding: &[f64], expected: Option<&str>) -> TopicResolution {
        let predicted = self.predictors.topic.predict(embedding).unwrap_or_else(|e| {
            warn!(error = %e, "Topic prediction failed, reporting Unknown");
            TopicPrediction::unknown()
        });

        match expected.map(str::trim).filter(|t| !t.is_empty()) {
            Some(expected) => TopicResolution::Checked {
                mismatch: expected != predicted.topic,
                expected: expected.to_string(),
                predicted,
            },
            None => TopicResolution::Predicted { predicted },
        }
    }

    /// Compare an embedding against the corpus, resolving its topic first.
    pub fn match_embedding(
        &self,
        embedding: &[f64],
        query_topic: Option<&str>,
    ) -> (SimilarityResult, TopicResolution) {
        let topic = self.resolve_topic(embedding, query_topic);
        let similarity = self.matcher.evaluate(
            &self.corpus,
            embedding,
            topic.resolved_topic(),
            &topic.predicted().topic,
        );
        (similarity, topic)
    }

    /// Marks and weightage, or the zero default plus the error message.
    pub fn predict_attributes(&self, embedding: &[f64]) -> (AttributePrediction, Option<String>) {
        match self.predictors.predict_attributes(embedding) {
            Ok(prediction) => (prediction, None),
            Err(e) => {
                warn!(error = %e, "Attribute prediction failed, using defaults");
                (AttributePrediction::default(), Some(e.to_string()))
            }
        }
    }

    /// Check one question, optionally against an expected topic.
    pub fn check_question(
        &self,
        text: &str,
        topic: Option<&str>,
    ) -> Result<QuestionCheck, EmbeddingError> {
        let embedding = self.embed(text)?;
        let (similarity, topic) = self.match_embedding(&embedding, topic);
        let (attributes, prediction_error) = self.predict_attributes(&embedding);

        Ok(QuestionCheck {
            question: text.to_string(),
            similarity,
            topic,
            attributes,
            prediction_error,
        })
    }

    /// Distinct topics known to the reference corpus.
    pub fn list_topics(&self) -> BTreeSet<String> {
        self.corpus.distinct_topics()
    }

    /// Corpus counts and, if enabled, hold-out accuracies.
    pub fn model_metrics(&self) -> &BTreeMap<String, f64> {
        &self.metrics
    }
}

/// Build the embedder selected in `config`.
pub fn create_embedder(config: &Config) -> Result<Box<dyn Embedder>> {
    match config.embedder_backend {
        EmbedderBackend::Onnx => {
            config.require_embedder()?;
            let dir = embedding_model_dir(&config.model_dir);
            let embedder = SentenceEmbedder::load(&dir)
                .with_context(|| format!("Failed to load embedding model from {}", dir.display()))?;
            info!("Using local ONNX sentence embedder");
            Ok(Box::new(embedder))
        }
        EmbedderBackend::Hash => {
            info!("Using feature-hashing embedder");
            Ok(Box::new(HashEmbedder::default()))
        }
    }
}

/// Load the dataset, embed it and fit the models. Any failure here is fatal
/// to the caller: there is nothing to serve without a context.
pub fn initialize(config: &Config) -> Result<InferenceContext> {
    let started = Instant::now();
    let embedder = create_embedder(config)?;

    let rows = load_dataset(&config.dataset_path).with_context(|| {
        format!(
            "Failed to load question bank from {}",
            config.dataset_path.display()
        )
    })?;

    let context = InferenceContext::build(embedder, rows, &config.context_settings())
        .context("Failed to build inference context")?;

    info!(
        questions = context.corpus().len(),
        topics = context.list_topics().len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Initialization complete"
    );
    Ok(context)
}
