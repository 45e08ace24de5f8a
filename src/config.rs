use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::context::ContextSettings;
use crate::embedding::download;
use crate::matcher::DEFAULT_SIMILARITY_THRESHOLD;
use crate::predict::{TrainingConfig, DEFAULT_CONFIDENCE_FLOOR};

/// Which sentence embedder to use.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbedderBackend {
    /// Local ONNX all-MiniLM-L6-v2 (default). Needs `quizmatch download-model`.
    Onnx,
    /// Feature hashing over word tokens. No model files; lexical similarity only.
    Hash,
}

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded automatically at startup via dotenvy.
#[derive(Debug, Clone)]
pub struct Config {
    /// CSV question bank with question, topic, marks and weightage columns.
    pub dataset_path: PathBuf,
    /// Which embedder to use (default: Onnx)
    pub embedder_backend: EmbedderBackend,
    /// Directory containing the ONNX model files
    pub model_dir: PathBuf,
    pub similarity_threshold: f64,
    /// Topic predictions below this probability are reported as "Unknown".
    pub topic_confidence_floor: f64,
    /// Compute hold-out accuracies at startup for `metrics`.
    pub holdout_metrics: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from any key lookup. `load` passes the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let embedder_backend = match lookup("QUIZMATCH_EMBEDDER").as_deref().map(str::trim) {
            Some("hash") => EmbedderBackend::Hash,
            // "onnx" or unset both default to ONNX
            None | Some("") | Some("onnx") => EmbedderBackend::Onnx,
            Some(other) => anyhow::bail!(
                "QUIZMATCH_EMBEDDER must be 'onnx' or 'hash', got '{other}'"
            ),
        };

        let model_dir = lookup("QUIZMATCH_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(download::default_model_dir);

        let similarity_threshold: f64 = parse_var(
            &lookup,
            "QUIZMATCH_SIMILARITY_THRESHOLD",
            DEFAULT_SIMILARITY_THRESHOLD,
        )?;
        if !(-1.0..=1.0).contains(&similarity_threshold) {
            anyhow::bail!(
                "QUIZMATCH_SIMILARITY_THRESHOLD must be between -1 and 1, got {similarity_threshold}"
            );
        }

        let topic_confidence_floor: f64 = parse_var(
            &lookup,
            "QUIZMATCH_TOPIC_CONFIDENCE_FLOOR",
            DEFAULT_CONFIDENCE_FLOOR,
        )?;
        if !(0.0..=1.0).contains(&topic_confidence_floor) {
            anyhow::bail!(
                "QUIZMATCH_TOPIC_CONFIDENCE_FLOOR must be between 0 and 1, got {topic_confidence_floor}"
            );
        }

        Ok(Self {
            dataset_path: lookup("QUIZMATCH_DATASET")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./Final_dataset.csv")),
            embedder_backend,
            model_dir,
            similarity_threshold,
            topic_confidence_floor,
            holdout_metrics: parse_var(&lookup, "QUIZMATCH_HOLDOUT_METRICS", true)?,
        })
    }

    /// Validate that the chosen embedder has what it needs.
    /// For ONNX the model files must exist (or user should run download-model).
    pub fn require_embedder(&self) -> Result<()> {
        match self.embedder_backend {
            EmbedderBackend::Onnx => {
                if !download::embedding_files_present(&self.model_dir) {
                    anyhow::bail!(
                        "Embedding model files not found in {}\n\
                         Run `quizmatch download-model` to download them.\n\
                         Or set QUIZMATCH_EMBEDDER=hash to use the feature-hashing embedder.",
                        self.model_dir.display()
                    );
                }
                Ok(())
            }
            EmbedderBackend::Hash => Ok(()),
        }
    }

    pub fn context_settings(&self) -> ContextSettings {
        ContextSettings {
            similarity_threshold: self.similarity_threshold,
            topic_confidence_floor: self.topic_confidence_floor,
            training: TrainingConfig::default(),
            holdout_metrics: self.holdout_metrics,
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} has invalid value '{raw}'")),
        _ => Ok(default),
    }
}
