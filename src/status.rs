// System status display: dataset, embedder backend and model files.
//
// Does not build the inference context, so it stays fast and works before
// the model has been downloaded.

use std::path::Path;

use anyhow::Result;

use crate::config::{Config, EmbedderBackend};
use crate::embedding::download::{embedding_files_present, embedding_model_dir};

/// Display system status to the terminal.
pub fn show(config: &Config) -> Result<()> {
    let dataset = &config.dataset_path;
    if dataset.exists() {
        let size = std::fs::metadata(dataset)
            .map(|m| format_bytes(m.len()))
            .unwrap_or_else(|_| "unknown".to_string());
        println!("Question bank: {} ({})", dataset.display(), size);
    } else {
        println!("Question bank: {} (missing)", dataset.display());
        println!("  Set QUIZMATCH_DATASET to the path of your CSV question bank");
    }

    match config.embedder_backend {
        EmbedderBackend::Onnx => {
            println!("Embedder: onnx (all-MiniLM-L6-v2)");
            show_model_files(&config.model_dir);
        }
        EmbedderBackend::Hash => {
            println!("Embedder: hash (feature hashing, no model files needed)");
        }
    }

    println!(
        "Similarity threshold: {:.2}  |  Topic confidence floor: {:.2}",
        config.similarity_threshold, config.topic_confidence_floor
    );
    println!(
        "Hold-out metrics: {}",
        if config.holdout_metrics { "on" } else { "off" }
    );

    Ok(())
}

fn show_model_files(model_dir: &Path) {
    let dir = embedding_model_dir(model_dir);
    if embedding_files_present(model_dir) {
        let size = ["model.onnx", "tokenizer.json"]
            .iter()
            .filter_map(|f| std::fs::metadata(dir.join(f)).ok())
            .map(|m| m.len())
            .sum();
        println!("Model files: {} ({})", dir.display(), format_bytes(size));
    } else {
        println!("Model files: not downloaded");
        println!("  Run `quizmatch download-model` to fetch them");
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
