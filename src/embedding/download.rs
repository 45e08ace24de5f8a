// Model download helper for the sentence embedding model.
//
// Fetches all-MiniLM-L6-v2 (ONNX export + tokenizer) from HuggingFace into
// a platform-appropriate directory (~/.local/share/quizmatch/models/ on
// Linux) so it persists across runs.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// HuggingFace repo for the sentence embedding model.
const EMBEDDING_HF_URL: &str =
    "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main";

/// Remote paths within the HuggingFace repo.
const REMOTE_MODEL_FILE: &str = "onnx/model.onnx";
const REMOTE_TOKENIZER_FILE: &str = "tokenizer.json";

/// Local file names within the embedding model directory.
const MODEL_FILE: &str = "model.onnx";
const TOKENIZER_FILE: &str = "tokenizer.json";

/// (remote path, local name, shown with a progress bar)
const MODEL_FILES: [(&str, &str, bool); 2] = [
    (REMOTE_TOKENIZER_FILE, TOKENIZER_FILE, false),
    (REMOTE_MODEL_FILE, MODEL_FILE, true),
];

/// Returns the default directory for storing model files.
pub fn default_model_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("quizmatch")
        .join("models")
}

/// Subdirectory within model_dir for the sentence embedding model.
pub fn embedding_model_dir(base: &Path) -> PathBuf {
    base.join("all-MiniLM-L6-v2")
}

/// Check whether both required embedding model files exist.
pub fn embedding_files_present(base: &Path) -> bool {
    let embed_dir = embedding_model_dir(base);
    MODEL_FILES
        .iter()
        .all(|(_, local, _)| embed_dir.join(local).exists())
}

/// Download the embedding model into `base`, skipping files that already exist.
pub async fn download_model(base: &Path) -> Result<()> {
    let embed_dir = embedding_model_dir(base);
    std::fs::create_dir_all(&embed_dir).with_context(|| {
        format!(
            "Failed to create embedding model directory: {}",
            embed_dir.display()
        )
    })?;

    println!("\nSentence embedding model (all-MiniLM-L6-v2):");

    let client = reqwest::Client::new();
    for (remote, local, show_progress) in MODEL_FILES {
        let dest = embed_dir.join(local);
        if dest.exists() {
            info!(file = local, "Model file already exists, skipping");
            println!("  {local} (already exists)");
            continue;
        }

        println!("  Downloading {local}...");
        download_file(&client, &format!("{EMBEDDING_HF_URL}/{remote}"), &dest, show_progress)
            .await?;
    }

    Ok(())
}

/// Bar when the size is known, spinner otherwise.
fn progress_bar(total: Option<u64>) -> Result<ProgressBar> {
    let (pb, style) = match total {
        Some(size) => (
            ProgressBar::new(size),
            ProgressStyle::default_bar()
                .template("    [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                .context("invalid progress template")?
                .progress_chars("=> "),
        ),
        None => (
            ProgressBar::new_spinner(),
            ProgressStyle::default_spinner()
                .template("    {spinner} {bytes}")
                .context("invalid progress template")?,
        ),
    };
    pb.set_style(style);
    Ok(pb)
}

/// Stream `url` into `dest` through a `.partial` file, so an interrupted
/// download never leaves a truncated model behind.
async fn download_file(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    show_progress: bool,
) -> Result<()> {
    let mut response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to download {url}"))?;

    if !response.status().is_success() {
        anyhow::bail!("Download failed with status {}: {}", response.status(), url);
    }

    let pb = if show_progress {
        progress_bar(response.content_length())?
    } else {
        ProgressBar::hidden()
    };

    let partial = dest.with_extension("partial");
    let mut file = std::fs::File::create(&partial)
        .with_context(|| format!("Failed to create {}", partial.display()))?;

    while let Some(chunk) = response
        .chunk()
        .await
        .context("Failed to read response body")?
    {
        file.write_all(&chunk)
            .with_context(|| format!("Failed to write {}", partial.display()))?;
        pb.inc(chunk.len() as u64);
    }
    drop(file);

    std::fs::rename(&partial, dest)
        .with_context(|| format!("Failed to move download into {}", dest.display()))?;
    pb.finish_and_clear();

    info!("Downloaded {} to {}", url, dest.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_model_dir_is_under_quizmatch() {
        let dir = default_model_dir();
        let path_str = dir.to_string_lossy();
        assert!(
            path_str.contains("quizmatch") && path_str.contains("models"),
            "Expected path containing quizmatch/models, got: {path_str}"
        );
    }

    #[test]
    fn test_embedding_model_dir_is_subdirectory() {
        let base = PathBuf::from("/tmp/test-models");
        assert_eq!(embedding_model_dir(&base), base.join("all-MiniLM-L6-v2"));
    }

    #[test]
    fn test_embedding_files_present_false_when_empty() {
        let dir = std::env::temp_dir().join("quizmatch-test-nonexistent");
        assert!(!embedding_files_present(&dir));
    }

    #[test]
    fn test_embedding_files_present_true_when_files_exist() {
        let dir = std::env::temp_dir().join("quizmatch-embed-test");
        let embed_dir = embedding_model_dir(&dir);
        std::fs::create_dir_all(&embed_dir).unwrap();
        std::fs::write(embed_dir.join("model.onnx"), b"fake").unwrap();
        std::fs::write(embed_dir.join("tokenizer.json"), b"fake").unwrap();

        assert!(embedding_files_present(&dir));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_progress_bar_uses_content_length() {
        assert_eq!(progress_bar(Some(1024)).unwrap().length(), Some(1024));
        assert_eq!(progress_bar(None).unwrap().length(), None);
    }

    #[test]
    fn test_tokenizer_is_fetched_before_model() {
        let locals: Vec<&str> = MODEL_FILES.iter().map(|(_, local, _)| *local).collect();
        assert_eq!(locals, vec![TOKENIZER_FILE, MODEL_FILE]);
    }
}
