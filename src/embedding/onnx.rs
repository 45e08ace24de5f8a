// Sentence embeddings with all-MiniLM-L6-v2 running locally via ONNX.
//
// Each question is tokenized, run through the BERT encoder, and mean-pooled
// over the attention mask into a 384-dimensional vector. Two phrasings of
// the same question ("Define osmosis" / "What is osmosis?") land close
// together even when they share few words.

use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Tensor;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::debug;

use super::traits::{Embedder, Embedding};
use crate::error::EmbeddingError;

/// Embedding dimension for all-MiniLM-L6-v2.
pub const EMBEDDING_DIM: usize = 384;

/// Identifier recorded on every corpus built with this model.
pub const MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Token limit the model was trained with. Longer questions are truncated.
const MAX_SEQ_LEN: usize = 256;

/// Texts per inference call. Bounds the padded tensor size when the whole
/// reference corpus is embedded at startup.
const CHUNK_SIZE: usize = 32;

/// Sentence embedder using a local ONNX model.
///
/// `Session::run` takes `&mut self`, so the session sits behind a Mutex.
/// The tokenizer is immutable after load and needs no lock.
pub struct SentenceEmbedder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
}

impl SentenceEmbedder {
    /// Load the model and tokenizer from `model_dir`.
    ///
    /// Expects `model.onnx` and `tokenizer.json` in the directory.
    /// Run `quizmatch download-model` first if they don't exist.
    pub fn load(model_dir: &Path) -> Result<Self, EmbeddingError> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() {
            return Err(EmbeddingError::ModelUnavailable(format!(
                "{} not found. Run `quizmatch download-model` to download it.",
                model_path.display()
            )));
        }
        if !tokenizer_path.exists() {
            return Err(EmbeddingError::ModelUnavailable(format!(
                "{} not found. Run `quizmatch download-model` to download it.",
                tokenizer_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e| EmbeddingError::ModelUnavailable(format!("session builder: {e}")))?
            .commit_from_file(&model_path)
            .map_err(|e| {
                EmbeddingError::ModelUnavailable(format!(
                    "failed to load {}: {e}",
                    model_path.display()
                ))
            })?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            EmbeddingError::ModelUnavailable(format!("failed to load tokenizer: {e}"))
        })?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQ_LEN,
                ..Default::default()
            }))
            .map_err(|e| EmbeddingError::ModelUnavailable(format!("bad truncation config: {e}")))?;

        debug!(
            "Loaded sentence embedding model from {}",
            model_dir.display()
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
        })
    }

    /// Tokenize, run inference and mean-pool one chunk of texts.
    fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingError> {
        let encodings = texts
            .iter()
            .map(|t| {
                self.tokenizer
                    .encode(t.as_str(), true)
                    .map_err(|e| EmbeddingError::Tokenization(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let batch_size = encodings.len();
        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        if max_len == 0 {
            return Ok(vec![vec![0.0; EMBEDDING_DIM]; batch_size]);
        }

        // BERT inputs, padded to max_len with pad id 0 and mask 0.
        let mut input_ids_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);
        let mut attention_mask_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);
        let mut token_type_ids_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);

        for enc in &encodings {
            let ids = enc.get_ids();
            let mask = enc.get_attention_mask();
            let pad_len = max_len - ids.len();

            input_ids_flat.extend(ids.iter().map(|&id| id as i64));
            input_ids_flat.extend(std::iter::repeat_n(0i64, pad_len));
            attention_mask_flat.extend(mask.iter().map(|&m| m as i64));
            attention_mask_flat.extend(std::iter::repeat_n(0i64, pad_len));
            token_type_ids_flat.extend(std::iter::repeat_n(0i64, max_len));
        }

        let shape = [batch_size as i64, max_len as i64];
        let input_ids_tensor = Tensor::from_array((shape, input_ids_flat)).map_err(inference_err)?;
        let attention_mask_tensor =
            Tensor::from_array((shape, attention_mask_flat.clone())).map_err(inference_err)?;
        let token_type_ids_tensor =
            Tensor::from_array((shape, token_type_ids_flat)).map_err(inference_err)?;

        // last_hidden_state: [batch, seq_len, 384]
        let hidden_states = {
            let mut session = self
                .session
                .lock()
                .map_err(|e| EmbeddingError::ModelUnavailable(format!("session lock poisoned: {e}")))?;

            let outputs = session
                .run(ort::inputs! {
                    "input_ids" => input_ids_tensor,
                    "attention_mask" => attention_mask_tensor,
                    "token_type_ids" => token_type_ids_tensor
                })
                .map_err(inference_err)?;

            let (_shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(inference_err)?;

            data.to_vec()
        };

        let expected = batch_size * max_len * EMBEDDING_DIM;
        if hidden_states.len() != expected {
            return Err(EmbeddingError::Inference(format!(
                "unexpected output size {} (expected {expected})",
                hidden_states.len()
            )));
        }

        Ok(mean_pool(
            &hidden_states,
            &attention_mask_flat,
            batch_size,
            max_len,
        ))
    }
}

impl Embedder for SentenceEmbedder {
    fn model_id(&self) -> &str {
        MODEL_ID
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(CHUNK_SIZE) {
            embeddings.extend(self.embed_chunk(chunk)?);
        }

        debug!(
            batch_size = texts.len(),
            dim = EMBEDDING_DIM,
            "Computed sentence embeddings"
        );

        Ok(embeddings)
    }
}

fn inference_err(e: impl std::fmt::Display) -> EmbeddingError {
    EmbeddingError::Inference(e.to_string())
}

/// Average token embeddings weighted by the attention mask.
///
/// `hidden` is `[batch, max_len, EMBEDDING_DIM]` flattened row-major;
/// `mask` is `[batch, max_len]`.
fn mean_pool(hidden: &[f32], mask: &[i64], batch_size: usize, max_len: usize) -> Vec<Embedding> {
    let mut embeddings = Vec::with_capacity(batch_size);

    for i in 0..batch_size {
        let mut sum = vec![0.0_f64; EMBEDDING_DIM];
        let mut mask_sum = 0.0_f64;

        for j in 0..max_len {
            let mask_val = mask[i * max_len + j] as f64;
            if mask_val > 0.0 {
                mask_sum += mask_val;
                let offset = (i * max_len + j) * EMBEDDING_DIM;
                for (k, s) in sum.iter_mut().enumerate() {
                    *s += hidden[offset + k] as f64 * mask_val;
                }
            }
        }

        if mask_sum > 0.0 {
            for val in &mut sum {
                *val /= mask_sum;
            }
        }

        embeddings.push(sum);
    }

    embeddings
}
