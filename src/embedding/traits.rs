// Embedder trait: swap-ready abstraction over embedding backends.

use crate::error::EmbeddingError;

/// A dense semantic vector. Dimension is fixed by the producing model.
pub type Embedding = Vec<f64>;

/// Maps question text to embeddings. Implementations must be deterministic
/// for a fixed model and input, and must accept the empty string.
///
/// Calls are synchronous and CPU-bound. Async callers should wrap them in
/// `spawn_blocking`.
pub trait Embedder: Send + Sync {
    /// Identifies the model and its configuration. Embeddings from two
    /// embedders with different ids are never compared.
    fn model_id(&self) -> &str;

    /// Embed a batch of texts, returning vectors in input order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingError>;

    /// Embed a single text.
    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| EmbeddingError::Inference("model returned no embedding".to_string()))
    }
}
