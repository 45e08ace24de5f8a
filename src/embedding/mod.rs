// Embedding engine — text to fixed-length dense vectors.
//
// The Embedder trait is the seam between the pipeline and whichever model
// produces vectors. The default backend runs all-MiniLM-L6-v2 locally via
// ONNX; the hashing backend needs no model files and is used offline and
// in tests.

pub mod download;
pub mod hashing;
pub mod onnx;
pub mod traits;

pub use traits::{Embedder, Embedding};
