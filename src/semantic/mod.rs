//! Semantic similarity machinery for record search.
//!
//! - `embeddings`: wraps fastembed for multilingual embedding generation
//! - `ranker`: cosine-similarity scoring and stable top-K ordering

pub mod embeddings;
pub mod ranker;

pub use embeddings::{EmbeddingError, EmbeddingModel};
pub use ranker::{cosine_similarity, rank};

/// Seam between the search pipeline and the embedding backend. The i-th
/// output vector corresponds to the i-th input text.
pub trait Embedder: Send + Sync {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

impl Embedder for EmbeddingModel {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        EmbeddingModel::embed_batch(self, texts)
    }
}

/// Default embedding model: the multilingual paraphrase MiniLM handles the
/// mixed Ukrainian/Latin text the archive holds.
pub const DEFAULT_MODEL: &str = "paraphrase-multilingual-minilm-l12-v2";
