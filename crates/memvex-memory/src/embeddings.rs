// embeddings.rs — Extension point for semantic recall.
//
// Recall is lexical today. A provider that returns real vectors lets the
// service reorder lexical hits by similarity to the query; the no-op
// provider returns empty vectors, which leaves lexical order untouched.

use crate::error::MemoryError;

pub trait EmbeddingProvider: Send + Sync {
    /// Provider name, for logs and status output.
    fn name(&self) -> &str;

    /// Embed `text`. An empty vector means "no embedding available".
    fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError>;

    /// Similarity between two vectors; higher is closer.
    fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        cosine_similarity(a, b)
    }
}

/// Placeholder provider: no vectors, zero similarity.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpEmbeddingProvider;

impl EmbeddingProvider for NoOpEmbeddingProvider {
    fn name(&self) -> &str {
        "none"
    }

    fn embed(&self, _text: &str) -> Result<Vec<f32>, MemoryError> {
        Ok(Vec::new())
    }

    fn similarity(&self, _a: &[f32], _b: &[f32]) -> f32 {
        0.0
    }
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
