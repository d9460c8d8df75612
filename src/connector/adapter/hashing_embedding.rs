use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

use crate::application::EmbeddingService;
use crate::domain::DomainError;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 512;

/// Bag-of-words embedding by feature hashing.
///
/// Each lowercased word adds +1 or -1 to one of `dimensions` buckets, both
/// picked by the word's hash, and the vector is L2-normalized. Sentences that
/// share words score close; no model download is needed.
pub struct HashingEmbedding {
    dimensions: usize,
    model: String,
}

impl HashingEmbedding {
    pub fn new() -> Self {
        Self::with_dimensions(DEFAULT_EMBEDDING_DIMENSIONS)
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        let dimensions = dimensions.max(1);
        Self {
            dimensions,
            model: format!("hashing-bow-{}", dimensions),
        }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for word in text.unicode_words() {
            let word = word.to_lowercase();
            let mut hasher = DefaultHasher::new();
            word.hash(&mut hasher);
            let hash = hasher.finish();

            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for x in &mut vector {
                *x /= magnitude;
            }
        }
        vector
    }
}

impl Default for HashingEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingService for HashingEmbedding {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError> {
        debug!(
            "Embedding {} texts with {} dimensions",
            texts.len(),
            self.dimensions
        );
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Cosine similarity of two vectors of equal length.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hashing_embedding_dimensions_and_norm() {
        let embedder = HashingEmbedding::with_dimensions(64);
        let vectors = embedder
            .embed(&["Mayon is a volcano.".to_string()])
            .await
            .unwrap();

        assert_eq!(vectors[0].len(), 64);
        let magnitude: f32 = vectors[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-5);
        assert_eq!(embedder.model(), "hashing-bow-64");
    }

    #[tokio::test]
    async fn test_shared_words_score_higher() {
        let embedder = HashingEmbedding::new();
        let query = embedder.embed_query("volcano eruption").await.unwrap();
        let related = embedder
            .embed_query("The volcano eruption buried the town.")
            .await
            .unwrap();
        let unrelated = embedder.embed_query("Rice is cheap today.").await.unwrap();

        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_case_does_not_matter_and_empty_text_is_zero() {
        let embedder = HashingEmbedding::new();
        let lower = embedder.embed_query("mayon").await.unwrap();
        let upper = embedder.embed_query("MAYON").await.unwrap();
        assert_eq!(lower, upper);

        let empty = embedder.embed_query("...").await.unwrap();
        assert!(empty.iter().all(|x| *x == 0.0));
        assert_eq!(cosine_similarity(&empty, &lower), 0.0);
    }
}
