use async_trait::async_trait;

use crate::domain::DomainError;

/// Turns sentences into fixed-size vectors for similarity search.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, DomainError> {
        self.embed(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| DomainError::backend("embedder returned no vector"))
    }

    fn dimensions(&self) -> usize;

    fn model(&self) -> &str;
}
