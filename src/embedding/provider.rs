use async_trait::async_trait;

use super::EmbeddingError;


/// Source of dense vectors for concept texts. Implementations must be
/// deterministic for a fixed model: the same text yields the same vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embeds texts in order. The default issues one request per text.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Expected vector dimension, when known before the first request.
    fn dimension(&self) -> Option<usize>;

    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;
}
