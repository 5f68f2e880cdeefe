use async_trait::async_trait;

use crate::error::Result;

/// External text → vector capability.
///
/// Implementations must return vectors of [`dimensions`](Self::dimensions) length for
/// every input; the corpus rejects mixed dimensionality.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, preserving input order. The default calls `embed` per item.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn model_name(&self) -> &str;

    fn dimensions(&self) -> usize;
}
