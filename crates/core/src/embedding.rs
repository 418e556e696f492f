//! Embedder trait: maps text to fixed-dimension vectors.
//!
//! The embedding capability is external (an HTTP model, a local stub, ...)
//! and treated as a pure function text → vector.

use async_trait::async_trait;
use crate::error::IndexError;

/// A fixed-length vector representing a chunk or query.
pub type Embedding = Vec<f32>;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// A human-readable name (e.g., "openrouter:text-embedding-3-small", "stub").
    fn name(&self) -> &str;

    /// Embed many texts; the result has one vector per input, in order.
    async fn embed_batch(&self, texts: &[String]) -> std::result::Result<Vec<Embedding>, IndexError>;

    /// Embed a single text.
    ///
    /// Default implementation delegates to `embed_batch` with one input.
    async fn embed(&self, text: &str) -> std::result::Result<Embedding, IndexError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        match vectors.pop() {
            Some(v) if vectors.is_empty() => Ok(v),
            _ => Err(IndexError::Embedding(format!(
                "Embedder '{}' did not return exactly one vector",
                self.name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<Embedding>);

    #[async_trait]
    impl Embedder for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Embedding>, IndexError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn single_embed_uses_batch() {
        let e = Fixed(vec![vec![1.0, 2.0]]);
        assert_eq!(e.embed("x").await.unwrap(), vec![1.0, 2.0]);
    }

    #[tokio::test]
    async fn single_embed_rejects_wrong_count() {
        let e = Fixed(vec![vec![1.0], vec![2.0]]);
        assert!(e.embed("x").await.is_err());
        let e = Fixed(vec![]);
        assert!(e.embed("x").await.is_err());
    }
}
