//! Embedder implementations.
//!
//! - [`ProviderEmbedder`] calls a provider's embedding endpoint in batches.
//! - [`StubEmbedder`] hashes tokens into a fixed-size vector; deterministic
//!   and offline, for tests and runs without an embedding model.

use std::sync::Arc;
use async_trait::async_trait;
use ragsmith_config::IndexingConfig;
use ragsmith_core::error::IndexError;
use ragsmith_core::provider::{EmbeddingRequest, Provider};
use ragsmith_core::{Embedder, Embedding};
use ragsmith_providers::ProviderRouter;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

/// Embeds text through a [`Provider`]'s embedding endpoint.
pub struct ProviderEmbedder {
    provider: Arc<dyn Provider>,
    model: String,
    dimensions: Option<usize>,
    batch_size: usize,
    name: String,
}

impl ProviderEmbedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        let model = model.into();
        let name = format!("{}:{}", provider.name(), model);
        Self {
            provider,
            model,
            dimensions: None,
            batch_size: 64,
            name,
        }
    }

    /// Ask the endpoint for vectors of this length.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Texts per request (minimum 1).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

#[async_trait]
impl Embedder for ProviderEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, IndexError> {
        let mut out = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            debug!(embedder = %self.name, count = batch.len(), "Embedding batch");
            let response = self
                .provider
                .embed(EmbeddingRequest {
                    model: self.model.clone(),
                    inputs: batch.to_vec(),
                    dimensions: self.dimensions,
                })
                .await?;

            if response.embeddings.len() != batch.len() {
                return Err(IndexError::Embedding(format!(
                    "Provider '{}' returned {} vectors for {} inputs",
                    self.provider.name(),
                    response.embeddings.len(),
                    batch.len()
                )));
            }
            out.extend(response.embeddings);
        }

        Ok(out)
    }
}

/// Deterministic token-hashing embedder.
///
/// Each whitespace/punctuation-separated token is hashed with SHA-256 into a
/// bucket and a sign; the result is L2-normalized. Texts sharing tokens land
/// near each other, which is enough for offline retrieval.
#[derive(Debug, Clone)]
pub struct StubEmbedder {
    dim: usize,
}

impl StubEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    pub fn embed_text(&self, text: &str) -> Embedding {
        let mut v = vec![0f32; self.dim];

        for token in text
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dim as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    fn name(&self) -> &str {
        "stub"
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, IndexError> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// Selector for the offline hashing embedder.
pub const STUB_SELECTOR: &str = "stub";

/// Pick the embedder named by `config.embedding_provider`.
///
/// `"stub"` is the offline hashing embedder. Any other selector is resolved
/// through `router` and embeds with the configured model, dimension and
/// batch size.
pub fn build_embedder(
    config: &IndexingConfig,
    router: &ProviderRouter,
) -> Result<Arc<dyn Embedder>, IndexError> {
    if config.embedding_provider == STUB_SELECTOR {
        info!(dimension = config.dimension, "Using offline stub embedder");
        return Ok(Arc::new(StubEmbedder::new(config.dimension)));
    }

    let provider = router.resolve(&config.embedding_provider)?;
    let embedder = ProviderEmbedder::new(provider, &config.embedding_model)
        .with_dimensions(config.dimension)
        .with_batch_size(config.batch_size);
    info!(embedder = %embedder.name, "Using provider embedder");
    Ok(Arc::new(embedder))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragsmith_core::error::ProviderError;
    use ragsmith_core::provider::{EmbeddingResponse, ProviderRequest, ProviderResponse};
    use std::sync::Mutex;

    /// Returns one 2-d vector per input and records batch sizes.
    struct CountingProvider {
        batches: Mutex<Vec<usize>>,
        drop_one: bool,
    }

    #[async_trait]
    impl Provider for CountingProvider {
        fn name(&self) -> &str {
            "counting"
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Err(ProviderError::NotConfigured("completion".into()))
        }

        async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
            self.batches.lock().unwrap().push(request.inputs.len());
            let mut embeddings: Vec<Vec<f32>> = request
                .inputs
                .iter()
                .map(|t| vec![t.len() as f32, 0.0])
                .collect();
            if self.drop_one {
                embeddings.pop();
            }
            Ok(EmbeddingResponse {
                embeddings,
                model: request.model,
                usage: None,
            })
        }
    }

    fn texts(n: usize) -> Vec<String> {
        (0..n).map(|i| "x".repeat(i + 1)).collect()
    }

    #[tokio::test]
    async fn provider_embedder_batches_requests() {
        let provider = Arc::new(CountingProvider {
            batches: Mutex::new(vec![]),
            drop_one: false,
        });
        let embedder = ProviderEmbedder::new(provider.clone(), "m").with_batch_size(2);

        let out = embedder.embed_batch(&texts(5)).await.unwrap();
        assert_eq!(out.len(), 5);
        assert_eq!(out[4], vec![5.0, 0.0]);
        assert_eq!(*provider.batches.lock().unwrap(), vec![2, 2, 1]);
        assert_eq!(embedder.name(), "counting:m");
    }

    #[tokio::test]
    async fn provider_embedder_rejects_short_response() {
        let provider = Arc::new(CountingProvider {
            batches: Mutex::new(vec![]),
            drop_one: true,
        });
        let embedder = ProviderEmbedder::new(provider, "m");
        let err = embedder.embed_batch(&texts(3)).await.unwrap_err();
        assert!(matches!(err, IndexError::Embedding(_)));
    }

    #[tokio::test]
    async fn stub_is_deterministic_and_sized() {
        let stub = StubEmbedder::new(16);
        let a = stub.embed("fn parse_reply(text)").await.unwrap();
        let b = stub.embed("fn parse_reply(text)").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn build_embedder_honours_config() {
        let mut router = ProviderRouter::new("counting");
        router.register(
            "counting",
            Arc::new(CountingProvider {
                batches: Mutex::new(vec![]),
                drop_one: false,
            }),
        );

        let stub_config = IndexingConfig {
            embedding_provider: "stub".into(),
            dimension: 12,
            ..IndexingConfig::default()
        };
        assert_eq!(build_embedder(&stub_config, &router).unwrap().name(), "stub");

        let remote = build_embedder(&IndexingConfig::default(), &router).unwrap();
        assert_eq!(remote.name(), "counting:text-embedding-3-small");

        let named = IndexingConfig {
            embedding_provider: "counting".into(),
            ..IndexingConfig::default()
        };
        assert!(build_embedder(&named, &router).is_ok());
    }

    #[test]
    fn build_embedder_rejects_unknown_selector() {
        let router = ProviderRouter::new("counting");
        let config = IndexingConfig {
            embedding_provider: "stbu".into(),
            ..IndexingConfig::default()
        };
        assert!(matches!(
            build_embedder(&config, &router),
            Err(IndexError::Provider(ProviderError::NotConfigured(_)))
        ));
    }

    #[test]
    fn stub_empty_text_is_zero_vector() {
        let v = StubEmbedder::new(4).embed_text("  \n ");
        assert_eq!(v, vec![0.0; 4]);
    }

    #[test]
    fn stub_shared_tokens_are_closer() {
        let stub = StubEmbedder::new(256);
        let query = stub.embed_text("database connection pool");
        let related = stub.embed_text("open a database connection from the pool");
        let unrelated = stub.embed_text("render the sidebar widget");
        let d_related = crate::vector::squared_euclidean(&query, &related);
        let d_unrelated = crate::vector::squared_euclidean(&query, &unrelated);
        assert!(d_related < d_unrelated);
    }
}
