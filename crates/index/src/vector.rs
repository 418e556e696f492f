//! Vector index: exact nearest-neighbour search over chunk embeddings.
//!
//! Pure-Rust flat index using squared Euclidean distance. Entries are
//! append-only: id `i` in the vector store is payload `i`. To remove
//! anything, build a new index.

use ragsmith_core::error::InvalidEmbeddingDimension;
use ragsmith_core::{Chunk, Embedding};
use serde::Serialize;
use tracing::{debug, warn};

/// Squared Euclidean distance between two equal-length vectors.
///
/// Extra elements of the longer slice are ignored; callers check lengths.
pub fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Outcome of a bulk insert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AddReport {
    /// Pairs stored
    pub added: usize,

    /// Pairs skipped because the embedding length differs from the index dimension
    #[serde(skip)]
    pub rejected: Vec<InvalidEmbeddingDimension>,

    /// Embeddings or chunks left over when the two inputs differ in length
    pub unpaired: usize,
}

impl AddReport {
    pub fn nothing_added(&self) -> bool {
        self.added == 0
    }
}

/// A search hit with its distance to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub distance: f32,
}

/// Flat vector store with parallel chunk payloads.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dim: usize,
    vectors: Vec<Embedding>,
    chunks: Vec<Chunk>,
}

impl VectorIndex {
    /// Create an empty index accepting embeddings of length `dim`.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            vectors: Vec::new(),
            chunks: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Stored payloads in insertion order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Append positionally paired embeddings and chunks.
    ///
    /// Pairs whose embedding length is not `dim` are skipped and reported;
    /// the rest of the batch is still stored.
    pub fn add(&mut self, embeddings: Vec<Embedding>, chunks: Vec<Chunk>) -> AddReport {
        let mut report = AddReport {
            unpaired: embeddings.len().abs_diff(chunks.len()),
            ..AddReport::default()
        };

        if report.unpaired > 0 {
            warn!(
                embeddings = embeddings.len(),
                chunks = chunks.len(),
                "Embedding and chunk counts differ, extra items ignored"
            );
        }

        for (position, (embedding, chunk)) in embeddings.into_iter().zip(chunks).enumerate() {
            if embedding.len() != self.dim {
                warn!(
                    position,
                    actual = embedding.len(),
                    expected = self.dim,
                    path = %chunk.source_path,
                    "Skipping embedding with invalid dimension"
                );
                report.rejected.push(InvalidEmbeddingDimension {
                    position,
                    expected: self.dim,
                    actual: embedding.len(),
                });
                continue;
            }
            self.vectors.push(embedding);
            self.chunks.push(chunk);
            report.added += 1;
        }

        if report.nothing_added() {
            debug!("No valid embeddings to add");
        }

        report
    }

    /// Up to `top_k` hits ordered by ascending distance; ties keep insertion order.
    ///
    /// An empty index, `top_k == 0`, or a query of the wrong dimension
    /// returns no hits.
    pub fn search_scored(&self, query: &[f32], top_k: usize) -> Vec<ScoredChunk> {
        if self.is_empty() || top_k == 0 {
            return Vec::new();
        }

        if query.len() != self.dim {
            warn!(
                actual = query.len(),
                expected = self.dim,
                "Query embedding has invalid dimension"
            );
            return Vec::new();
        }

        let mut scored: Vec<(f32, usize)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(id, v)| (squared_euclidean(query, v), id))
            .collect();

        // Stable sort: equal distances stay in insertion order
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        scored.truncate(top_k);

        scored
            .into_iter()
            .map(|(distance, id)| ScoredChunk {
                chunk: self.chunks[id].clone(),
                distance,
            })
            .collect()
    }

    /// Up to `top_k` payload chunks, nearest first.
    pub fn search(&self, query: &[f32], top_k: usize) -> Vec<Chunk> {
        self.search_scored(query, top_k)
            .into_iter()
            .map(|hit| hit.chunk)
            .collect()
    }
}
