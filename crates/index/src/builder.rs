//! Index builder: full rebuild of the chunk index over a repository.
//!
//! `rebuild` returns a new owned [`VectorIndex`]; the caller decides when to
//! swap it in. The previous index is untouched, so it stays queryable until
//! the replacement is complete, and stays live if the rebuild fails.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use ragsmith_core::error::IndexError;
use ragsmith_core::{Chunk, Embedder};
use serde::Serialize;
use tracing::{info, warn};
use crate::chunker::Chunker;
use crate::vector::VectorIndex;

/// Counters from one rebuild.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexStats {
    /// Files that produced at least one chunk
    pub files: usize,
    pub chunks: usize,
    pub added: usize,
    pub rejected: usize,
    pub duration_ms: u64,
}

/// A freshly built index and how it was built.
#[derive(Debug, Clone)]
pub struct BuiltIndex {
    pub index: VectorIndex,
    pub stats: IndexStats,
}

/// Chunks, embeds, and indexes a whole tree.
pub struct IndexBuilder {
    chunker: Chunker,
    embedder: Arc<dyn Embedder>,
    dim: usize,
}

impl IndexBuilder {
    pub fn new(chunker: Chunker, embedder: Arc<dyn Embedder>, dim: usize) -> Self {
        Self {
            chunker,
            embedder,
            dim,
        }
    }

    pub fn chunker(&self) -> &Chunker {
        &self.chunker
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn dimension(&self) -> usize {
        self.dim
    }

    /// Build a brand-new index from the current state of the tree.
    ///
    /// Embedding failures abort the rebuild; per-item dimension mismatches
    /// are filtered and counted in `stats.rejected`.
    pub async fn rebuild(&self) -> Result<BuiltIndex, IndexError> {
        let start = Instant::now();

        let chunks: Vec<Chunk> = self.chunker.chunks().collect();
        let files = chunks
            .iter()
            .map(|c| c.source_path.as_str())
            .collect::<BTreeSet<_>>()
            .len();

        let mut index = VectorIndex::new(self.dim);
        let mut stats = IndexStats {
            files,
            chunks: chunks.len(),
            ..IndexStats::default()
        };

        if !chunks.is_empty() {
            let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;
            let report = index.add(embeddings, chunks);
            stats.added = report.added;
            stats.rejected = report.rejected.len() + report.unpaired;

            if report.nothing_added() {
                warn!(
                    root = %self.chunker.root().display(),
                    "Rebuild produced an empty index"
                );
            }
        }

        stats.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            root = %self.chunker.root().display(),
            embedder = %self.embedder.name(),
            files = stats.files,
            chunks = stats.chunks,
            added = stats.added,
            rejected = stats.rejected,
            duration_ms = stats.duration_ms,
            "Index rebuilt"
        );

        Ok(BuiltIndex { index, stats })
    }
}
