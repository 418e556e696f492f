//! Chunk index for ragsmith.
//!
//! - **Chunker**: walks the repository and splits recognized files into
//!   fixed-size character chunks
//! - **VectorIndex**: append-only store of embeddings with paired chunk
//!   payloads, nearest-neighbour search by squared Euclidean distance
//! - **Embedders**: provider-backed and offline stub implementations of
//!   `ragsmith_core::Embedder`
//! - **IndexBuilder**: rebuilds a fresh, owned index over the whole tree

pub mod builder;
pub mod chunker;
pub mod embedder;
pub mod vector;

pub use builder::{BuiltIndex, IndexBuilder, IndexStats};
pub use chunker::{split_text, Chunker};
pub use embedder::{build_embedder, ProviderEmbedder, StubEmbedder, STUB_SELECTOR};
pub use vector::{squared_euclidean, AddReport, ScoredChunk, VectorIndex};
