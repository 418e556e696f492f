//! Chunk: a fixed-size slice of a source file, tagged with its origin.

use serde::{Deserialize, Serialize};

/// A contiguous span of a file's text.
///
/// Chunks are immutable once produced and carry no identity across index
/// rebuilds: a file's chunk set is regenerated from scratch every time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Path of the source file, relative to the repository root, `/`-separated
    pub source_path: String,

    /// The chunk text
    pub text: String,

    /// Starting character index within the file (traceability only)
    pub offset: usize,
}

impl Chunk {
    pub fn new(source_path: impl Into<String>, text: impl Into<String>, offset: usize) -> Self {
        Self {
            source_path: source_path.into(),
            text: text.into(),
            offset,
        }
    }

    /// Number of characters in this chunk.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Render as a prompt context block: `path:\ntext`.
    pub fn to_context_block(&self) -> String {
        format!("{}:\n{}", self.source_path, self.text)
    }
}
