//! Chunker: split repository files into fixed-size text chunks.
//!
//! Files are visited in sorted order so the same tree always yields the
//! same chunk sequence. Chunks never span two files.

use std::path::{Path, PathBuf};
use ragsmith_config::IndexingConfig;
use ragsmith_core::Chunk;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Default maximum characters per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Walks a repository root and produces chunks for recognized files.
#[derive(Debug, Clone)]
pub struct Chunker {
    root: PathBuf,
    extensions: Vec<String>,
    ignore_dirs: Vec<String>,
    chunk_size: usize,
}

impl Chunker {
    /// Create a chunker for `root` recognizing the given extensions
    /// (with or without the leading dot).
    pub fn new(root: impl Into<PathBuf>, extensions: &[impl AsRef<str>]) -> Self {
        Self {
            root: root.into(),
            extensions: extensions
                .iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_string())
                .collect(),
            ignore_dirs: Vec::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Build a chunker from the indexing section of the config.
    pub fn from_config(root: impl Into<PathBuf>, config: &IndexingConfig) -> Self {
        Self::new(root, &config.extensions)
            .with_chunk_size(config.chunk_size)
            .with_ignore_dirs(config.ignore_dirs.clone())
    }

    /// Set the maximum characters per chunk (minimum 1).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Skip directories with these exact names.
    pub fn with_ignore_dirs(mut self, ignore_dirs: Vec<String>) -> Self {
        self.ignore_dirs = ignore_dirs;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn is_recognized(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }

    /// Recognized files under the root, in a stable (sorted) order.
    pub fn files(&self) -> impl Iterator<Item = PathBuf> + '_ {
        WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |e| {
                if e.depth() == 0 || !e.file_type().is_dir() {
                    return true;
                }
                let name = e.file_name().to_string_lossy();
                !self.ignore_dirs.iter().any(|d| name == d.as_str())
            })
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!(error = %err, "Skipping unreadable directory entry");
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(move |p| self.is_recognized(p))
    }

    /// Chunks for every recognized file, produced lazily one file at a time.
    pub fn chunks(&self) -> impl Iterator<Item = Chunk> + '_ {
        self.files().flat_map(move |path| self.chunk_file(&path))
    }

    /// Read a single file and split it. Invalid UTF-8 sequences are dropped,
    /// not fatal; unreadable files yield no chunks.
    pub fn chunk_file(&self, path: &Path) -> Vec<Chunk> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read file, skipping");
                return Vec::new();
            }
        };
        let text = decode_ignoring_errors(&bytes);
        let source_path = self.source_path(path);
        let chunks = split_text(&source_path, &text, self.chunk_size);
        debug!(path = %source_path, chunks = chunks.len(), "Chunked file");
        chunks
    }

    /// Path relative to the root with `/` separators; falls back to the full path.
    fn source_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

/// UTF-8 decode that skips invalid byte sequences instead of replacing them.
fn decode_ignoring_errors(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text
}

/// Split `text` into consecutive slices of at most `chunk_size` characters.
///
/// Offsets are character indices. The last slice may be shorter; empty text
/// yields no chunks.
pub fn split_text(source_path: &str, text: &str, chunk_size: usize) -> Vec<Chunk> {
    let chunk_size = chunk_size.max(1);
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(chunk_size)
        .enumerate()
        .map(|(i, window)| Chunk::new(source_path, window.iter().collect::<String>(), i * chunk_size))
        .collect()
}
