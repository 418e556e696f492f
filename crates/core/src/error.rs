//! Error types for the ragsmith domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; the top-level [`Error`]
//! wraps them for callers that only need a single type.

use thiserror::Error;

/// The top-level error type for all ragsmith operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The completion call failed; the turn is aborted before any edit.
    #[error("Completion failed: {0}")]
    Completion(#[source] ProviderError),

    // --- Index errors ---
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    // --- File guard errors ---
    #[error("File guard error: {0}")]
    Guard(String),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum IndexError {
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Embedding provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// A single embedding rejected by the vector index.
///
/// Never returned as `Err`: the index collects these into its add report and
/// keeps going with the remaining pairs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid embedding dimension at position {position}: expected {expected}, got {actual}")]
pub struct InvalidEmbeddingDimension {
    pub position: usize,
    pub expected: usize,
    pub actual: usize,
}
