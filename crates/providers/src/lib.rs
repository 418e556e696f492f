//! LLM Provider implementations for ragsmith.
//!
//! All providers implement the `ragsmith_core::Provider` trait.
//! The router holds every configured provider and resolves config selectors
//! (`default` or a provider name) to one of them.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use router::ProviderRouter;
