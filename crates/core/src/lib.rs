//! # ragsmith Core
//!
//! Domain types, traits, and error definitions for the ragsmith
//! retrieval-augmented code-modification agent. This crate has no framework
//! dependencies; it defines the model every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Each external capability (text completion, embedding, conversation log)
//! is a trait here. Implementations live in their own crates, which keeps
//! the dependency graph pointing inward and lets tests swap in mocks.

pub mod chunk;
pub mod directive;
pub mod embedding;
pub mod error;
pub mod event;
pub mod history;
pub mod message;
pub mod provider;
pub mod turn;

// Re-export key types at crate root for ergonomics
pub use chunk::Chunk;
pub use directive::EditDirective;
pub use embedding::{Embedder, Embedding};
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use history::{ConversationLog, ConversationTurn};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
pub use turn::{SessionStats, TurnState};
