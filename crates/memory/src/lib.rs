//! Conversation history implementations for ragsmith.

pub mod bounded;

pub use bounded::BoundedConversationLog;
