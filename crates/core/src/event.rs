//! Domain event system: decoupled communication between bounded contexts.
//!
//! Events are published when a turn changes state, a directive is applied,
//! or the index is rebuilt. Front ends subscribe to render progress without
//! coupling to the agent loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use crate::turn::TurnState;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A turn moved to a new state
    TurnStateChanged {
        turn: u64,
        state: TurnState,
        timestamp: DateTime<Utc>,
    },

    /// The completion provider answered
    ResponseGenerated {
        model: String,
        tokens_used: u32,
        timestamp: DateTime<Utc>,
    },

    /// A directive was applied (or rejected) by the file guard
    DirectiveApplied {
        path: String,
        success: bool,
        changed: bool,
        timestamp: DateTime<Utc>,
    },

    /// The chunk index was rebuilt and swapped in
    IndexRebuilt {
        files: usize,
        chunks: usize,
        rejected: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A non-fatal error occurred
    ErrorOccurred {
        context: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
