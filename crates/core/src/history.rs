//! Conversation history: the bounded log of past turns.
//!
//! The log is owned by one session and cleared at teardown. Only the most
//! recent turns are consulted when assembling a prompt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One completed user request / assistant reply cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub user_input: String,

    /// The rendered context blocks that were sent with this turn
    pub retrieved_context: String,

    /// The (possibly annotated) reply returned to the caller
    pub assistant_response: String,

    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(
        user_input: impl Into<String>,
        retrieved_context: impl Into<String>,
        assistant_response: impl Into<String>,
    ) -> Self {
        Self {
            user_input: user_input.into(),
            retrieved_context: retrieved_context.into(),
            assistant_response: assistant_response.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A simple ordered log of turns.
///
/// Implementations: bounded in-memory (`ragsmith-memory`). No persistence
/// across process restarts is required.
pub trait ConversationLog: Send + Sync {
    /// Append a turn at the end of the log.
    fn append(&mut self, turn: ConversationTurn);

    /// The last `n` turns, oldest first.
    fn recent(&self, n: usize) -> Vec<ConversationTurn>;

    /// Number of turns currently held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every turn.
    fn clear(&mut self);
}
