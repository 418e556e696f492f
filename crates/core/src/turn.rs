//! Turn state machine types.

use serde::{Deserialize, Serialize};

/// The phase a turn is in.
///
/// A turn walks every state in order:
/// `Retrieving → Composing → Completing → Applying → Reindexing → Done`.
/// A completion failure ends the turn in `Failed` before `Applying`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    /// Embedding the user input and querying the index
    #[default]
    Retrieving,
    /// Assembling the prompt from history, context and input
    Composing,
    /// Waiting on the completion provider
    Completing,
    /// Writing parsed directives through the file guard
    Applying,
    /// Rebuilding the chunk index over the repository
    Reindexing,
    /// Turn recorded in history
    Done,
    /// Turn aborted
    Failed,
}

impl TurnState {
    /// The state that follows this one on the success path.
    pub fn next(self) -> Option<TurnState> {
        match self {
            TurnState::Retrieving => Some(TurnState::Composing),
            TurnState::Composing => Some(TurnState::Completing),
            TurnState::Completing => Some(TurnState::Applying),
            TurnState::Applying => Some(TurnState::Reindexing),
            TurnState::Reindexing => Some(TurnState::Done),
            TurnState::Done | TurnState::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TurnState::Done | TurnState::Failed)
    }
}

impl std::fmt::Display for TurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TurnState::Retrieving => "retrieving",
            TurnState::Composing => "composing",
            TurnState::Completing => "completing",
            TurnState::Applying => "applying",
            TurnState::Reindexing => "reindexing",
            TurnState::Done => "done",
            TurnState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Runtime counters for a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionStats {
    /// Turns that reached `Done`
    pub turns_completed: u64,

    /// Turns aborted at `Completing`
    pub turns_failed: u64,

    /// Directives written successfully (including no-op writes)
    pub directives_applied: u64,

    /// Directives rejected by the guard or failed on I/O
    pub directives_failed: u64,
}
