//! The turn loop: the heart of ragsmith.
//!
//! Each turn walks a fixed sequence of states:
//!
//! 1. **Retrieving**: embed the request, query the chunk index
//! 2. **Composing**: system instruction + recent history + context + request
//! 3. **Completing**: call the provider; a failure aborts the turn here
//! 4. **Applying**: parse `<file_update>` directives, write each through the guard
//! 5. **Reindexing**: rebuild the index over the tree and swap it in
//! 6. **Done**: record the turn in history
//!
//! Per-directive failures are annotated into the reply and never stop the
//! remaining directives.

pub mod loop_runner;
pub mod parser;
pub mod prompt;

pub use loop_runner::{AgentLoop, DirectiveResult, TurnOutcome, SUMMARY_HEADING};
pub use parser::extract_directives;
pub use prompt::{render_context, PromptBuilder};
