//! Edit directives extracted from a model reply.

use serde::{Deserialize, Serialize};

/// A structured edit instruction: replace `target_path` with `content`.
///
/// `target_path` may be absolute or relative to the repository root; the
/// file guard resolves it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditDirective {
    pub target_path: String,
    pub content: String,
}

impl EditDirective {
    pub fn new(target_path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            target_path: target_path.into(),
            content: content.into(),
        }
    }
}
