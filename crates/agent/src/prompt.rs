//! Prompt assembly: system instruction, recent history, retrieved context.

use ragsmith_core::{Chunk, ConversationTurn, Message};
use crate::parser::{CLOSE_MARKER, OPEN_MARKER};

/// Builds the message list sent to the completion provider.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    repo_root: String,
}

impl PromptBuilder {
    pub fn new(repo_root: impl Into<String>) -> Self {
        Self {
            repo_root: repo_root.into(),
        }
    }

    /// The fixed instruction describing the edit-directive syntax.
    pub fn system_instruction(&self) -> String {
        format!(
            "You are a coding agent working inside one repository. You read the code \
             snippets provided with each request and may change files in the repository.\n\
             \n\
             To create or replace a file, answer with one block per file:\n\
             \n\
             {OPEN_MARKER}relative/path/to/file\">\n\
             complete new content of the file\n\
             {CLOSE_MARKER}\n\
             \n\
             Each block replaces the whole file. Paths are relative to the repository \
             root, or absolute paths inside it. Blocks are applied in the order given. \
             Hidden files and credentials cannot be written.\n\
             \n\
             Repository root: {root}",
            root = self.repo_root
        )
    }

    /// Messages for one turn: system, then past turns oldest first, then the
    /// current request with its retrieved context.
    pub fn build(&self, history: &[ConversationTurn], chunks: &[Chunk], input: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() * 2 + 2);
        messages.push(Message::system(self.system_instruction()));

        for turn in history {
            messages.push(Message::user(&turn.user_input));
            messages.push(Message::assistant(&turn.assistant_response));
        }

        messages.push(Message::user(render_request(chunks, input)));
        messages
    }
}

/// Context blocks (`path:\ntext`) separated by blank lines.
pub fn render_context(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(Chunk::to_context_block)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_request(chunks: &[Chunk], input: &str) -> String {
    if chunks.is_empty() {
        return format!("Code snippets: none retrieved\n\nUser request: {input}");
    }
    format!(
        "Code snippets:\n\n{}\n\nUser request: {input}",
        render_context(chunks)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragsmith_core::Role;

    #[test]
    fn instruction_names_syntax_and_root() {
        let text = PromptBuilder::new("/work/repo").system_instruction();
        assert!(text.contains("<file_update path=\"relative/path/to/file\">"));
        assert!(text.contains("</file_update>"));
        assert!(text.contains("Repository root: /work/repo"));
    }

    #[test]
    fn build_orders_history_then_request() {
        let history = vec![
            ConversationTurn::new("first?", "", "first!"),
            ConversationTurn::new("second?", "", "second!"),
        ];
        let chunks = vec![Chunk::new("a.py", "x = 1", 0)];
        let messages = PromptBuilder::new("/r").build(&history, &chunks, "now?");

        let roles: Vec<_> = messages.iter().map(|m| m.role.clone()).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(messages[1].content, "first?");
        assert_eq!(messages[4].content, "second!");

        let last = &messages[5].content;
        assert!(last.contains("a.py:\nx = 1"));
        assert!(last.ends_with("User request: now?"));
    }

    #[test]
    fn context_blocks_joined_by_blank_line() {
        let chunks = vec![Chunk::new("a.py", "A", 0), Chunk::new("b.py", "B", 0)];
        assert_eq!(render_context(&chunks), "a.py:\nA\n\nb.py:\nB");
        assert_eq!(render_context(&[]), "");
    }

    #[test]
    fn request_without_context_says_so() {
        let messages = PromptBuilder::new("/r").build(&[], &[], "hi");
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.contains("none retrieved"));
    }
}
