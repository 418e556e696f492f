//! Directive parser: extracts `<file_update>` blocks from a model reply.
//!
//! A single forward scan driven by an explicit state machine:
//!
//! ```text
//! SeekOpen --<file_update path="--> Path --">--> Body --</file_update>--> SeekOpen
//! ```
//!
//! Each step is a substring search from the current cursor, so the scan is
//! linear in the reply length with no backtracking. The body ends at the
//! first close marker after it (non-greedy) and may span lines.

use ragsmith_core::EditDirective;
use tracing::debug;

/// Opening marker up to and including the quote before the path.
pub const OPEN_MARKER: &str = "<file_update path=\"";

/// Closing marker of a directive block.
pub const CLOSE_MARKER: &str = "</file_update>";

const PATH_END: &str = "\">";

#[derive(Debug, Clone, Copy)]
enum State {
    /// Looking for the next opening marker
    SeekOpen,
    /// Inside the path attribute; `open_at` is where the marker began
    Path { open_at: usize },
    /// Inside the body; the path spans `path_start..path_end`
    Body { path_start: usize, path_end: usize },
}

/// Extract every well-formed directive in order of appearance.
///
/// Blocks with an empty path or a whitespace-only body are dropped. Paths
/// and bodies are trimmed and doubled backslashes in paths collapse to one.
/// Duplicate paths are all kept. Never fails.
pub fn extract_directives(reply: &str) -> Vec<EditDirective> {
    let mut directives = Vec::new();
    let mut state = State::SeekOpen;
    let mut cursor = 0;

    loop {
        match state {
            State::SeekOpen => match reply[cursor..].find(OPEN_MARKER) {
                Some(i) => {
                    let open_at = cursor + i;
                    cursor = open_at + OPEN_MARKER.len();
                    state = State::Path { open_at };
                }
                None => break,
            },

            State::Path { open_at } => match reply[cursor..].find('"') {
                Some(i) if i > 0 && reply[cursor + i..].starts_with(PATH_END) => {
                    state = State::Body {
                        path_start: cursor,
                        path_end: cursor + i,
                    };
                    cursor += i + PATH_END.len();
                }
                Some(_) => {
                    // Not a valid open tag here; resume just past its '<'
                    cursor = open_at + 1;
                    state = State::SeekOpen;
                }
                None => break,
            },

            State::Body {
                path_start,
                path_end,
            } => match reply[cursor..].find(CLOSE_MARKER) {
                Some(i) => {
                    let path = &reply[path_start..path_end];
                    let body = &reply[cursor..cursor + i];
                    if let Some(directive) = build_directive(path, body) {
                        directives.push(directive);
                    }
                    cursor += i + CLOSE_MARKER.len();
                    state = State::SeekOpen;
                }
                None => {
                    debug!(offset = cursor, "Unterminated directive block ignored");
                    break;
                }
            },
        }
    }

    debug!(count = directives.len(), "Extracted directives");
    directives
}

fn build_directive(path: &str, body: &str) -> Option<EditDirective> {
    let path = path.trim();
    let content = body.trim();

    if path.is_empty() || content.is_empty() {
        debug!(path, "Malformed directive discarded");
        return None;
    }

    Some(EditDirective::new(path.replace("\\\\", "\\"), content))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(reply: &str) -> Vec<(String, String)> {
        extract_directives(reply)
            .into_iter()
            .map(|d| (d.target_path, d.content))
            .collect()
    }

    #[test]
    fn no_directives_is_empty() {
        assert!(extract_directives("").is_empty());
        assert!(extract_directives("Just an explanation, no edits.").is_empty());
        assert!(extract_directives("<file_update>missing path</file_update>").is_empty());
    }

    #[test]
    fn single_multiline_block() {
        let reply = "Here you go:\n<file_update path=\"src/app.py\">\ndef main():\n    return 1\n</file_update>\nDone.";
        assert_eq!(
            pairs(reply),
            vec![("src/app.py".into(), "def main():\n    return 1".into())]
        );
    }

    #[test]
    fn duplicate_paths_kept_in_order() {
        let reply = r#"<file_update path="a.py">X</file_update><file_update path="a.py">Y</file_update>"#;
        assert_eq!(
            pairs(reply),
            vec![("a.py".into(), "X".into()), ("a.py".into(), "Y".into())]
        );
    }

    #[test]
    fn body_is_non_greedy() {
        let reply = "<file_update path=\"a\">one</file_update> text </file_update>\n<file_update path=\"b\">two</file_update>";
        assert_eq!(
            pairs(reply),
            vec![("a".into(), "one".into()), ("b".into(), "two".into())]
        );
    }

    #[test]
    fn empty_path_or_blank_body_discarded() {
        let reply = concat!(
            "<file_update path=\"\">content</file_update>",
            "<file_update path=\"blank.py\">   \n\t </file_update>",
            "<file_update path=\"  \">content</file_update>",
            "<file_update path=\"ok.py\">ok</file_update>",
        );
        assert_eq!(pairs(reply), vec![("ok.py".into(), "ok".into())]);
    }

    #[test]
    fn escaped_backslashes_collapse() {
        let reply = r#"<file_update path="src\\win\\mod.py">x</file_update>"#;
        assert_eq!(pairs(reply)[0].0, r"src\win\mod.py");
    }

    #[test]
    fn unterminated_block_ignored_but_earlier_kept() {
        let reply = "<file_update path=\"a.py\">a</file_update><file_update path=\"b.py\">never closed";
        assert_eq!(pairs(reply), vec![("a.py".into(), "a".into())]);
    }

    #[test]
    fn broken_open_tag_does_not_swallow_next_block() {
        let reply = "<file_update path=\"bad\" mode=\"x\">ignored\n<file_update path=\"good.py\">kept</file_update>";
        assert_eq!(pairs(reply), vec![("good.py".into(), "kept".into())]);
    }

    #[test]
    fn nested_open_marker_is_body_text() {
        let reply = "<file_update path=\"doc.md\">see <file_update path=\"x\"> syntax</file_update>";
        assert_eq!(
            pairs(reply),
            vec![("doc.md".into(), "see <file_update path=\"x\"> syntax".into())]
        );
    }

    #[test]
    fn large_reply_without_close_is_linear() {
        let mut reply = String::new();
        for _ in 0..10_000 {
            reply.push_str("<file_update path=\"a\">x ");
        }
        assert!(extract_directives(&reply).is_empty());
    }
}
