//! Input surface helpers shared by the CLI and web frontends.

use crate::dispatcher::Dispatcher;
use crate::types::Outcome;

/// Words that end an interactive session.
const EXIT_WORDS: &[&str] = &["exit", "quit"];

/// Trimmed utterance, or `None` for blank input.
pub fn normalize(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

pub fn is_exit_command(text: &str) -> bool {
    EXIT_WORDS.iter().any(|w| text.trim().eq_ignore_ascii_case(w))
}

/// Hand non-blank input to the dispatcher. Blank input never reaches the
/// planner or the log.
pub async fn submit(dispatcher: &Dispatcher, raw: &str) -> Option<Outcome> {
    let text = normalize(raw)?;
    Some(dispatcher.handle(text).await)
}
