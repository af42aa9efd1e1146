//! Folding streamed snapshots into the history.
//!
//! Snapshots are cumulative, so each one replaces the assistant message the
//! previous snapshot produced instead of adding to it.

use generation_provider::{ExecutionResult, FragmentSnapshot};

use super::history::{MessageHistory, MessagePatch};
use super::message::{ContentPart, Message, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Appended(usize),
    Patched(usize),
}

/// `[text(commentary), code(code)]`, with missing fields as empty strings.
pub fn snapshot_content(snapshot: &FragmentSnapshot) -> Vec<ContentPart> {
    vec![
        ContentPart::text(snapshot.commentary_or_empty()),
        ContentPart::code(snapshot.code_or_empty()),
    ]
}

pub fn apply_snapshot(history: &mut MessageHistory, snapshot: &FragmentSnapshot) -> ReconcileOutcome {
    let content = snapshot_content(snapshot);

    match history.last() {
        Some(last) if last.role == Role::Assistant => {
            let index = history.len() - 1;
            history.patch(
                index,
                MessagePatch {
                    content: Some(content),
                    object: Some(snapshot.clone()),
                    result: None,
                },
            );
            ReconcileOutcome::Patched(index)
        }
        _ => ReconcileOutcome::Appended(
            history.append(Message::assistant(content, snapshot.clone())),
        ),
    }
}

/// Stores a sandbox result on the most recent assistant message.
pub fn attach_result(history: &mut MessageHistory, result: ExecutionResult) -> Option<usize> {
    let index = history.last_assistant_index()?;
    history.patch(
        index,
        MessagePatch {
            result: Some(result),
            ..MessagePatch::default()
        },
    );
    Some(index)
}
