use generation_provider::RequestMessage;

use crate::selection::AttachedContext;

/// Appends the attached context as a synthetic user turn.
///
/// The stored history is never touched; only the outgoing sequence grows.
pub fn inject_context(
    mut messages: Vec<RequestMessage>,
    context: Option<&AttachedContext>,
) -> Vec<RequestMessage> {
    if let Some(context) = context {
        messages.push(RequestMessage::user_text(context_text(context)));
    }
    messages
}

fn context_text(context: &AttachedContext) -> String {
    let lines = context
        .meta
        .and_then(|meta| meta.line_span())
        .map(|(start, end)| format!(" (lines {start}-{end})"))
        .unwrap_or_default();

    format!("Attached context{lines}:\n{}", context.code)
}
