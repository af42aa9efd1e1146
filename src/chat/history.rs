use generation_provider::{ExecutionResult, FragmentSnapshot};

use super::message::{ContentPart, Message, Role};

/// Fields to overwrite on an existing message. Unset fields are kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessagePatch {
    pub content: Option<Vec<ContentPart>>,
    pub object: Option<FragmentSnapshot>,
    pub result: Option<ExecutionResult>,
}

/// Ordered conversation history, changed only by append, patch, undo and clear.
///
/// Every change bumps [`MessageHistory::revision`] so renderers can tell when
/// to redraw.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageHistory {
    messages: Vec<Message>,
    revision: u64,
}

impl MessageHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Appends `message` and returns its index.
    pub fn append(&mut self, message: Message) -> usize {
        self.messages.push(message);
        self.revision += 1;
        self.messages.len() - 1
    }

    /// Overwrites the set fields of the message at `index`. Returns false when
    /// the index is out of range.
    pub fn patch(&mut self, index: usize, patch: MessagePatch) -> bool {
        let Some(message) = self.messages.get_mut(index) else {
            return false;
        };

        if let Some(content) = patch.content {
            message.content = content;
        }
        if let Some(object) = patch.object {
            message.object = Some(object);
        }
        if let Some(result) = patch.result {
            message.result = Some(result);
        }
        self.revision += 1;
        true
    }

    /// Index of the most recent assistant message.
    pub fn last_assistant_index(&self) -> Option<usize> {
        self.messages
            .iter()
            .rposition(|message| message.role == Role::Assistant)
    }

    /// Removes the last user/assistant pair. No-op with fewer than two entries.
    pub fn undo_last_turn(&mut self) -> bool {
        if self.messages.len() < 2 {
            return false;
        }

        let keep = self.messages.len() - 2;
        self.messages.truncate(keep);
        self.revision += 1;
        true
    }

    pub fn clear(&mut self) {
        if self.messages.is_empty() {
            return;
        }
        self.messages.clear();
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn user(text: &str) -> Message {
        Message::user(vec![ContentPart::text(text)])
    }

    fn assistant(text: &str) -> Message {
        Message::assistant(vec![ContentPart::text(text)], FragmentSnapshot::default())
    }

    #[test]
    fn append_returns_index_and_bumps_revision() {
        let mut history = MessageHistory::new();

        assert_eq!(history.append(user("a")), 0);
        assert_eq!(history.append(assistant("b")), 1);
        assert_eq!(history.revision(), 2);
        assert_eq!(history.last_assistant_index(), Some(1));
    }

    #[test]
    fn patch_overwrites_only_set_fields() {
        let mut history = MessageHistory::new();
        history.append(user("a"));
        history.append(assistant("draft"));

        assert!(history.patch(
            1,
            MessagePatch {
                result: Some(ExecutionResult {
                    url: Some("https://sbx.test".to_string()),
                    ..ExecutionResult::default()
                }),
                ..MessagePatch::default()
            }
        ));

        let message = history.get(1).expect("assistant message");
        assert_eq!(message.content, vec![ContentPart::text("draft")]);
        assert_eq!(
            message.result.as_ref().and_then(|result| result.url.as_deref()),
            Some("https://sbx.test")
        );
        assert!(!history.patch(5, MessagePatch::default()));
        assert_eq!(history.revision(), 3);
    }

    #[test]
    fn undo_removes_exactly_one_turn_pair() {
        let mut history = MessageHistory::new();
        history.append(user("one"));
        history.append(assistant("one"));
        history.append(user("two"));
        history.append(assistant("two"));

        assert!(history.undo_last_turn());
        assert_eq!(history.messages(), &[user("one"), assistant("one")]);

        assert!(history.undo_last_turn());
        assert!(history.is_empty());
    }

    #[test]
    fn undo_with_fewer_than_two_entries_is_noop() {
        let mut history = MessageHistory::new();
        assert!(!history.undo_last_turn());

        history.append(user("only"));
        let revision = history.revision();
        assert!(!history.undo_last_turn());
        assert_eq!(history.len(), 1);
        assert_eq!(history.revision(), revision);
    }

    #[test]
    fn clear_empties_history_once() {
        let mut history = MessageHistory::new();
        history.append(user("a"));
        history.clear();
        history.clear();

        assert!(history.is_empty());
        assert_eq!(history.revision(), 2);
    }
}
