//! Conversation history and the streamed-snapshot reconciliation that feeds it.

pub mod context;
pub mod history;
pub mod message;
pub mod reconcile;

pub use context::inject_context;
pub use history::{MessageHistory, MessagePatch};
pub use message::{to_request_messages, ContentPart, Message, Role};
pub use reconcile::{apply_snapshot, attach_result, snapshot_content, ReconcileOutcome};
