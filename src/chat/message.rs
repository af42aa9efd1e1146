use generation_provider::{
    ExecutionResult, FragmentSnapshot, RequestMessage, RequestPart, RequestRole,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl From<Role> for RequestRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => RequestRole::User,
            Role::Assistant => RequestRole::Assistant,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentPart {
    Text { text: String },
    Code { text: String },
    /// Data URL of an attached image.
    Image { image: String },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn code(text: impl Into<String>) -> Self {
        Self::Code { text: text.into() }
    }

    /// Code travels as text on the wire.
    fn to_request_part(&self) -> RequestPart {
        match self {
            Self::Text { text } | Self::Code { text } => RequestPart::Text { text: text.clone() },
            Self::Image { image } => RequestPart::Image {
                image: image.clone(),
            },
        }
    }
}

/// One turn of the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentPart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<FragmentSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ExecutionResult>,
}

impl Message {
    pub fn user(content: Vec<ContentPart>) -> Self {
        Self {
            role: Role::User,
            content,
            object: None,
            result: None,
        }
    }

    pub fn assistant(content: Vec<ContentPart>, object: FragmentSnapshot) -> Self {
        Self {
            role: Role::Assistant,
            content,
            object: Some(object),
            result: None,
        }
    }

    pub fn to_request(&self) -> RequestMessage {
        RequestMessage {
            role: self.role.into(),
            content: self
                .content
                .iter()
                .map(ContentPart::to_request_part)
                .collect(),
        }
    }
}

/// Converts stored history to wire messages.
pub fn to_request_messages(messages: &[Message]) -> Vec<RequestMessage> {
    messages.iter().map(Message::to_request).collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn code_parts_are_sent_as_text() {
        let message = Message::assistant(
            vec![ContentPart::text("Here you go"), ContentPart::code("print(1)")],
            FragmentSnapshot::default(),
        );

        assert_eq!(
            message.to_request(),
            RequestMessage {
                role: RequestRole::Assistant,
                content: vec![
                    RequestPart::Text {
                        text: "Here you go".to_string()
                    },
                    RequestPart::Text {
                        text: "print(1)".to_string()
                    },
                ],
            }
        );
    }

    #[test]
    fn image_parts_keep_their_data() {
        let message = Message::user(vec![
            ContentPart::text("what is this"),
            ContentPart::Image {
                image: "data:image/png;base64,AAAA".to_string(),
            },
        ]);

        let request = to_request_messages(std::slice::from_ref(&message));
        assert_eq!(
            request[0].content[1],
            RequestPart::Image {
                image: "data:image/png;base64,AAAA".to_string()
            }
        );
    }

    #[test]
    fn message_serializes_with_typed_parts() {
        let value = serde_json::to_value(Message::user(vec![ContentPart::text("hi")]))
            .expect("message should serialize");

        assert_eq!(value["role"], "user");
        assert_eq!(value["content"][0]["type"], "text");
        assert!(value.get("object").is_none());
    }
}
