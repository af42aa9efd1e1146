use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::fragment::FragmentSnapshot;
use crate::RunId;

/// Line/column metadata of a captured code selection.
///
/// Lines are 1-based. Columns count characters back to the last newline before
/// the offset, so the first character of a line sits at column 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_col: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_col: Option<usize>,
}

impl SelectionMeta {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Returns `(start, end)` only when both line bounds are known.
    #[must_use]
    pub fn line_span(&self) -> Option<(usize, usize)> {
        match (self.start_line, self.end_line) {
            (Some(start), Some(end)) if start > 0 && end > 0 => Some((start, end)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestRole {
    User,
    Assistant,
}

/// Wire-level content part. Code parts of stored messages travel as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RequestPart {
    Text { text: String },
    Image { image: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMessage {
    pub role: RequestRole,
    pub content: Vec<RequestPart>,
}

impl RequestMessage {
    #[must_use]
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: RequestRole::User,
            content: vec![RequestPart::Text { text: text.into() }],
        }
    }
}

/// Catalog entry describing a selectable language model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmModel {
    pub id: String,
    pub provider: String,
    pub provider_id: String,
    pub name: String,
    #[serde(default)]
    pub multi_modal: bool,
}

/// User-tunable model configuration persisted by the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmModelConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(rename = "baseURL", default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl LlmModelConfig {
    #[must_use]
    pub fn for_model(model: impl Into<String>) -> Self {
        Self {
            model: Some(model.into()),
            ..Self::default()
        }
    }

    /// Overlays every field set in `update`, keeping the rest.
    pub fn merge(&mut self, update: LlmModelConfig) {
        macro_rules! overlay {
            ($($field:ident),*) => {
                $(if update.$field.is_some() {
                    self.$field = update.$field;
                })*
            };
        }

        overlay!(
            model,
            api_key,
            base_url,
            temperature,
            top_p,
            top_k,
            frequency_penalty,
            presence_penalty,
            max_tokens
        );
    }
}

/// Which generation route a request targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationEndpoint {
    #[default]
    Chat,
    /// Edits the current fragment in place instead of regenerating it.
    MorphChat,
}

impl GenerationEndpoint {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Chat => "/api/chat",
            Self::MorphChat => "/api/morph-chat",
        }
    }
}

/// Input required to start one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    #[serde(skip)]
    pub run_id: RunId,
    #[serde(skip)]
    pub endpoint: GenerationEndpoint,
    #[serde(rename = "userID")]
    pub user_id: String,
    #[serde(rename = "teamID", default)]
    pub team_id: Option<String>,
    pub messages: Vec<RequestMessage>,
    pub template: Value,
    pub model: LlmModel,
    pub config: LlmModelConfig,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(rename = "contextMeta", default)]
    pub context_meta: Option<SelectionMeta>,
    #[serde(
        rename = "currentFragment",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub current_fragment: Option<FragmentSnapshot>,
}
