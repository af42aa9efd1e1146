use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One cumulative version of the object a generation is producing.
///
/// Every field is optional because the object arrives partially formed: each
/// snapshot is a more complete version of the same logical fragment, never a
/// diff against the previous one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FragmentSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commentary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_dependencies: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_additional_dependencies: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_dependencies_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Fields outside the known schema, kept so they round-trip to the sandbox.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FragmentSnapshot {
    /// Commentary text, empty while the field has not streamed in yet.
    #[must_use]
    pub fn commentary_or_empty(&self) -> &str {
        self.commentary.as_deref().unwrap_or("")
    }

    /// Source text, empty while the field has not streamed in yet.
    #[must_use]
    pub fn code_or_empty(&self) -> &str {
        self.code.as_deref().unwrap_or("")
    }

    /// True when the fragment carries enough to be patched in place by the
    /// alternate apply endpoint.
    #[must_use]
    pub fn is_patchable(&self) -> bool {
        self.code.as_deref().is_some_and(|code| !code.is_empty())
            && self
                .file_path
                .as_deref()
                .is_some_and(|path| !path.is_empty())
    }
}

/// Response of the sandbox-provisioning collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sbx_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_error: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell_results: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Request sent to the sandbox-provisioning collaborator once a generation completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxRequest {
    pub fragment: FragmentSnapshot,
    #[serde(rename = "userID", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(rename = "teamID", default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(rename = "accessToken", default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}
