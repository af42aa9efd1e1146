//! Selectable models and templates.

use std::collections::BTreeMap;

use generation_provider::{LlmModel, LlmModelConfig};
use serde_json::{json, Map, Value};

pub const DEFAULT_MODEL_ID: &str = "claude-sonnet-4-20250514";
pub const LOCAL_PROVIDER_ID: &str = "ollama";
pub const AUTO_TEMPLATE: &str = "auto";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCatalog {
    models: Vec<LlmModel>,
}

impl ModelCatalog {
    pub fn new(models: Vec<LlmModel>) -> Self {
        Self { models }
    }

    pub fn builtin() -> Self {
        Self::new(vec![
            model("claude-sonnet-4-20250514", "Anthropic", "anthropic", "Claude Sonnet 4", true),
            model("claude-3-5-haiku-latest", "Anthropic", "anthropic", "Claude 3.5 Haiku", true),
            model("gpt-4o", "OpenAI", "openai", "GPT-4o", true),
            model("o3-mini", "OpenAI", "openai", "o3 Mini", false),
            model("gemini-2.0-flash", "Google Generative AI", "google", "Gemini 2.0 Flash", true),
            model("codestral-latest", "Mistral", "mistral", "Codestral", false),
            model("llama3.1", "Ollama", LOCAL_PROVIDER_ID, "Llama 3.1", false),
        ])
    }

    /// Drops models served by a local runtime.
    #[must_use]
    pub fn without_local(self) -> Self {
        Self::new(
            self.models
                .into_iter()
                .filter(|model| model.provider_id != LOCAL_PROVIDER_ID)
                .collect(),
        )
    }

    pub fn models(&self) -> &[LlmModel] {
        &self.models
    }

    pub fn find(&self, id: &str) -> Option<&LlmModel> {
        self.models.iter().find(|model| model.id == id)
    }

    /// The preferred default, else the first entry.
    pub fn default_model(&self) -> Option<&LlmModel> {
        self.find(DEFAULT_MODEL_ID).or_else(|| self.models.first())
    }

    /// Points a stored config that names an unknown model back at the default.
    /// Returns whether the config changed.
    pub fn normalize_config(&self, config: &mut LlmModelConfig) -> bool {
        let known = config
            .model
            .as_deref()
            .is_some_and(|id| self.find(id).is_some());
        if known {
            return false;
        }

        let Some(default) = self.default_model() else {
            return false;
        };
        if config.model.as_deref() == Some(default.id.as_str()) {
            return false;
        }
        config.model = Some(default.id.clone());
        true
    }

    /// The configured model, falling back to the default when unset or unknown.
    pub fn current(&self, config: &LlmModelConfig) -> Option<&LlmModel> {
        config
            .model
            .as_deref()
            .and_then(|id| self.find(id))
            .or_else(|| self.default_model())
    }
}

fn model(id: &str, provider: &str, provider_id: &str, name: &str, multi_modal: bool) -> LlmModel {
    LlmModel {
        id: id.to_string(),
        provider: provider.to_string(),
        provider_id: provider_id.to_string(),
        name: name.to_string(),
        multi_modal,
    }
}

/// Template choice: `auto` lets the generator pick among every template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TemplateSelection {
    #[default]
    Auto,
    Named(String),
}

impl TemplateSelection {
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value == AUTO_TEMPLATE {
            Self::Auto
        } else {
            Self::Named(value.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Auto => AUTO_TEMPLATE,
            Self::Named(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateCatalog {
    templates: BTreeMap<String, Value>,
}

impl TemplateCatalog {
    pub fn new(templates: BTreeMap<String, Value>) -> Self {
        Self { templates }
    }

    pub fn builtin() -> Self {
        let entries = [
            (
                "code-interpreter-v1",
                json!({
                    "name": "Python data analyst",
                    "lib": ["python", "jupyter", "numpy", "pandas", "matplotlib"],
                    "file": "script.py",
                    "instructions": "Runs code as a Jupyter notebook cell.",
                    "port": null
                }),
            ),
            (
                "nextjs-developer",
                json!({
                    "name": "Next.js developer",
                    "lib": ["nextjs@14.2.5", "typescript", "tailwindcss", "shadcn"],
                    "file": "pages/index.tsx",
                    "instructions": "A Next.js 13+ app that reloads automatically.",
                    "port": 3000
                }),
            ),
            (
                "vue-developer",
                json!({
                    "name": "Vue.js developer",
                    "lib": ["vue@latest", "nuxt.js@3.13.0", "tailwindcss"],
                    "file": "app.vue",
                    "instructions": "A Vue.js 3+ app that reloads automatically.",
                    "port": 3000
                }),
            ),
            (
                "streamlit-developer",
                json!({
                    "name": "Streamlit developer",
                    "lib": ["streamlit", "pandas", "numpy", "matplotlib"],
                    "file": "app.py",
                    "instructions": "A streamlit app that reloads automatically.",
                    "port": 8501
                }),
            ),
            (
                "gradio-developer",
                json!({
                    "name": "Gradio developer",
                    "lib": ["gradio", "pandas", "numpy", "matplotlib"],
                    "file": "app.py",
                    "instructions": "A gradio app. Gradio Blocks/Interface should be called demo.",
                    "port": 7860
                }),
            ),
        ];

        Self::new(
            entries
                .into_iter()
                .map(|(id, template)| (id.to_string(), template))
                .collect(),
        )
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Wire value for `selection`: every template for auto, else a single entry.
    pub fn select(&self, selection: &TemplateSelection) -> Value {
        match selection {
            TemplateSelection::Auto => {
                Value::Object(self.templates.clone().into_iter().collect::<Map<_, _>>())
            }
            TemplateSelection::Named(name) => {
                let mut single = Map::new();
                single.insert(
                    name.clone(),
                    self.templates.get(name).cloned().unwrap_or(Value::Null),
                );
                Value::Object(single)
            }
        }
    }
}
