//! Local settings carried across launches through [`PrefsStore`].
//!
//! Only the chat draft and settings are stored. Messages and selections live
//! for the process lifetime.

use generation_provider::LlmModelConfig;
use prefs_store::{PrefsStore, PrefsStoreError};

pub const CHAT_KEY: &str = "chat";
pub const LANGUAGE_MODEL_KEY: &str = "languageModel";
pub const AUTO_ATTACH_KEY: &str = "autoAttachSelection";
pub const USE_MORPH_APPLY_KEY: &str = "useMorphApply";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedState {
    pub chat: String,
    pub language_model: LlmModelConfig,
    pub auto_attach_selection: bool,
    pub use_morph_apply: bool,
}

impl PersistedState {
    /// Reads every key, keeping the matching field of `defaults` for keys that
    /// are absent.
    pub fn load(store: &PrefsStore, defaults: PersistedState) -> Result<Self, PrefsStoreError> {
        Ok(Self {
            chat: store.get(CHAT_KEY)?.unwrap_or(defaults.chat),
            language_model: store
                .get(LANGUAGE_MODEL_KEY)?
                .unwrap_or(defaults.language_model),
            auto_attach_selection: store
                .get(AUTO_ATTACH_KEY)?
                .unwrap_or(defaults.auto_attach_selection),
            use_morph_apply: store
                .get(USE_MORPH_APPLY_KEY)?
                .unwrap_or(defaults.use_morph_apply),
        })
    }

    /// Writes every field into `store` and flushes it.
    pub fn save(&self, store: &mut PrefsStore) -> Result<(), PrefsStoreError> {
        store.set(CHAT_KEY, &self.chat)?;
        store.set(LANGUAGE_MODEL_KEY, &self.language_model)?;
        store.set(AUTO_ATTACH_KEY, &self.auto_attach_selection)?;
        store.set(USE_MORPH_APPLY_KEY, &self.use_morph_apply)?;
        store.flush()
    }
}
