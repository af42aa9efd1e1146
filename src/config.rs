//! Environment configuration.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::selection::DEFAULT_MAX_SELECTION_CHARS;

pub const MAX_SELECTION_CHARS_ENV_VAR: &str = "FRAGMENTS_MAX_SELECTION_CHARS";
pub const AUTO_ATTACH_ENV_VAR: &str = "FRAGMENTS_AUTO_ATTACH";
pub const HIDE_LOCAL_MODELS_ENV_VAR: &str = "FRAGMENTS_HIDE_LOCAL_MODELS";
pub const USE_MORPH_APPLY_ENV_VAR: &str = "FRAGMENTS_USE_MORPH_APPLY";
pub const PREFS_PATH_ENV_VAR: &str = "FRAGMENTS_PREFS_PATH";
pub const API_BASE_URL_ENV_VAR: &str = "FRAGMENTS_API_BASE_URL";
pub const API_TIMEOUT_ENV_VAR: &str = "FRAGMENTS_API_TIMEOUT_SEC";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    pub max_selection_chars: usize,
    pub auto_attach: bool,
    pub hide_local_models: bool,
    pub use_morph_apply: bool,
    pub prefs_path: Option<PathBuf>,
    pub api_base_url: Option<String>,
    pub api_timeout: Option<Duration>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            max_selection_chars: DEFAULT_MAX_SELECTION_CHARS,
            auto_attach: false,
            hide_local_models: false,
            use_morph_apply: false,
            prefs_path: None,
            api_base_url: None,
            api_timeout: None,
        }
    }
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self {
            max_selection_chars: env_positive_usize(MAX_SELECTION_CHARS_ENV_VAR)
                .unwrap_or(DEFAULT_MAX_SELECTION_CHARS),
            auto_attach: env_flag(AUTO_ATTACH_ENV_VAR),
            hide_local_models: env_flag(HIDE_LOCAL_MODELS_ENV_VAR),
            use_morph_apply: env_flag(USE_MORPH_APPLY_ENV_VAR),
            prefs_path: env_string_opt(PREFS_PATH_ENV_VAR).map(PathBuf::from),
            api_base_url: env_string_opt(API_BASE_URL_ENV_VAR),
            api_timeout: env_positive_usize(API_TIMEOUT_ENV_VAR)
                .map(|secs| Duration::from_secs(secs as u64)),
        }
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key).map(|value| value == "1").unwrap_or(false)
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

fn env_positive_usize(key: &str) -> Option<usize> {
    env_string_opt(key)
        .and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|value| *value > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    struct EnvGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = &self.previous {
                env::set_var(self.key, value);
            } else {
                env::remove_var(self.key);
            }
        }
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
            .lock()
            .expect("env lock poisoned")
    }

    fn set_env_guard(key: &'static str, value: Option<&str>) -> EnvGuard {
        let previous = env::var(key).ok();
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
        EnvGuard { key, previous }
    }

    #[test]
    fn env_defaults_match_builtin_defaults() {
        let _lock = env_lock();
        let _g1 = set_env_guard(MAX_SELECTION_CHARS_ENV_VAR, None);
        let _g2 = set_env_guard(AUTO_ATTACH_ENV_VAR, None);
        let _g3 = set_env_guard(HIDE_LOCAL_MODELS_ENV_VAR, None);
        let _g4 = set_env_guard(USE_MORPH_APPLY_ENV_VAR, None);
        let _g5 = set_env_guard(PREFS_PATH_ENV_VAR, None);
        let _g6 = set_env_guard(API_BASE_URL_ENV_VAR, None);
        let _g7 = set_env_guard(API_TIMEOUT_ENV_VAR, None);

        assert_eq!(EnvConfig::from_env(), EnvConfig::default());
        assert_eq!(EnvConfig::default().max_selection_chars, 12_000);
    }

    #[test]
    fn env_flags_set_to_one_enable() {
        let _lock = env_lock();
        let _g1 = set_env_guard(AUTO_ATTACH_ENV_VAR, Some("1"));
        let _g2 = set_env_guard(HIDE_LOCAL_MODELS_ENV_VAR, Some("1"));
        let _g3 = set_env_guard(USE_MORPH_APPLY_ENV_VAR, Some("true"));
        let _g4 = set_env_guard(PREFS_PATH_ENV_VAR, Some("/tmp/fragments/prefs.json"));
        let _g5 = set_env_guard(API_BASE_URL_ENV_VAR, Some("http://127.0.0.1:3000"));
        let _g6 = set_env_guard(API_TIMEOUT_ENV_VAR, Some("30"));
        let _g7 = set_env_guard(MAX_SELECTION_CHARS_ENV_VAR, Some("500"));

        let config = EnvConfig::from_env();
        assert!(config.auto_attach);
        assert!(config.hide_local_models);
        assert!(!config.use_morph_apply);
        assert_eq!(
            config.prefs_path,
            Some(PathBuf::from("/tmp/fragments/prefs.json"))
        );
        assert_eq!(config.api_base_url.as_deref(), Some("http://127.0.0.1:3000"));
        assert_eq!(config.api_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.max_selection_chars, 500);
    }

    #[test]
    fn blank_or_invalid_values_fall_back() {
        let _lock = env_lock();
        let _g1 = set_env_guard(PREFS_PATH_ENV_VAR, Some("  "));
        let _g2 = set_env_guard(MAX_SELECTION_CHARS_ENV_VAR, Some("0"));
        let _g3 = set_env_guard(API_TIMEOUT_ENV_VAR, Some("soon"));

        let config = EnvConfig::from_env();
        assert!(config.prefs_path.is_none());
        assert_eq!(config.max_selection_chars, DEFAULT_MAX_SELECTION_CHARS);
        assert!(config.api_timeout.is_none());
    }
}
