//! Tracing subscriber setup.
//!
//! Filter directives come from `FRAGMENTS_LOG`, then `RUST_LOG`, then `warn`.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV_VAR: &str = "FRAGMENTS_LOG";
const DEFAULT_DIRECTIVES: &str = "warn";

/// Installs a stderr `fmt` subscriber. Returns false when one was already installed.
pub fn init() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_ok()
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}
