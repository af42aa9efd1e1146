//! Startup selection of the generation and sandbox collaborators.

use std::sync::Arc;

use generation_provider::{GenerationProvider, SandboxProvider};
use generation_provider_http::{
    HttpGenerationProvider, HttpProviderConfig, HttpSandboxProvider, HTTP_PROVIDER_ID,
};
use generation_provider_mock::{MockGenerationProvider, MockSandboxProvider, MOCK_PROVIDER_ID};

use crate::config::EnvConfig;

pub const DEFAULT_PROVIDER_ID: &str = MOCK_PROVIDER_ID;
pub const PROVIDER_ENV_VAR: &str = "FRAGMENTS_PROVIDER";
pub const USER_AGENT: &str = concat!("fragments/", env!("CARGO_PKG_VERSION"));

/// Generation and sandbox providers resolved for one provider id.
#[derive(Clone)]
pub struct Providers {
    pub generation: Arc<dyn GenerationProvider>,
    pub sandbox: Arc<dyn SandboxProvider>,
}

pub fn providers_from_env(config: &EnvConfig) -> Result<Providers, String> {
    let provider_id = std::env::var(PROVIDER_ENV_VAR)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    providers_for_id(provider_id.as_deref().unwrap_or(DEFAULT_PROVIDER_ID), config)
}

pub fn providers_for_id(provider_id: &str, config: &EnvConfig) -> Result<Providers, String> {
    let providers = build_providers(provider_id, config)?;
    let profile = providers.generation.profile();
    tracing::info!(
        provider = %profile.provider_id,
        endpoint = %profile.endpoint,
        "generation provider selected"
    );
    Ok(providers)
}

fn build_providers(provider_id: &str, config: &EnvConfig) -> Result<Providers, String> {
    match provider_id {
        MOCK_PROVIDER_ID => Ok(Providers {
            generation: Arc::new(MockGenerationProvider::default()),
            sandbox: Arc::new(MockSandboxProvider::default()),
        }),
        HTTP_PROVIDER_ID => {
            let http_config = http_config(config);
            let generation = HttpGenerationProvider::new(http_config.clone())
                .map_err(|error| error.to_string())?;
            let sandbox =
                HttpSandboxProvider::new(http_config).map_err(|error| error.to_string())?;
            Ok(Providers {
                generation: Arc::new(generation),
                sandbox: Arc::new(sandbox),
            })
        }
        unknown => Err(format!(
            "Unsupported provider '{unknown}'. Available providers: {MOCK_PROVIDER_ID}, {HTTP_PROVIDER_ID}"
        )),
    }
}

fn http_config(config: &EnvConfig) -> HttpProviderConfig {
    let mut http = HttpProviderConfig::default().with_user_agent(USER_AGENT);
    if let Some(base_url) = config.api_base_url.as_deref() {
        http = http.with_base_url(base_url);
    }
    if let Some(timeout) = config.api_timeout {
        http = http.with_timeout(timeout);
    }
    http
}
