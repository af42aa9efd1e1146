//! HTTP-backed implementation of the shared `generation_provider` contract.
//!
//! This adapter drives `fragments_api` on a private current-thread runtime so
//! callers stay synchronous, and translates transport outcomes into the
//! run-scoped `GenerationEvent` lifecycle.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use fragments_api::{FragmentsApiClient, FragmentsApiConfig, FragmentsApiError};
use generation_provider::{
    CancelSignal, ExecutionResult, FragmentSnapshot, GenerationEvent, GenerationProvider,
    GenerationRequest, ProviderInitError, ProviderProfile, SandboxProvider, SandboxRequest,
};

/// Stable provider identifier used for explicit startup selection.
pub const HTTP_PROVIDER_ID: &str = "http";

/// Runtime configuration shared by the HTTP generation and sandbox providers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HttpProviderConfig {
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    /// Sent as `User-Agent` on every request.
    pub user_agent: Option<String>,
}

impl HttpProviderConfig {
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    fn into_api_config(self) -> FragmentsApiConfig {
        let mut config = FragmentsApiConfig::default();

        if let Some(base_url) = self.base_url {
            config = config.with_base_url(base_url);
        }

        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }

        if let Some(user_agent) = self.user_agent {
            config = config.with_user_agent(user_agent);
        }

        config
    }
}

trait Transport: Send + Sync {
    fn base_url(&self) -> String;

    fn stream_object(
        &self,
        request: &GenerationRequest,
        cancel: &CancelSignal,
        on_snapshot: &mut dyn FnMut(FragmentSnapshot),
    ) -> Result<FragmentSnapshot, FragmentsApiError>;

    fn provision_sandbox(
        &self,
        request: &SandboxRequest,
    ) -> Result<ExecutionResult, FragmentsApiError>;
}

#[derive(Debug)]
struct DefaultTransport {
    client: FragmentsApiClient,
}

impl DefaultTransport {
    fn connect(config: HttpProviderConfig) -> Result<Self, ProviderInitError> {
        let client = FragmentsApiClient::new(config.into_api_config()).map_err(map_init_error)?;
        Ok(Self { client })
    }

    fn runtime() -> Result<tokio::runtime::Runtime, FragmentsApiError> {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| {
                FragmentsApiError::Unknown(format!("failed to initialize tokio runtime: {error}"))
            })
    }
}

impl Transport for DefaultTransport {
    fn base_url(&self) -> String {
        self.client.config().base_url.clone()
    }

    fn stream_object(
        &self,
        request: &GenerationRequest,
        cancel: &CancelSignal,
        on_snapshot: &mut dyn FnMut(FragmentSnapshot),
    ) -> Result<FragmentSnapshot, FragmentsApiError> {
        Self::runtime()?.block_on(self.client.stream_object(request, Some(cancel), on_snapshot))
    }

    fn provision_sandbox(
        &self,
        request: &SandboxRequest,
    ) -> Result<ExecutionResult, FragmentsApiError> {
        Self::runtime()?.block_on(self.client.provision_sandbox(request, None))
    }
}

/// `GenerationProvider` adapter backed by `fragments_api` transport primitives.
pub struct HttpGenerationProvider {
    transport: Arc<dyn Transport>,
}

impl HttpGenerationProvider {
    /// Creates a provider using real HTTP transport.
    pub fn new(config: HttpProviderConfig) -> Result<Self, ProviderInitError> {
        Ok(Self {
            transport: Arc::new(DefaultTransport::connect(config)?),
        })
    }

    #[cfg(test)]
    fn with_transport_for_tests(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

impl GenerationProvider for HttpGenerationProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: HTTP_PROVIDER_ID.to_string(),
            endpoint: self.transport.base_url(),
        }
    }

    fn run(
        &self,
        req: GenerationRequest,
        cancel: CancelSignal,
        emit: &mut dyn FnMut(GenerationEvent),
    ) -> Result<(), String> {
        let run_id = req.run_id;

        emit(GenerationEvent::Started { run_id });

        if cancel.load(Ordering::Acquire) {
            emit(GenerationEvent::Cancelled { run_id });
            return Ok(());
        }

        let outcome = {
            let mut on_snapshot =
                |snapshot: FragmentSnapshot| emit(GenerationEvent::Snapshot { run_id, snapshot });
            self.transport.stream_object(&req, &cancel, &mut on_snapshot)
        };

        match outcome {
            Ok(object) => emit(GenerationEvent::Finished { run_id, object }),
            Err(FragmentsApiError::Cancelled) => emit(GenerationEvent::Cancelled { run_id }),
            // The message is surfaced verbatim; callers classify it by content.
            Err(error) => emit(GenerationEvent::Failed {
                run_id,
                error: error.to_string(),
            }),
        }

        Ok(())
    }
}

/// `SandboxProvider` adapter posting finished fragments to the sandbox route.
pub struct HttpSandboxProvider {
    transport: Arc<dyn Transport>,
}

impl HttpSandboxProvider {
    pub fn new(config: HttpProviderConfig) -> Result<Self, ProviderInitError> {
        Ok(Self {
            transport: Arc::new(DefaultTransport::connect(config)?),
        })
    }

    #[cfg(test)]
    fn with_transport_for_tests(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

impl SandboxProvider for HttpSandboxProvider {
    fn provision(&self, req: SandboxRequest) -> Result<ExecutionResult, String> {
        self.transport
            .provision_sandbox(&req)
            .map_err(|error| error.to_string())
    }
}

fn map_init_error(error: FragmentsApiError) -> ProviderInitError {
    ProviderInitError::new(format!("Failed to initialize http provider: {error}"))
}
