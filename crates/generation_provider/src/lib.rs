//! Provider-neutral contract for streaming one fragment generation and
//! provisioning a sandbox for its result.
//!
//! This crate defines only the shared run lifecycle and wire types. It excludes
//! transport details and any conversation/history handling.

use std::fmt;
use std::sync::{atomic::AtomicBool, Arc};

mod fragment;
mod request;

pub use fragment::{ExecutionResult, FragmentSnapshot, SandboxRequest};
pub use request::{
    GenerationEndpoint, GenerationRequest, LlmModel, LlmModelConfig, RequestMessage, RequestPart,
    RequestRole, SelectionMeta,
};

/// Identifier for one generation run.
pub type RunId = u64;

/// Shared cancellation flag for a run.
pub type CancelSignal = Arc<AtomicBool>;

/// Error returned while constructing/configuring a provider before any run starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderInitError {
    message: String,
}

impl ProviderInitError {
    /// Creates a new provider initialization error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the underlying error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ProviderInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ProviderInitError {}

impl From<String> for ProviderInitError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ProviderInitError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Provider-emitted lifecycle event for a generation.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationEvent {
    Started {
        run_id: RunId,
    },
    /// A cumulative snapshot of the object being generated.
    Snapshot {
        run_id: RunId,
        snapshot: FragmentSnapshot,
    },
    Finished {
        run_id: RunId,
        object: FragmentSnapshot,
    },
    Failed {
        run_id: RunId,
        error: String,
    },
    Cancelled {
        run_id: RunId,
    },
}

impl GenerationEvent {
    /// Returns the run identifier associated with this event.
    #[must_use]
    pub fn run_id(&self) -> RunId {
        match self {
            Self::Started { run_id }
            | Self::Snapshot { run_id, .. }
            | Self::Finished { run_id, .. }
            | Self::Failed { run_id, .. }
            | Self::Cancelled { run_id } => *run_id,
        }
    }

    /// Returns true when this event terminates the run lifecycle.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Finished { .. } | Self::Failed { .. } | Self::Cancelled { .. }
        )
    }
}

/// Immutable metadata describing a generation provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub provider_id: String,
    pub endpoint: String,
}

/// Provider interface for executing one generation request.
pub trait GenerationProvider: Send + Sync + 'static {
    /// Returns provider identity metadata.
    fn profile(&self) -> ProviderProfile;

    /// Executes a request and emits lifecycle events in arrival order.
    ///
    /// Implementations must emit exactly one terminal event unless they return
    /// `Err`, and must stop emitting snapshots once `cancel` is set.
    fn run(
        &self,
        req: GenerationRequest,
        cancel: CancelSignal,
        emit: &mut dyn FnMut(GenerationEvent),
    ) -> Result<(), String>;
}

/// Request/response collaborator that turns a finished fragment into a running sandbox.
pub trait SandboxProvider: Send + Sync + 'static {
    fn provision(&self, req: SandboxRequest) -> Result<ExecutionResult, String>;
}
