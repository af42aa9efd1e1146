//! Deterministic mock implementation of the shared `generation_provider` contract.
//!
//! This crate contains no transport/protocol logic and is intended for local
//! development and contract-level integration testing.

use std::sync::atomic::Ordering;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use generation_provider::{
    CancelSignal, ExecutionResult, FragmentSnapshot, GenerationEvent, GenerationProvider,
    GenerationRequest, ProviderProfile, SandboxProvider, SandboxRequest,
};

/// Stable provider identifier used for explicit startup selection.
pub const MOCK_PROVIDER_ID: &str = "mock";

/// Scripted outcome after all snapshots have been emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Ending {
    Finish,
    Fail(String),
}

/// Deterministic mock provider used by `fragments` tests and local runs.
///
/// Each scripted snapshot is emitted as-is, so scripts should be cumulative the
/// way a real object stream is.
#[derive(Debug)]
pub struct MockGenerationProvider {
    snapshots: Vec<FragmentSnapshot>,
    ending: Ending,
    run_delay: Duration,
    snapshot_delay: Duration,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl MockGenerationProvider {
    const RUN_DELAY_MS: u64 = 200;
    const SNAPSHOT_DELAY_MS: u64 = 50;

    /// Creates a mock provider that streams `snapshots` and then finishes.
    #[must_use]
    pub fn new(snapshots: Vec<FragmentSnapshot>) -> Self {
        Self {
            snapshots,
            ending: Ending::Finish,
            run_delay: Duration::from_millis(Self::RUN_DELAY_MS),
            snapshot_delay: Duration::from_millis(Self::SNAPSHOT_DELAY_MS),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Streams `snapshots` and then fails with `error` instead of finishing.
    #[must_use]
    pub fn failing(snapshots: Vec<FragmentSnapshot>, error: impl Into<String>) -> Self {
        Self {
            ending: Ending::Fail(error.into()),
            ..Self::new(snapshots)
        }
    }

    /// Overrides the pacing delays. Tests pass `Duration::ZERO`.
    #[must_use]
    pub fn with_delays(mut self, run_delay: Duration, snapshot_delay: Duration) -> Self {
        self.run_delay = run_delay;
        self.snapshot_delay = snapshot_delay;
        self
    }

    /// Requests observed so far, in call order.
    #[must_use]
    pub fn requests(&self) -> Vec<GenerationRequest> {
        lock_unpoisoned(&self.requests).clone()
    }

    fn pause(duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

impl Default for MockGenerationProvider {
    fn default() -> Self {
        let commentary = [
            "I'll build",
            "I'll build a counter component",
            "I'll build a counter component with increment and reset buttons.",
        ];
        let code = [
            "",
            "export default function Counter() {\n",
            "export default function Counter() {\n  const [count, setCount] = useState(0)\n",
            "export default function Counter() {\n  const [count, setCount] = useState(0)\n  return <button onClick={() => setCount(count + 1)}>{count}</button>\n}\n",
        ];

        let mut snapshots = Vec::new();
        for text in commentary {
            snapshots.push(FragmentSnapshot {
                commentary: Some(text.to_string()),
                ..FragmentSnapshot::default()
            });
        }

        for (index, source) in code.iter().enumerate().skip(1) {
            snapshots.push(FragmentSnapshot {
                commentary: Some(commentary[2].to_string()),
                template: Some("nextjs-developer".to_string()),
                title: Some("Counter".to_string()),
                file_path: (index > 1).then(|| "pages/index.tsx".to_string()),
                code: Some(source.to_string()),
                port: (index == code.len() - 1).then_some(3000),
                ..FragmentSnapshot::default()
            });
        }

        Self::new(snapshots)
    }
}

impl GenerationProvider for MockGenerationProvider {
    fn profile(&self) -> ProviderProfile {
        ProviderProfile {
            provider_id: MOCK_PROVIDER_ID.to_string(),
            endpoint: "memory".to_string(),
        }
    }

    fn run(
        &self,
        req: GenerationRequest,
        cancel: CancelSignal,
        emit: &mut dyn FnMut(GenerationEvent),
    ) -> Result<(), String> {
        let run_id = req.run_id;
        lock_unpoisoned(&self.requests).push(req);

        emit(GenerationEvent::Started { run_id });
        Self::pause(self.run_delay);

        let mut latest = FragmentSnapshot::default();
        for snapshot in &self.snapshots {
            if cancel.load(Ordering::SeqCst) {
                emit(GenerationEvent::Cancelled { run_id });
                return Ok(());
            }

            latest = snapshot.clone();
            emit(GenerationEvent::Snapshot {
                run_id,
                snapshot: snapshot.clone(),
            });
            Self::pause(self.snapshot_delay);
        }

        if cancel.load(Ordering::SeqCst) {
            emit(GenerationEvent::Cancelled { run_id });
            return Ok(());
        }

        match &self.ending {
            Ending::Finish => emit(GenerationEvent::Finished {
                run_id,
                object: latest,
            }),
            Ending::Fail(error) => emit(GenerationEvent::Failed {
                run_id,
                error: error.clone(),
            }),
        }

        Ok(())
    }
}

/// Sandbox collaborator that answers every request with a fixed result.
#[derive(Debug)]
pub struct MockSandboxProvider {
    outcome: Result<ExecutionResult, String>,
    requests: Mutex<Vec<SandboxRequest>>,
}

impl MockSandboxProvider {
    #[must_use]
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            outcome: Ok(ExecutionResult {
                sbx_id: Some("mock-sandbox".to_string()),
                url: Some(url.into()),
                ..ExecutionResult::default()
            }),
            requests: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn failing(error: impl Into<String>) -> Self {
        Self {
            outcome: Err(error.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn requests(&self) -> Vec<SandboxRequest> {
        lock_unpoisoned(&self.requests).clone()
    }
}

impl Default for MockSandboxProvider {
    fn default() -> Self {
        Self::with_url("https://3000-mock-sandbox.e2b.app")
    }
}

impl SandboxProvider for MockSandboxProvider {
    fn provision(&self, req: SandboxRequest) -> Result<ExecutionResult, String> {
        let mut result = self.outcome.clone();
        if let Ok(result) = result.as_mut() {
            result.template = req.fragment.template.clone();
        }
        lock_unpoisoned(&self.requests).push(req);
        result
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
