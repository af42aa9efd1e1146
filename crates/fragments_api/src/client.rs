use std::future::Future;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::Duration;

use futures_util::StreamExt;
use generation_provider::{ExecutionResult, FragmentSnapshot, GenerationRequest, SandboxRequest};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Response};
use serde::Serialize;
use serde_json::Value;

use crate::config::FragmentsApiConfig;
use crate::error::{parse_error_message, FragmentsApiError};
use crate::stream::ObjectStreamParser;
use crate::url::{endpoint_url, SANDBOX_PATH};

/// Optional cancellation signal shared across request and stream loops.
pub type CancellationSignal = Arc<AtomicBool>;

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug)]
pub struct FragmentsApiClient {
    http: Client,
    config: FragmentsApiConfig,
}

impl FragmentsApiClient {
    pub fn new(config: FragmentsApiConfig) -> Result<Self, FragmentsApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &FragmentsApiConfig {
        &self.config
    }

    pub fn endpoint(&self, path: &str) -> String {
        endpoint_url(&self.config.base_url, path)
    }

    pub fn build_headers(&self) -> Result<HeaderMap, FragmentsApiError> {
        let mut out = HeaderMap::new();
        if let Some(user_agent) = self.config.user_agent.as_deref() {
            out.insert(
                USER_AGENT,
                HeaderValue::from_str(user_agent).map_err(|_| {
                    FragmentsApiError::InvalidHeader("invalid User-Agent value".to_string())
                })?,
            );
        }
        Ok(out)
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<Response, FragmentsApiError> {
        let request = self
            .http
            .post(self.endpoint(path))
            .headers(self.build_headers()?)
            .json(body)
            .send();
        let response = await_or_cancel(request, cancellation).await??;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = await_or_cancel(response.text(), cancellation)
            .await?
            .unwrap_or_default();
        Err(FragmentsApiError::Status {
            status,
            message: parse_error_message(status, &body),
        })
    }

    /// Stream one generation, reporting every changed snapshot in arrival order.
    ///
    /// Returns the final object once the body has been fully received.
    pub async fn stream_object<F>(
        &self,
        request: &GenerationRequest,
        cancellation: Option<&CancellationSignal>,
        mut on_snapshot: F,
    ) -> Result<FragmentSnapshot, FragmentsApiError>
    where
        F: FnMut(FragmentSnapshot),
    {
        let response = self
            .post_json(request.endpoint.path(), request, cancellation)
            .await?;
        let mut bytes = response.bytes_stream();
        let mut parser = ObjectStreamParser::default();

        loop {
            let Some(chunk) = await_or_cancel(bytes.next(), cancellation).await? else {
                break;
            };
            if is_cancelled(cancellation) {
                return Err(FragmentsApiError::Cancelled);
            }
            let chunk = chunk?;
            if let Some(value) = parser.feed(&chunk)? {
                match snapshot_from_value(value) {
                    Ok(snapshot) => on_snapshot(snapshot),
                    Err(reason) => tracing::debug!(%reason, "skipping partial snapshot"),
                }
            }
        }

        if is_cancelled(cancellation) {
            return Err(FragmentsApiError::Cancelled);
        }

        Ok(serde_json::from_value(parser.finish()?)?)
    }

    /// Provision a sandbox for a finished fragment.
    pub async fn provision_sandbox(
        &self,
        request: &SandboxRequest,
        cancellation: Option<&CancellationSignal>,
    ) -> Result<ExecutionResult, FragmentsApiError> {
        let response = self.post_json(SANDBOX_PATH, request, cancellation).await?;
        let body = await_or_cancel(response.bytes(), cancellation).await??;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Partial objects can momentarily hold a field of the wrong shape (for
/// example a number that later turns out to be part of a string array). Such
/// a snapshot is skipped rather than failing the stream; the next well-typed
/// one supersedes it. The returned reason is logged at debug level.
fn snapshot_from_value(value: Value) -> Result<FragmentSnapshot, String> {
    if !value.is_object() {
        return Err("partial value is not an object".to_string());
    }
    serde_json::from_value(value).map_err(|error| error.to_string())
}

fn is_cancelled(cancel: Option<&CancellationSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancellationSignal>,
) -> Result<F::Output, FragmentsApiError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(FragmentsApiError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(FragmentsApiError::Cancelled);
            }
            return Ok(output);
        }
    }
}
