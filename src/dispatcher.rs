// Provider query dispatcher
// Fans one search out to every matching adapter at once and waits for all of
// them to settle. A failing or slow adapter only ever affects its own slot.

use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::adapter::{AdapterError, ProviderAdapter};
use crate::search_params::SearchParameters;
use crate::supplier::RawPayload;

#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "detail", rename_all = "camelCase")]
pub enum FailureKind {
    #[error("timed out after {0}ms")]
    Timeout(u64),

    #[error("{0}")]
    Error(String),
}

#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("{provider}: {kind}")]
pub struct ProviderFailure {
    pub provider: String,
    pub kind: FailureKind,
}

impl ProviderFailure {
    pub fn timeout(provider: impl Into<String>, after: Duration) -> Self {
        Self {
            provider: provider.into(),
            kind: FailureKind::Timeout(after.as_millis() as u64),
        }
    }

    pub fn error(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            kind: FailureKind::Error(message.into()),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, FailureKind::Timeout(_))
    }
}

#[derive(Debug, Default)]
pub struct DispatchOutcome {
    pub results: Vec<(String, RawPayload)>,
    pub failures: Vec<ProviderFailure>,
}

impl DispatchOutcome {
    pub fn queried(&self) -> usize {
        self.results.len() + self.failures.len()
    }
}

enum Settled {
    Payload(RawPayload),
    Failed(FailureKind),
}

#[derive(Debug, Clone, Default)]
pub struct ProviderQueryDispatcher {
    concurrency: Option<usize>,
}

impl ProviderQueryDispatcher {
    pub fn new() -> Self {
        Self { concurrency: None }
    }

    // Caps how many adapters of one dispatch run at the same time; the rest
    // wait for a permit. Each dispatch gets its own permits.
    pub fn with_concurrency_limit(max_concurrent: usize) -> Self {
        Self {
            concurrency: Some(max_concurrent.max(1)),
        }
    }

    pub async fn dispatch(
        &self,
        params: &SearchParameters,
        adapters: &[Arc<dyn ProviderAdapter>],
        timeout: Duration,
    ) -> DispatchOutcome {
        let matching: Vec<Arc<dyn ProviderAdapter>> = adapters
            .iter()
            .filter(|adapter| adapter.kind() == params.kind())
            .cloned()
            .collect();

        tracing::debug!(
            kind = %params.kind(),
            adapters = matching.len(),
            skipped = adapters.len() - matching.len(),
            "dispatching search"
        );

        let permits = self
            .concurrency
            .map(|limit| Arc::new(Semaphore::new(limit)));

        // Dropping the JoinSet aborts every task still in flight, so a caller
        // that abandons this future releases all pending adapter calls.
        let mut tasks = JoinSet::new();
        for (slot, adapter) in matching.iter().enumerate() {
            let adapter = Arc::clone(adapter);
            let params = params.clone();
            let concurrency = permits.clone();

            tasks.spawn(async move {
                let _permit = match concurrency {
                    Some(semaphore) => match semaphore.acquire_owned().await {
                        Ok(permit) => Some(permit),
                        Err(_) => {
                            return (
                                slot,
                                Settled::Failed(FailureKind::Error(
                                    "dispatcher shut down".to_string(),
                                )),
                            )
                        }
                    },
                    None => None,
                };

                let call = AssertUnwindSafe(adapter.search(&params)).catch_unwind();
                let settled = match tokio::time::timeout(timeout, call).await {
                    Err(_) => Settled::Failed(FailureKind::Timeout(timeout.as_millis() as u64)),
                    Ok(Err(_panic)) => {
                        Settled::Failed(FailureKind::Error("adapter panicked".to_string()))
                    }
                    Ok(Ok(Err(error))) => Settled::Failed(FailureKind::Error(error.to_string())),
                    Ok(Ok(Ok(payload))) if payload.kind() != params.kind() => {
                        Settled::Failed(FailureKind::Error(
                            AdapterError::Malformed(format!(
                                "{} payload returned for a {} search",
                                payload.kind(),
                                params.kind()
                            ))
                            .to_string(),
                        ))
                    }
                    Ok(Ok(Ok(payload))) => Settled::Payload(payload),
                };
                (slot, settled)
            });
        }

        let mut settled: Vec<Option<Settled>> = (0..matching.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, outcome)) => settled[slot] = Some(outcome),
                Err(e) => tracing::warn!(error = %e, "provider task did not complete"),
            }
        }

        // Report in registration order so arrival order never leaks downstream
        let mut outcome = DispatchOutcome::default();
        for (adapter, slot) in matching.iter().zip(settled) {
            let provider = adapter.name().to_string();
            match slot {
                Some(Settled::Payload(payload)) => {
                    tracing::debug!(
                        provider = %provider,
                        records = payload.record_count(),
                        "provider responded"
                    );
                    outcome.results.push((provider, payload));
                }
                Some(Settled::Failed(kind)) => {
                    tracing::warn!(provider = %provider, reason = %kind, "provider failed");
                    outcome.failures.push(ProviderFailure { provider, kind });
                }
                None => {
                    tracing::warn!(provider = %provider, "provider task aborted");
                    outcome
                        .failures
                        .push(ProviderFailure::error(provider, "provider task aborted"));
                }
            }
        }
        outcome
    }
}
