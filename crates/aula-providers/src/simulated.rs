//! Simulated reporter for demos and tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tracing::instrument;

use aula_core::error::SubmissionError;
use aula_core::report::EvaluationResult;
use aula_core::traits::ResultReporter;

/// Default acknowledgment latency.
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(1500);

/// A reporter that acknowledges every result after a fixed delay.
///
/// Failures can be scripted with [`SimulatedReporter::fail_next`]; they are
/// returned in order before the reporter goes back to succeeding.
pub struct SimulatedReporter {
    latency: Duration,
    failures: Mutex<VecDeque<SubmissionError>>,
    call_count: AtomicU32,
    received: Mutex<Vec<EvaluationResult>>,
}

impl SimulatedReporter {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            failures: Mutex::new(VecDeque::new()),
            call_count: AtomicU32::new(0),
            received: Mutex::new(Vec::new()),
        }
    }

    /// Queue an error for an upcoming call.
    pub fn fail_next(&self, error: SubmissionError) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(error);
    }

    /// Number of submit calls, failed ones included.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Results that were acknowledged.
    pub fn received(&self) -> Vec<EvaluationResult> {
        self.received
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for SimulatedReporter {
    fn default() -> Self {
        Self::new(DEFAULT_LATENCY)
    }
}

#[async_trait]
impl ResultReporter for SimulatedReporter {
    fn name(&self) -> &str {
        "simulated"
    }

    #[instrument(skip(self, result), fields(result_id = %result.id))]
    async fn submit(&self, result: &EvaluationResult) -> Result<(), SubmissionError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let scripted = self
            .failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        if let Some(error) = scripted {
            tracing::debug!(%error, "simulated submission failure");
            return Err(error);
        }

        self.received
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(result.clone());
        tracing::debug!(score = result.score, "result acknowledged");
        Ok(())
    }
}
