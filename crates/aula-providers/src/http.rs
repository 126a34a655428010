//! HTTP reporter: POSTs results as JSON to a collection endpoint.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::instrument;

use aula_core::error::SubmissionError;
use aula_core::report::EvaluationResult;
use aula_core::traits::ResultReporter;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Used when a 429 carries no usable `retry-after` header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

pub struct HttpReporter {
    url: String,
    token: Option<String>,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl HttpReporter {
    pub fn new(url: &str, token: Option<String>) -> Result<Self> {
        Self::with_timeout(url, token, DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(url: &str, token: Option<String>, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            url: url.to_string(),
            token: token.filter(|t| !t.is_empty()),
            timeout_secs,
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ResultReporter for HttpReporter {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self, result), fields(url = %self.url, result_id = %result.id))]
    async fn submit(&self, result: &EvaluationResult) -> Result<(), SubmissionError> {
        let mut req = self
            .client
            .post(&self.url)
            .header("content-type", "application/json");
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let response = req.json(result).send().await.map_err(|e| {
            if e.is_timeout() {
                SubmissionError::Timeout(self.timeout_secs)
            } else {
                SubmissionError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
                * 1000;
            return Err(SubmissionError::RateLimited {
                retry_after_ms: retry_after,
            });
        }
        if status == 401 || status == 403 {
            let body = response.text().await.unwrap_or_default();
            return Err(SubmissionError::Unauthorized(body));
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(SubmissionError::Rejected {
                status,
                message: body,
            });
        }

        tracing::debug!(status, "result accepted");
        Ok(())
    }
}
