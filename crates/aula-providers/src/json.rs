//! Reporter that stores results as JSON files.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::instrument;

use aula_core::error::SubmissionError;
use aula_core::report::EvaluationResult;
use aula_core::traits::ResultReporter;

/// Writes each result to `<dir>/result-<evaluation>-<id>.json`.
pub struct JsonFileReporter {
    dir: PathBuf,
}

impl JsonFileReporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where a given result ends up. Characters outside `[A-Za-z0-9_-]`
    /// in the evaluation id are replaced so the file stays in `dir`.
    pub fn path_for(&self, result: &EvaluationResult) -> PathBuf {
        let evaluation: String = result
            .evaluation_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir
            .join(format!("result-{evaluation}-{}.json", result.id))
    }
}

#[async_trait]
impl ResultReporter for JsonFileReporter {
    fn name(&self) -> &str {
        "json"
    }

    #[instrument(skip(self, result), fields(result_id = %result.id))]
    async fn submit(&self, result: &EvaluationResult) -> Result<(), SubmissionError> {
        let path = self.path_for(result);
        let record = result.clone();
        let target = path.clone();
        tokio::task::spawn_blocking(move || record.save_json(&target))
            .await
            .map_err(|e| SubmissionError::Storage(format!("write task failed: {e}")))?
            .map_err(|e| SubmissionError::Storage(format!("{e:#}")))?;

        tracing::info!(path = %path.display(), "result saved");
        Ok(())
    }
}
