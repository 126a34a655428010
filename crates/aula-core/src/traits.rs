//! Trait definitions for question banks and result reporters.
//!
//! These async traits are implemented by the `aula-providers` crate.

use async_trait::async_trait;

use crate::error::SubmissionError;
use crate::model::{Evaluation, Question, SubjectType};
use crate::report::EvaluationResult;

// ---------------------------------------------------------------------------
// Question bank
// ---------------------------------------------------------------------------

/// Source of evaluations and practice questions.
///
/// Sessions only need the evaluation resolved before they start, so
/// implementations may block on I/O.
#[async_trait]
pub trait QuestionBank: Send + Sync {
    /// Human-readable bank name (e.g. "builtin").
    fn name(&self) -> &str;

    /// Look up an evaluation by id.
    async fn evaluation(&self, id: &str) -> anyhow::Result<Evaluation>;

    /// All evaluations in the bank.
    async fn evaluations(&self) -> anyhow::Result<Vec<Evaluation>>;

    /// Practice questions for a subject, in bank order.
    async fn questions(&self, subject: SubjectType) -> anyhow::Result<Vec<Question>>;
}

// ---------------------------------------------------------------------------
// Result reporter
// ---------------------------------------------------------------------------

/// Sink that accepts the finished answer set of a session.
///
/// Called once per successful session; a failed call may be retried with
/// the same result.
#[async_trait]
pub trait ResultReporter: Send + Sync {
    /// Human-readable reporter name (e.g. "http").
    fn name(&self) -> &str;

    async fn submit(&self, result: &EvaluationResult) -> Result<(), SubmissionError>;
}
