//! Error types for the session engine and result reporting.
//!
//! `SubmissionError` lives here rather than next to the reporters so the
//! session driver can classify failures for retry decisions without
//! string matching.

use thiserror::Error;

use crate::session::Phase;

/// Violations of the model invariants, raised when a question or
/// evaluation is constructed or loaded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("question {0} needs at least two options")]
    TooFewOptions(String),

    #[error("question {question_id} has duplicate option id {option_id}")]
    DuplicateOption {
        question_id: String,
        option_id: String,
    },

    #[error("question {0} has no correct option")]
    NoCorrectOption(String),

    #[error("question {question_id} has {count} correct options, expected exactly one")]
    MultipleCorrectOptions { question_id: String, count: usize },

    #[error("evaluation id {0:?} may only contain letters, digits, '-' and '_'")]
    InvalidId(String),

    #[error("evaluation {0} has no questions")]
    EmptyEvaluation(String),

    #[error("evaluation {evaluation_id} contains question {question_id} more than once")]
    DuplicateQuestion {
        evaluation_id: String,
        question_id: String,
    },

    #[error("evaluation {0} has a zero time limit")]
    ZeroTimeLimit(String),

    #[error("evaluation {evaluation_id} time limit of {minutes} minutes exceeds one day")]
    TimeLimitTooLong { evaluation_id: String, minutes: u32 },

    #[error("evaluation {evaluation_id} passing score {score} is not a percentage")]
    PassingScoreOutOfRange { evaluation_id: String, score: u32 },
}

/// Operations rejected by an evaluation session.
///
/// These are session-local: the engine absorbs them and the caller
/// decides whether to surface them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The operation is not legal in the current phase.
    #[error("cannot {action} while the session is {phase}")]
    InvalidTransition { action: &'static str, phase: Phase },

    #[error("unknown question: {0}")]
    UnknownQuestion(String),

    #[error("question {question_id} has no option {option_id}")]
    UnknownOption {
        question_id: String,
        option_id: String,
    },

    /// Manual submission is only offered on the last question.
    #[error("the evaluation can only be submitted from the last question")]
    NotOnLastQuestion,
}

/// Errors that can occur when handing a finished session to a reporter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// The sink asked us to slow down.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Credentials were missing or refused.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The sink answered but refused the result.
    #[error("result rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The request timed out.
    #[error("submission timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    Network(String),

    /// A local sink could not store the result.
    #[error("storage error: {0}")]
    Storage(String),
}

impl SubmissionError {
    /// Returns `true` if retrying the same submission cannot succeed.
    pub fn is_permanent(&self) -> bool {
        match self {
            SubmissionError::Unauthorized(_) => true,
            // 4xx other than 408/429 means the payload itself was refused
            SubmissionError::Rejected { status, .. } => {
                (400..500).contains(status) && *status != 408 && *status != 429
            }
            _ => false,
        }
    }

    /// Returns the retry-after delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            SubmissionError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}

/// Rejections from the practice engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PracticeError {
    #[error("the practice round has no questions")]
    NoQuestions,

    #[error("no option selected")]
    NothingSelected,

    #[error("question {question_id} has no option {option_id}")]
    UnknownOption {
        question_id: String,
        option_id: String,
    },

    #[error("the current question is already answered")]
    AlreadyAnswered,

    #[error("the current question is not answered yet")]
    NotAnswered,

    #[error("no retries left for this question")]
    NoRetriesLeft,

    #[error("the practice round is finished")]
    Finished,

    #[error(transparent)]
    Model(#[from] ModelError),
}
