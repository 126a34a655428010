//! Timed evaluation session state machine.
//!
//! An [`EvaluationSession`] walks one student through the ordered
//! questions of an [`Evaluation`] under a deadline:
//!
//! ```text
//! Countdown ──► InProgress ──► Submitting ──► Completed
//!     │              │              │
//!     └──────────────┴──────────────┴──► Abandoned
//! ```
//!
//! The engine owns no clock. Time advances only through [`tick`], one
//! call per second, which keeps every transition deterministic. The
//! async [`driver`](crate::driver) supplies the ticks and talks to the
//! result reporter.
//!
//! [`tick`]: EvaluationSession::tick

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ModelError, SessionError, SubmissionError};
use crate::model::{Answer, Evaluation, Question};
use crate::report::{EvaluationResult, SubmitReason};
use crate::scoring::{format_time, percentage};

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    /// Pre-roll before the deadline starts.
    Countdown { remaining: u32 },
    InProgress,
    /// Waiting for the result reporter to accept the answers.
    Submitting,
    Completed,
    /// Discarded without reporting.
    Abandoned,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Abandoned)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Countdown { .. } => write!(f, "counting down"),
            Phase::InProgress => write!(f, "in progress"),
            Phase::Submitting => write!(f, "submitting"),
            Phase::Completed => write!(f, "completed"),
            Phase::Abandoned => write!(f, "abandoned"),
        }
    }
}

/// Configuration for a single session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Pre-roll ticks before the deadline timer starts. Zero skips the
    /// countdown.
    pub countdown_ticks: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { countdown_ticks: 3 }
    }
}

impl SessionConfig {
    pub fn without_countdown() -> Self {
        Self { countdown_ticks: 0 }
    }
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Still counting down; ticks left.
    Countdown(u32),
    /// The countdown finished and the deadline started.
    Started,
    /// Seconds left before the deadline.
    Running(u32),
    /// The deadline elapsed and the session is now submitting.
    TimedOut,
    /// The phase has no timer; nothing changed.
    Idle,
}

/// One student's attempt at an evaluation.
#[derive(Debug, Clone)]
pub struct EvaluationSession {
    id: Uuid,
    evaluation: Arc<Evaluation>,
    user_id: Option<String>,
    phase: Phase,
    current_index: usize,
    /// Insertion order is selection order; at most one entry per question.
    answers: Vec<Answer>,
    remaining_secs: u32,
    elapsed_secs: u32,
    /// Seconds each question has been on screen, by question index.
    time_on_question: Vec<u32>,
    /// Hints revealed per question, by question index.
    hints_revealed: Vec<u32>,
    /// Frozen on entering `Submitting` so retries resend the same record.
    result: Option<EvaluationResult>,
    failed_submissions: u32,
    last_error: Option<SubmissionError>,
}

impl EvaluationSession {
    /// Start a session. The evaluation is validated first.
    pub fn new(evaluation: Arc<Evaluation>, config: SessionConfig) -> Result<Self, ModelError> {
        evaluation.validate()?;

        let question_count = evaluation.questions.len();
        let phase = if config.countdown_ticks > 0 {
            Phase::Countdown {
                remaining: config.countdown_ticks,
            }
        } else {
            Phase::InProgress
        };
        let id = Uuid::new_v4();

        tracing::info!(
            session = %id,
            evaluation = %evaluation.id,
            questions = question_count,
            "evaluation session created"
        );

        Ok(Self {
            id,
            remaining_secs: evaluation.time_limit_secs(),
            evaluation,
            user_id: None,
            phase,
            current_index: 0,
            answers: Vec::new(),
            elapsed_secs: 0,
            time_on_question: vec![0; question_count],
            hints_revealed: vec![0; question_count],
            result: None,
            failed_submissions: 0,
            last_error: None,
        })
    }

    /// Attribute the session to a user.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn evaluation(&self) -> &Evaluation {
        &self.evaluation
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> &Question {
        &self.evaluation.questions[self.current_index]
    }

    pub fn question_count(&self) -> usize {
        self.evaluation.questions.len()
    }

    pub fn is_last_question(&self) -> bool {
        self.current_index + 1 == self.question_count()
    }

    /// Answers in the order they were first selected.
    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    pub fn answer_for(&self, question_id: &str) -> Option<&Answer> {
        self.answers.iter().find(|a| a.question_id == question_id)
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.elapsed_secs
    }

    /// Remaining time as `m:ss`.
    pub fn formatted_remaining(&self) -> String {
        format_time(self.remaining_secs)
    }

    /// Answered questions over total, as a percentage. Independent of the
    /// current index.
    pub fn progress_percent(&self) -> u32 {
        percentage(self.answers.len(), self.question_count())
    }

    pub fn failed_submissions(&self) -> u32 {
        self.failed_submissions
    }

    pub fn last_error(&self) -> Option<&SubmissionError> {
        self.last_error.as_ref()
    }

    /// Advance the clock by one second.
    pub fn tick(&mut self) -> TickOutcome {
        match self.phase {
            Phase::Countdown { remaining } => {
                let remaining = remaining.saturating_sub(1);
                if remaining == 0 {
                    self.phase = Phase::InProgress;
                    tracing::debug!(session = %self.id, "countdown finished");
                    TickOutcome::Started
                } else {
                    self.phase = Phase::Countdown { remaining };
                    TickOutcome::Countdown(remaining)
                }
            }
            Phase::InProgress => {
                self.remaining_secs = self.remaining_secs.saturating_sub(1);
                self.elapsed_secs += 1;
                self.time_on_question[self.current_index] += 1;

                if self.remaining_secs == 0 {
                    tracing::info!(
                        session = %self.id,
                        answered = self.answers.len(),
                        "time limit reached"
                    );
                    self.enter_submitting(SubmitReason::Timeout);
                    TickOutcome::TimedOut
                } else {
                    TickOutcome::Running(self.remaining_secs)
                }
            }
            Phase::Submitting | Phase::Completed | Phase::Abandoned => TickOutcome::Idle,
        }
    }

    /// Record (or replace) the answer for a question.
    ///
    /// Correctness is taken from the option at selection time.
    pub fn select_option(
        &mut self,
        question_id: &str,
        option_id: &str,
    ) -> Result<&Answer, SessionError> {
        self.require_in_progress("select an option")?;

        let index = self
            .evaluation
            .questions
            .iter()
            .position(|q| q.id == question_id)
            .ok_or_else(|| SessionError::UnknownQuestion(question_id.to_string()))?;
        let option = self.evaluation.questions[index]
            .option(option_id)
            .ok_or_else(|| SessionError::UnknownOption {
                question_id: question_id.to_string(),
                option_id: option_id.to_string(),
            })?;
        let is_correct = option.is_correct;
        let time_spent = self.time_on_question[index];
        let hints_used = self.hints_revealed[index];

        let position = match self
            .answers
            .iter()
            .position(|a| a.question_id == question_id)
        {
            Some(pos) => {
                let answer = &mut self.answers[pos];
                answer.selected_option_id = option_id.to_string();
                answer.is_correct = is_correct;
                answer.time_spent = time_spent;
                answer.hints_used = hints_used;
                pos
            }
            None => {
                self.answers.push(Answer {
                    question_id: question_id.to_string(),
                    selected_option_id: option_id.to_string(),
                    is_correct,
                    time_spent,
                    attempts: 1,
                    hints_used,
                });
                self.answers.len() - 1
            }
        };

        tracing::debug!(
            session = %self.id,
            question = question_id,
            option = option_id,
            is_correct,
            "answer recorded"
        );
        Ok(&self.answers[position])
    }

    /// Move to the next question. Returns `false` at the last question or
    /// outside `InProgress`.
    pub fn advance(&mut self) -> bool {
        if self.is_last_question() {
            return false;
        }
        self.go_to(self.current_index + 1)
    }

    /// Move to the previous question. Returns `false` at the first
    /// question or outside `InProgress`.
    pub fn retreat(&mut self) -> bool {
        match self.current_index.checked_sub(1) {
            Some(index) => self.go_to(index),
            None => false,
        }
    }

    /// Jump to a question by index. Out-of-range indices are clamped.
    pub fn go_to(&mut self, index: usize) -> bool {
        if self.phase != Phase::InProgress {
            return false;
        }
        let index = index.min(self.question_count() - 1);
        if index == self.current_index {
            return false;
        }
        self.current_index = index;
        true
    }

    /// Reveal the next hint of the current question.
    ///
    /// Returns `None` once every hint has been shown.
    pub fn reveal_hint(&mut self) -> Result<Option<&str>, SessionError> {
        self.require_in_progress("reveal a hint")?;

        let index = self.current_index;
        let question = &self.evaluation.questions[index];
        let revealed = self.hints_revealed[index] as usize;
        let Some(hint) = question.hints.get(revealed) else {
            return Ok(None);
        };

        self.hints_revealed[index] += 1;
        let hints_used = self.hints_revealed[index];
        if let Some(answer) = self
            .answers
            .iter_mut()
            .find(|a| a.question_id == question.id)
        {
            answer.hints_used = hints_used;
        }
        Ok(Some(hint.as_str()))
    }

    /// Submit from the last question. Effective once: later calls are
    /// rejected.
    pub fn submit(&mut self) -> Result<SubmitReason, SessionError> {
        self.require_in_progress("submit")?;
        if !self.is_last_question() {
            return Err(SessionError::NotOnLastQuestion);
        }
        self.enter_submitting(SubmitReason::Manual);
        Ok(SubmitReason::Manual)
    }

    /// The frozen result awaiting acknowledgment, while `Submitting`.
    pub fn pending_result(&self) -> Option<&EvaluationResult> {
        match self.phase {
            Phase::Submitting => self.result.as_ref(),
            _ => None,
        }
    }

    /// The reported result, once `Completed`.
    pub fn result(&self) -> Option<&EvaluationResult> {
        match self.phase {
            Phase::Completed => self.result.as_ref(),
            _ => None,
        }
    }

    /// The reporter accepted the result: `Submitting` -> `Completed`.
    pub fn acknowledge(&mut self) -> Result<&EvaluationResult, SessionError> {
        self.require_phase(Phase::Submitting, "complete")?;
        self.phase = Phase::Completed;
        self.last_error = None;

        let result = self.result.as_ref().ok_or(SessionError::InvalidTransition {
            action: "complete",
            phase: Phase::Submitting,
        })?;
        tracing::info!(
            session = %self.id,
            evaluation = %result.evaluation_id,
            score = result.score,
            passed = result.passed,
            "evaluation completed"
        );
        Ok(result)
    }

    /// The reporter refused the result. The session stays `Submitting`
    /// with its answers intact; returns the number of failed attempts.
    pub fn record_failure(&mut self, error: SubmissionError) -> Result<u32, SessionError> {
        self.require_phase(Phase::Submitting, "record a submission failure")?;
        self.failed_submissions += 1;
        tracing::warn!(
            session = %self.id,
            attempt = self.failed_submissions,
            "submission failed: {error}"
        );
        self.last_error = Some(error);
        Ok(self.failed_submissions)
    }

    /// Discard the session without reporting. Returns how many answers
    /// were dropped.
    pub fn abandon(&mut self) -> Result<usize, SessionError> {
        if self.phase.is_terminal() {
            return Err(SessionError::InvalidTransition {
                action: "abandon",
                phase: self.phase,
            });
        }
        self.phase = Phase::Abandoned;
        self.result = None;
        let discarded = self.answers.len();
        tracing::info!(session = %self.id, discarded, "evaluation session abandoned");
        Ok(discarded)
    }

    fn enter_submitting(&mut self, reason: SubmitReason) {
        // Final per-question time and hint counts go into the record.
        let mut answers = self.answers.clone();
        for answer in &mut answers {
            if let Some(index) = self
                .evaluation
                .questions
                .iter()
                .position(|q| q.id == answer.question_id)
            {
                answer.time_spent = self.time_on_question[index];
                answer.hints_used = self.hints_revealed[index];
            }
        }

        self.result = Some(EvaluationResult::new(
            self.id,
            &self.evaluation,
            answers,
            self.elapsed_secs,
            reason,
            self.user_id.clone(),
        ));
        self.phase = Phase::Submitting;
        tracing::debug!(session = %self.id, %reason, "submitting evaluation");
    }

    fn require_in_progress(&self, action: &'static str) -> Result<(), SessionError> {
        self.require_phase(Phase::InProgress, action)
    }

    fn require_phase(&self, phase: Phase, action: &'static str) -> Result<(), SessionError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                action,
                phase: self.phase,
            })
        }
    }
}
