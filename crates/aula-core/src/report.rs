//! Evaluation result records with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::model::{Answer, Evaluation, SubjectType};
use crate::scoring::{format_time, percentage};

/// Why a session left `InProgress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmitReason {
    /// The student pressed submit on the last question.
    Manual,
    /// The deadline elapsed.
    Timeout,
}

impl fmt::Display for SubmitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitReason::Manual => write!(f, "manual"),
            SubmitReason::Timeout => write!(f, "timeout"),
        }
    }
}

/// The finished answer set of one session, scored against its evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    /// Unique session identifier.
    pub id: Uuid,
    pub evaluation_id: String,
    pub evaluation_title: String,
    pub subject: SubjectType,
    /// Acting user, supplied by the caller.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Answers in selection order. Unanswered questions are absent.
    pub answers: Vec<Answer>,
    pub question_count: usize,
    pub correct_count: usize,
    /// Percentage of questions answered correctly.
    pub score: u32,
    pub passing_score: u32,
    pub passed: bool,
    /// Seconds spent in the session before submission.
    pub total_time: u32,
    pub reason: SubmitReason,
    /// True when every question has an answer.
    pub completed: bool,
    pub date: DateTime<Utc>,
}

impl EvaluationResult {
    pub fn new(
        id: Uuid,
        evaluation: &Evaluation,
        answers: Vec<Answer>,
        total_time: u32,
        reason: SubmitReason,
        user_id: Option<String>,
    ) -> Self {
        let question_count = evaluation.questions.len();
        let correct_count = answers.iter().filter(|a| a.is_correct).count();
        let score = percentage(correct_count, question_count);

        Self {
            id,
            evaluation_id: evaluation.id.clone(),
            evaluation_title: evaluation.title.clone(),
            subject: evaluation.subject,
            user_id,
            completed: answers.len() == question_count,
            answers,
            question_count,
            correct_count,
            score,
            passing_score: evaluation.passing_score,
            passed: score >= evaluation.passing_score,
            total_time,
            reason,
            date: Utc::now(),
        }
    }

    /// Save the result as pretty JSON.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize result")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write result to {}", path.display()))?;
        Ok(())
    }

    /// Load a result from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read result from {}", path.display()))?;
        let result: EvaluationResult =
            serde_json::from_str(&content).context("failed to parse result JSON")?;
        Ok(result)
    }

    /// Format the result as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!("## {}\n\n", self.evaluation_title));
        md.push_str(&format!(
            "**Score:** {}% ({} of {} correct), passing score {}%: {}\n\n",
            self.score,
            self.correct_count,
            self.question_count,
            self.passing_score,
            if self.passed { "passed" } else { "not passed" }
        ));
        md.push_str(&format!(
            "**Time:** {} ({} submission)\n\n",
            format_time(self.total_time),
            self.reason
        ));

        if !self.answers.is_empty() {
            md.push_str("| Question | Option | Correct | Time | Attempts | Hints |\n");
            md.push_str("|----------|--------|---------|------|----------|-------|\n");
            for a in &self.answers {
                md.push_str(&format!(
                    "| {} | {} | {} | {} | {} | {} |\n",
                    a.question_id,
                    a.selected_option_id,
                    if a.is_correct { "yes" } else { "no" },
                    format_time(a.time_spent),
                    a.attempts,
                    a.hints_used
                ));
            }
        }

        md
    }
}
