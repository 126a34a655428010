//! Core data model types for aula.
//!
//! Questions, options, evaluations and answers. Questions and evaluations
//! are read-only once validated; answers are produced by sessions.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// Content domain of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectType {
    #[serde(alias = "matematica")]
    Math,
    #[serde(alias = "comunicacion")]
    Communication,
}

impl fmt::Display for SubjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectType::Math => write!(f, "math"),
            SubjectType::Communication => write!(f, "communication"),
        }
    }
}

impl FromStr for SubjectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "math" | "matematica" | "matemática" => Ok(SubjectType::Math),
            "communication" | "comunicacion" | "comunicación" => Ok(SubjectType::Communication),
            other => Err(format!("unknown subject: {other}")),
        }
    }
}

/// How the question body should be rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    #[default]
    Text,
    Image,
    Video,
    Audio,
    Equation,
}

/// Difficulty tier; drives the practice reward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Points awarded for a first-attempt correct answer.
    pub fn base_points(self) -> u32 {
        match self {
            Difficulty::Easy => 5,
            Difficulty::Medium => 10,
            Difficulty::Hard => 15,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

/// One selectable answer of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOption {
    pub id: String,
    pub text: String,
    pub is_correct: bool,
}

/// Messages shown after answering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub correct: String,
    pub incorrect: String,
}

/// A multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Unique identifier within a bank.
    pub id: String,
    /// Subject the question belongs to.
    #[serde(rename = "type")]
    pub subject: SubjectType,
    pub title: String,
    /// The question body.
    pub content: String,
    #[serde(default)]
    pub content_kind: ContentKind,
    /// Options in display order.
    pub options: Vec<QuestionOption>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub feedback: Feedback,
    /// Hints in the order they are revealed.
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default)]
    pub points: u32,
}

impl Question {
    /// Check the option invariants: at least two options, unique ids,
    /// exactly one correct.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.options.len() < 2 {
            return Err(ModelError::TooFewOptions(self.id.clone()));
        }

        let mut seen = HashSet::new();
        for option in &self.options {
            if !seen.insert(option.id.as_str()) {
                return Err(ModelError::DuplicateOption {
                    question_id: self.id.clone(),
                    option_id: option.id.clone(),
                });
            }
        }

        match self.options.iter().filter(|o| o.is_correct).count() {
            1 => Ok(()),
            0 => Err(ModelError::NoCorrectOption(self.id.clone())),
            count => Err(ModelError::MultipleCorrectOptions {
                question_id: self.id.clone(),
                count,
            }),
        }
    }

    pub fn option(&self, option_id: &str) -> Option<&QuestionOption> {
        self.options.iter().find(|o| o.id == option_id)
    }

    /// The single correct option of a validated question.
    pub fn correct_option(&self) -> Option<&QuestionOption> {
        self.options.iter().find(|o| o.is_correct)
    }
}

/// Longest accepted time limit, in minutes.
pub const MAX_TIME_LIMIT_MINUTES: u32 = 24 * 60;

/// A fixed, timed set of questions presented as one assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub subject: SubjectType,
    /// Questions in presentation order.
    pub questions: Vec<Question>,
    /// Time limit in minutes.
    pub time_limit: u32,
    /// Minimum score (percentage) needed to pass.
    pub passing_score: u32,
}

impl Evaluation {
    pub fn validate(&self) -> Result<(), ModelError> {
        if !is_safe_id(&self.id) {
            return Err(ModelError::InvalidId(self.id.clone()));
        }
        if self.questions.is_empty() {
            return Err(ModelError::EmptyEvaluation(self.id.clone()));
        }
        if self.time_limit == 0 {
            return Err(ModelError::ZeroTimeLimit(self.id.clone()));
        }
        if self.time_limit > MAX_TIME_LIMIT_MINUTES {
            return Err(ModelError::TimeLimitTooLong {
                evaluation_id: self.id.clone(),
                minutes: self.time_limit,
            });
        }
        if self.passing_score > 100 {
            return Err(ModelError::PassingScoreOutOfRange {
                evaluation_id: self.id.clone(),
                score: self.passing_score,
            });
        }

        let mut seen = HashSet::new();
        for question in &self.questions {
            question.validate()?;
            if !seen.insert(question.id.as_str()) {
                return Err(ModelError::DuplicateQuestion {
                    evaluation_id: self.id.clone(),
                    question_id: question.id.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn time_limit_secs(&self) -> u32 {
        self.time_limit.saturating_mul(60)
    }

    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }
}

/// Evaluation ids end up in result file names.
fn is_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// A recorded selection for one question within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_id: String,
    pub selected_option_id: String,
    /// Fixed when the option is selected.
    pub is_correct: bool,
    /// Seconds spent on the question while it was displayed.
    pub time_spent: u32,
    /// Number of selections made for this question.
    pub attempts: u32,
    pub hints_used: u32,
}
