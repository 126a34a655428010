//! Immediate-feedback practice rounds.
//!
//! Unlike an evaluation, a practice round has no deadline: every answer is
//! checked straight away, a wrong answer may be retried once, and correct
//! answers earn points scaled by difficulty.

use crate::error::PracticeError;
use crate::model::Question;
use crate::scoring::practice_reward;

/// Attempts allowed per question (the first try plus one retry).
pub const MAX_ATTEMPTS: u32 = 2;

/// Outcome of answering the current question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerFeedback {
    pub is_correct: bool,
    /// The question's correct or incorrect feedback text.
    pub message: String,
    /// Points earned by this answer.
    pub points: u32,
    pub correct_option_id: String,
    pub can_retry: bool,
}

/// Result of moving through the round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PracticeStep {
    Moved(usize),
    /// `next()` was called on the last question.
    Finished,
    /// Already at the first question.
    Stayed,
}

/// Totals for a practice round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PracticeSummary {
    pub questions: usize,
    pub answered: usize,
    pub correct: usize,
    pub total_points: u32,
    pub hints_used: u32,
}

#[derive(Debug, Clone, Default)]
struct QuestionState {
    selected: Option<String>,
    answered: bool,
    is_correct: bool,
    attempts: u32,
    hint_visible: bool,
    hint_index: usize,
    hints_shown: usize,
}

/// A practice round over a list of questions.
#[derive(Debug, Clone)]
pub struct PracticeSession {
    questions: Vec<Question>,
    current_index: usize,
    state: QuestionState,
    /// Last outcome per question index.
    outcomes: Vec<Option<bool>>,
    /// Points of the latest answer per question index. A revisit replaces
    /// the earlier earnings.
    earned: Vec<u32>,
    hints_used: u32,
    finished: bool,
}

impl PracticeSession {
    pub fn new(questions: Vec<Question>) -> Result<Self, PracticeError> {
        if questions.is_empty() {
            return Err(PracticeError::NoQuestions);
        }
        for question in &questions {
            question.validate()?;
        }

        Ok(Self {
            outcomes: vec![None; questions.len()],
            earned: vec![0; questions.len()],
            questions,
            current_index: 0,
            state: QuestionState::default(),
            hints_used: 0,
            finished: false,
        })
    }

    pub fn current_question(&self) -> &Question {
        &self.questions[self.current_index]
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn selected(&self) -> Option<&str> {
        self.state.selected.as_deref()
    }

    pub fn is_answered(&self) -> bool {
        self.state.answered
    }

    pub fn hint_visible(&self) -> bool {
        self.state.hint_visible
    }

    pub fn attempts(&self) -> u32 {
        self.state.attempts
    }

    pub fn total_points(&self) -> u32 {
        self.earned.iter().sum()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// One-based position and total, as shown next to the question.
    pub fn progress(&self) -> (usize, usize) {
        (self.current_index + 1, self.questions.len())
    }

    /// Choose an option for the current question.
    pub fn select(&mut self, option_id: &str) -> Result<(), PracticeError> {
        self.require_active()?;
        if self.state.answered {
            return Err(PracticeError::AlreadyAnswered);
        }
        let question = self.current_question();
        if question.option(option_id).is_none() {
            return Err(PracticeError::UnknownOption {
                question_id: question.id.clone(),
                option_id: option_id.to_string(),
            });
        }
        self.state.selected = Some(option_id.to_string());
        Ok(())
    }

    /// Check the selected option.
    pub fn answer(&mut self) -> Result<AnswerFeedback, PracticeError> {
        self.require_active()?;
        if self.state.answered {
            return Err(PracticeError::AlreadyAnswered);
        }
        let selected = self
            .state
            .selected
            .clone()
            .ok_or(PracticeError::NothingSelected)?;

        let question = &self.questions[self.current_index];
        let is_correct = question
            .option(&selected)
            .map(|o| o.is_correct)
            .unwrap_or(false);
        let prior_attempts = self.state.attempts;
        let points = if is_correct {
            practice_reward(question.difficulty, prior_attempts)
        } else {
            0
        };
        let message = if is_correct {
            question.feedback.correct.clone()
        } else {
            question.feedback.incorrect.clone()
        };
        let correct_option_id = question
            .correct_option()
            .map(|o| o.id.clone())
            .unwrap_or_default();

        self.state.answered = true;
        self.state.is_correct = is_correct;
        self.state.attempts += 1;
        self.outcomes[self.current_index] = Some(is_correct);
        self.earned[self.current_index] = points;

        tracing::debug!(
            question = %question.id,
            is_correct,
            attempt = self.state.attempts,
            points,
            "practice answer checked"
        );

        Ok(AnswerFeedback {
            is_correct,
            message,
            points,
            correct_option_id,
            can_retry: !is_correct && self.state.attempts < MAX_ATTEMPTS,
        })
    }

    /// Clear a wrong answer for another try.
    pub fn retry(&mut self) -> Result<(), PracticeError> {
        self.require_active()?;
        if !self.state.answered {
            return Err(PracticeError::NotAnswered);
        }
        if self.state.is_correct || self.state.attempts >= MAX_ATTEMPTS {
            return Err(PracticeError::NoRetriesLeft);
        }
        self.state.answered = false;
        self.state.selected = None;
        self.state.hint_visible = false;
        Ok(())
    }

    /// Show the next hint of the current question. Once the last hint is
    /// reached it keeps being returned.
    pub fn show_hint(&mut self) -> Result<Option<&str>, PracticeError> {
        self.require_active()?;
        if self.state.answered {
            return Err(PracticeError::AlreadyAnswered);
        }
        let hints = &self.questions[self.current_index].hints;
        if hints.is_empty() {
            return Ok(None);
        }

        let index = self.state.hint_index;
        if index >= self.state.hints_shown {
            self.state.hints_shown = index + 1;
            self.hints_used += 1;
        }
        self.state.hint_visible = true;
        if index + 1 < hints.len() {
            self.state.hint_index += 1;
        }
        Ok(Some(hints[index].as_str()))
    }

    pub fn next(&mut self) -> PracticeStep {
        if self.finished {
            return PracticeStep::Finished;
        }
        if self.current_index + 1 < self.questions.len() {
            self.current_index += 1;
            self.state = QuestionState::default();
            PracticeStep::Moved(self.current_index)
        } else {
            self.finished = true;
            tracing::debug!(points = self.total_points(), "practice round finished");
            PracticeStep::Finished
        }
    }

    pub fn previous(&mut self) -> PracticeStep {
        if self.finished || self.current_index == 0 {
            return PracticeStep::Stayed;
        }
        self.current_index -= 1;
        self.state = QuestionState::default();
        PracticeStep::Moved(self.current_index)
    }

    pub fn summary(&self) -> PracticeSummary {
        PracticeSummary {
            questions: self.questions.len(),
            answered: self.outcomes.iter().filter(|o| o.is_some()).count(),
            correct: self.outcomes.iter().filter(|o| **o == Some(true)).count(),
            total_points: self.total_points(),
            hints_used: self.hints_used,
        }
    }

    fn require_active(&self) -> Result<(), PracticeError> {
        if self.finished {
            Err(PracticeError::Finished)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::question;
    use crate::model::Difficulty;

    fn round() -> PracticeSession {
        PracticeSession::new(vec![question("q1", "b"), question("q2", "c")]).unwrap()
    }

    #[test]
    fn empty_round_is_rejected() {
        assert_eq!(
            PracticeSession::new(vec![]).unwrap_err(),
            PracticeError::NoQuestions
        );
    }

    #[test]
    fn medium_first_attempt_earns_ten() {
        let mut p = round();
        p.select("b").unwrap();
        let feedback = p.answer().unwrap();
        assert!(feedback.is_correct);
        assert_eq!(feedback.points, 10);
        assert_eq!(feedback.message, "Well done");
        assert!(!feedback.can_retry);
    }

    #[test]
    fn medium_second_attempt_earns_five() {
        let mut p = round();
        p.select("a").unwrap();
        let feedback = p.answer().unwrap();
        assert!(!feedback.is_correct);
        assert_eq!(feedback.points, 0);
        assert_eq!(feedback.correct_option_id, "b");
        assert!(feedback.can_retry);

        p.retry().unwrap();
        assert!(p.selected().is_none());
        p.select("b").unwrap();
        let feedback = p.answer().unwrap();
        assert_eq!(feedback.points, 5);
        assert_eq!(p.total_points(), 5);
    }

    #[test]
    fn only_one_retry_is_allowed() {
        let mut p = round();
        p.select("a").unwrap();
        p.answer().unwrap();
        p.retry().unwrap();
        p.select("c").unwrap();
        let feedback = p.answer().unwrap();
        assert!(!feedback.can_retry);
        assert_eq!(p.retry(), Err(PracticeError::NoRetriesLeft));
    }

    #[test]
    fn correct_answer_cannot_be_retried_or_changed() {
        let mut p = round();
        p.select("b").unwrap();
        p.answer().unwrap();
        assert_eq!(p.retry(), Err(PracticeError::NoRetriesLeft));
        assert_eq!(p.select("a"), Err(PracticeError::AlreadyAnswered));
    }

    #[test]
    fn answer_requires_selection() {
        let mut p = round();
        assert_eq!(p.answer(), Err(PracticeError::NothingSelected));
        assert!(matches!(
            p.select("z"),
            Err(PracticeError::UnknownOption { .. })
        ));
    }

    #[test]
    fn hard_question_reward_scales() {
        let mut q = question("hard", "a");
        q.difficulty = Difficulty::Hard;
        let mut p = PracticeSession::new(vec![q]).unwrap();
        p.select("d").unwrap();
        p.answer().unwrap();
        p.retry().unwrap();
        p.select("a").unwrap();
        assert_eq!(p.answer().unwrap().points, 8);
    }

    #[test]
    fn hints_advance_and_stop_at_last() {
        let mut p = round();
        assert_eq!(p.show_hint().unwrap(), Some("first hint"));
        assert_eq!(p.show_hint().unwrap(), Some("second hint"));
        assert_eq!(p.show_hint().unwrap(), Some("second hint"));
        assert_eq!(p.summary().hints_used, 2);
    }

    #[test]
    fn navigation_resets_question_state() {
        let mut p = round();
        p.select("a").unwrap();
        p.answer().unwrap();
        assert_eq!(p.next(), PracticeStep::Moved(1));
        assert!(!p.is_answered());
        assert_eq!(p.attempts(), 0);
        assert_eq!(p.progress(), (2, 2));

        assert_eq!(p.previous(), PracticeStep::Moved(0));
        assert_eq!(p.previous(), PracticeStep::Stayed);
        // Coming back starts the question afresh, including the reward.
        p.select("b").unwrap();
        assert_eq!(p.answer().unwrap().points, 10);
        assert_eq!(p.total_points(), 10);
    }

    #[test]
    fn revisiting_a_question_does_not_add_points() {
        let mut p = round();
        for _ in 0..3 {
            p.select("b").unwrap();
            p.answer().unwrap();
            p.next();
            p.previous();
        }
        let summary = p.summary();
        assert_eq!(summary.answered, 1);
        assert_eq!(summary.correct, 1);
        assert_eq!(summary.total_points, 10);

        // A later wrong answer on the same question replaces the reward.
        p.select("a").unwrap();
        p.answer().unwrap();
        assert_eq!(p.total_points(), 0);
    }

    #[test]
    fn next_on_last_question_finishes() {
        let mut p = round();
        p.select("b").unwrap();
        p.answer().unwrap();
        p.next();
        p.select("c").unwrap();
        p.answer().unwrap();
        assert_eq!(p.next(), PracticeStep::Finished);
        assert!(p.is_finished());
        assert_eq!(p.select("a"), Err(PracticeError::Finished));

        let summary = p.summary();
        assert_eq!(summary.answered, 2);
        assert_eq!(summary.correct, 2);
        assert_eq!(summary.total_points, 20);
    }
}
