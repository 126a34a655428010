//! In-memory question bank.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;

use aula_core::model::{Evaluation, Question, SubjectType};
use aula_core::parser::{load_banks, parse_bank_str, QuestionBankFile};
use aula_core::traits::QuestionBank;

const BUILTIN_BANK: &str = include_str!("../data/builtin.toml");

/// A question bank held entirely in memory.
#[derive(Debug, Clone)]
pub struct InMemoryBank {
    name: String,
    questions: Vec<Question>,
    evaluations: Vec<Evaluation>,
}

impl InMemoryBank {
    pub fn new(
        name: impl Into<String>,
        questions: Vec<Question>,
        evaluations: Vec<Evaluation>,
    ) -> Self {
        Self {
            name: name.into(),
            questions,
            evaluations,
        }
    }

    /// The sixth-grade math and communication bank shipped with aula.
    pub fn builtin() -> Result<Self> {
        let file = parse_bank_str(BUILTIN_BANK, Path::new("builtin.toml"))
            .context("builtin bank is invalid")?;
        Ok(Self::from_files("builtin", vec![file]))
    }

    /// Merge parsed bank files. Later files do not replace earlier ids.
    pub fn from_files(name: impl Into<String>, files: Vec<QuestionBankFile>) -> Self {
        let mut questions: Vec<Question> = Vec::new();
        let mut evaluations: Vec<Evaluation> = Vec::new();
        for file in files {
            for question in file.questions {
                if !questions.iter().any(|q| q.id == question.id) {
                    questions.push(question);
                }
            }
            for evaluation in file.evaluations {
                if !evaluations.iter().any(|e| e.id == evaluation.id) {
                    evaluations.push(evaluation);
                }
            }
        }
        Self::new(name, questions, evaluations)
    }

    /// Load a bank file or a directory of bank files.
    pub fn load(path: &Path) -> Result<Self> {
        let files = load_banks(path)?;
        if files.is_empty() {
            anyhow::bail!("no bank files found in {}", path.display());
        }
        Ok(Self::from_files(path.display().to_string(), files))
    }
}

#[async_trait]
impl QuestionBank for InMemoryBank {
    fn name(&self) -> &str {
        &self.name
    }

    async fn evaluation(&self, id: &str) -> Result<Evaluation> {
        self.evaluations
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("evaluation not found: {id}"))
    }

    async fn evaluations(&self) -> Result<Vec<Evaluation>> {
        Ok(self.evaluations.clone())
    }

    async fn questions(&self, subject: SubjectType) -> Result<Vec<Question>> {
        Ok(self
            .questions
            .iter()
            .filter(|q| q.subject == subject)
            .cloned()
            .collect())
    }
}
