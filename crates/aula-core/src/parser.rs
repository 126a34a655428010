//! TOML question bank parser.
//!
//! Loads questions and evaluations from TOML files and directories, and
//! validates them.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{
    ContentKind, Difficulty, Evaluation, Feedback, Question, QuestionOption, SubjectType,
};

/// A parsed bank file.
#[derive(Debug, Clone)]
pub struct QuestionBankFile {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Questions in file order.
    pub questions: Vec<Question>,
    pub evaluations: Vec<Evaluation>,
}

/// Intermediate TOML structure for parsing bank files.
#[derive(Debug, Deserialize)]
struct TomlBankFile {
    bank: TomlBankHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
    #[serde(default)]
    evaluations: Vec<TomlEvaluation>,
}

#[derive(Debug, Deserialize)]
struct TomlBankHeader {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    subject: String,
    title: String,
    content: String,
    #[serde(default)]
    content_kind: ContentKind,
    #[serde(default)]
    difficulty: Difficulty,
    #[serde(default)]
    points: u32,
    #[serde(default)]
    hints: Vec<String>,
    #[serde(default)]
    feedback: Option<TomlFeedback>,
    #[serde(default)]
    options: Vec<TomlOption>,
}

#[derive(Debug, Deserialize)]
struct TomlFeedback {
    #[serde(default)]
    correct: String,
    #[serde(default)]
    incorrect: String,
}

#[derive(Debug, Deserialize)]
struct TomlOption {
    id: String,
    text: String,
    #[serde(default)]
    correct: bool,
}

#[derive(Debug, Deserialize)]
struct TomlEvaluation {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    subject: String,
    /// Question ids in presentation order.
    questions: Vec<String>,
    #[serde(default = "default_time_limit")]
    time_limit: u32,
    #[serde(default = "default_passing_score")]
    passing_score: u32,
}

fn default_time_limit() -> u32 {
    20
}

fn default_passing_score() -> u32 {
    60
}

/// Parse a single TOML file into a `QuestionBankFile`.
pub fn parse_bank(path: &Path) -> Result<QuestionBankFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read bank file: {}", path.display()))?;

    parse_bank_str(&content, path)
}

/// Parse a TOML string into a `QuestionBankFile` (useful for testing).
pub fn parse_bank_str(content: &str, source_path: &Path) -> Result<QuestionBankFile> {
    let parsed: TomlBankFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let questions = parsed
        .questions
        .into_iter()
        .map(|q| {
            let subject: SubjectType = q
                .subject
                .parse()
                .map_err(|e: String| anyhow::anyhow!("question {}: {}", q.id, e))?;
            let feedback = q
                .feedback
                .map(|f| Feedback {
                    correct: f.correct,
                    incorrect: f.incorrect,
                })
                .unwrap_or_default();

            let question = Question {
                id: q.id,
                subject,
                title: q.title,
                content: q.content,
                content_kind: q.content_kind,
                options: q
                    .options
                    .into_iter()
                    .map(|o| QuestionOption {
                        id: o.id,
                        text: o.text,
                        is_correct: o.correct,
                    })
                    .collect(),
                difficulty: q.difficulty,
                feedback,
                hints: q.hints,
                points: q.points,
            };
            question.validate()?;
            Ok(question)
        })
        .collect::<Result<Vec<_>>>()?;

    // First definition wins for duplicate ids; `validate_bank` reports them.
    let mut by_id: HashMap<&str, &Question> = HashMap::new();
    for question in &questions {
        by_id.entry(question.id.as_str()).or_insert(question);
    }

    let evaluations = parsed
        .evaluations
        .into_iter()
        .map(|e| {
            let subject: SubjectType = e
                .subject
                .parse()
                .map_err(|err: String| anyhow::anyhow!("evaluation {}: {}", e.id, err))?;
            let questions = e
                .questions
                .iter()
                .map(|id| {
                    by_id.get(id.as_str()).map(|q| (*q).clone()).ok_or_else(|| {
                        anyhow::anyhow!("evaluation {} references unknown question {}", e.id, id)
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let evaluation = Evaluation {
                id: e.id,
                title: e.title,
                description: e.description,
                subject,
                questions,
                time_limit: e.time_limit,
                passing_score: e.passing_score,
            };
            evaluation.validate()?;
            Ok(evaluation)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(QuestionBankFile {
        id: parsed.bank.id,
        name: parsed.bank.name,
        description: parsed.bank.description,
        questions,
        evaluations,
    })
}

/// Recursively load all `.toml` bank files from a directory.
pub fn load_bank_directory(dir: &Path) -> Result<Vec<QuestionBankFile>> {
    let mut banks = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut paths = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    paths.sort();

    for path in paths {
        if path.is_dir() {
            banks.extend(load_bank_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_bank(&path) {
                Ok(bank) => banks.push(bank),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(banks)
}

/// Load a bank file, or every bank file under a directory.
pub fn load_banks(path: &Path) -> Result<Vec<QuestionBankFile>> {
    if path.is_dir() {
        load_bank_directory(path)
    } else {
        Ok(vec![parse_bank(path)?])
    }
}

/// A warning from bank validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question or evaluation id (if applicable).
    pub item_id: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Validate a bank for issues that do not prevent loading it.
pub fn validate_bank(bank: &QuestionBankFile) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    let mut seen_questions = HashSet::new();
    for question in &bank.questions {
        if !seen_questions.insert(&question.id) {
            warnings.push(ValidationWarning {
                item_id: Some(question.id.clone()),
                message: format!("duplicate question ID: {}", question.id),
            });
        }
    }

    let mut seen_evaluations = HashSet::new();
    for evaluation in &bank.evaluations {
        if !seen_evaluations.insert(&evaluation.id) {
            warnings.push(ValidationWarning {
                item_id: Some(evaluation.id.clone()),
                message: format!("duplicate evaluation ID: {}", evaluation.id),
            });
        }
    }

    for question in &bank.questions {
        if question.hints.is_empty() {
            warnings.push(ValidationWarning {
                item_id: Some(question.id.clone()),
                message: "question has no hints".into(),
            });
        }
        if question.feedback.correct.trim().is_empty()
            || question.feedback.incorrect.trim().is_empty()
        {
            warnings.push(ValidationWarning {
                item_id: Some(question.id.clone()),
                message: "feedback text is missing".into(),
            });
        }
        if question.points == 0 {
            warnings.push(ValidationWarning {
                item_id: Some(question.id.clone()),
                message: "question is worth zero points".into(),
            });
        }
    }

    for evaluation in &bank.evaluations {
        for question in &evaluation.questions {
            if question.subject != evaluation.subject {
                warnings.push(ValidationWarning {
                    item_id: Some(evaluation.id.clone()),
                    message: format!(
                        "question {} is {} but the evaluation is {}",
                        question.id, question.subject, evaluation.subject
                    ),
                });
            }
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const VALID_TOML: &str = r#"
[bank]
id = "sixth-grade"
name = "Sixth grade"
description = "Reinforcement questions"

[[questions]]
id = "fractions-sum"
subject = "matematica"
title = "Operaciones con fracciones"
content = "¿Cuál es el resultado de 1/4 + 2/4?"
difficulty = "medium"
points = 10
hints = ["Suma los numeradores."]
feedback = { correct = "¡Correcto!", incorrect = "Incorrecto." }

[[questions.options]]
id = "a"
text = "1/2"

[[questions.options]]
id = "b"
text = "3/4"
correct = true

[[questions]]
id = "square-area"
subject = "math"
title = "Geometría"
content = "Si un cuadrado tiene 5 cm de lado, ¿cuál es su área?"
difficulty = "easy"
points = 5
hints = ["A = l²"]
feedback = { correct = "¡Correcto!", incorrect = "Incorrecto." }

[[questions.options]]
id = "a"
text = "10 cm²"

[[questions.options]]
id = "c"
text = "25 cm²"
correct = true

[[evaluations]]
id = "fractions"
title = "Evaluación de fracciones"
subject = "math"
questions = ["square-area", "fractions-sum"]
time_limit = 20
passing_score = 70
"#;

    #[test]
    fn parse_valid_toml() {
        let bank = parse_bank_str(VALID_TOML, &PathBuf::from("test.toml")).unwrap();
        assert_eq!(bank.id, "sixth-grade");
        assert_eq!(bank.questions.len(), 2);
        assert_eq!(bank.questions[0].subject, SubjectType::Math);
        assert_eq!(bank.questions[0].correct_option().unwrap().id, "b");

        let eval = &bank.evaluations[0];
        assert_eq!(eval.time_limit_secs(), 1200);
        let order: Vec<_> = eval.questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(order, ["square-area", "fractions-sum"]);
        assert!(validate_bank(&bank).is_empty());
    }

    #[test]
    fn parse_applies_defaults() {
        let toml = r#"
[bank]
id = "minimal"
name = "Minimal"

[[questions]]
id = "q1"
subject = "communication"
title = "Q"
content = "Pick one"

[[questions.options]]
id = "a"
text = "yes"
correct = true

[[questions.options]]
id = "b"
text = "no"

[[evaluations]]
id = "e1"
title = "E"
subject = "communication"
questions = ["q1"]
"#;
        let bank = parse_bank_str(toml, &PathBuf::from("test.toml")).unwrap();
        let q = &bank.questions[0];
        assert_eq!(q.difficulty, Difficulty::Easy);
        assert_eq!(q.content_kind, ContentKind::Text);
        assert_eq!(bank.evaluations[0].time_limit, 20);
        assert_eq!(bank.evaluations[0].passing_score, 60);

        let warnings = validate_bank(&bank);
        assert!(warnings.iter().any(|w| w.message.contains("no hints")));
        assert!(warnings.iter().any(|w| w.message.contains("zero points")));
    }

    #[test]
    fn two_correct_options_is_an_error() {
        let toml = r#"
[bank]
id = "bad"
name = "Bad"

[[questions]]
id = "q1"
subject = "math"
title = "Q"
content = "?"

[[questions.options]]
id = "a"
text = "1"
correct = true

[[questions.options]]
id = "b"
text = "2"
correct = true
"#;
        let err = parse_bank_str(toml, &PathBuf::from("bad.toml")).unwrap_err();
        assert!(err.to_string().contains("2 correct options"), "{err}");
    }

    #[test]
    fn unknown_question_reference_is_an_error() {
        let toml = VALID_TOML.replace("\"fractions-sum\"]", "\"missing\"]");
        let err = parse_bank_str(&toml, &PathBuf::from("bad.toml")).unwrap_err();
        assert!(err.to_string().contains("unknown question missing"), "{err}");
    }

    #[test]
    fn unknown_subject_is_an_error() {
        let toml = VALID_TOML.replace("subject = \"matematica\"", "subject = \"history\"");
        assert!(parse_bank_str(&toml, &PathBuf::from("bad.toml")).is_err());
    }

    #[test]
    fn validate_duplicates_and_subject_mismatch() {
        let mut bank = parse_bank_str(VALID_TOML, &PathBuf::from("test.toml")).unwrap();
        bank.questions.push(bank.questions[0].clone());
        bank.evaluations[0].subject = SubjectType::Communication;

        let warnings = validate_bank(&bank);
        assert!(warnings.iter().any(|w| w.message.contains("duplicate question")));
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("but the evaluation is communication")));
    }

    #[test]
    fn parse_malformed_toml() {
        let bad = "this is not [valid toml }{";
        assert!(parse_bank_str(bad, &PathBuf::from("bad.toml")).is_err());
    }

    #[test]
    fn load_directory_skips_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("good.toml"), VALID_TOML).unwrap();
        std::fs::write(dir.path().join("broken.toml"), "not toml ][").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let banks = load_bank_directory(dir.path()).unwrap();
        assert_eq!(banks.len(), 1);
        assert_eq!(banks[0].id, "sixth-grade");

        let single = load_banks(&dir.path().join("good.toml")).unwrap();
        assert_eq!(single.len(), 1);
    }
}
