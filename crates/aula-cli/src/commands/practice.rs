//! The `aula practice` command.

use std::path::PathBuf;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use aula_core::model::SubjectType;
use aula_core::practice::{PracticeSession, PracticeStep};
use aula_core::traits::QuestionBank;
use aula_providers::config::{create_bank, load_config_from};

use super::print_question;

pub async fn execute(
    subject: SubjectType,
    bank_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let bank = create_bank(&config, bank_path.as_deref())?;
    let questions = bank.questions(subject).await?;
    if questions.is_empty() {
        anyhow::bail!("bank {} has no {subject} questions", bank.name());
    }

    let mut practice = PracticeSession::new(questions)?;
    println!("Practice: {subject} ({} questions)", practice.question_count());
    println!("Commands: <option> answer | h hint | r retry | n next | p previous | q quit");
    show_current(&practice);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        match input {
            "" => {}
            "q" => break,
            "h" => match practice.show_hint() {
                Ok(Some(hint)) => println!("  Hint: {hint}"),
                Ok(None) => println!("  This question has no hints."),
                Err(e) => println!("  ! {e}"),
            },
            "r" => match practice.retry() {
                Ok(()) => println!("  Try again."),
                Err(e) => println!("  ! {e}"),
            },
            "n" => match practice.next() {
                PracticeStep::Moved(_) => show_current(&practice),
                PracticeStep::Finished => break,
                PracticeStep::Stayed => {}
            },
            "p" => match practice.previous() {
                PracticeStep::Moved(_) => show_current(&practice),
                PracticeStep::Finished | PracticeStep::Stayed => {
                    println!("  Already at the first question.")
                }
            },
            option_id => {
                let feedback = practice.select(option_id).and_then(|()| practice.answer());
                match feedback {
                    Ok(feedback) if feedback.is_correct => {
                        println!("  {} (+{} points)", feedback.message, feedback.points);
                    }
                    Ok(feedback) => {
                        println!("  {}", feedback.message);
                        if feedback.can_retry {
                            println!("  Type r to try once more.");
                        } else {
                            println!("  The correct answer was {}.", feedback.correct_option_id);
                        }
                    }
                    Err(e) => println!("  ! {e}"),
                }
            }
        }
    }

    let summary = practice.summary();
    println!(
        "\nAnswered {} of {} questions, {} correct.",
        summary.answered, summary.questions, summary.correct
    );
    println!(
        "Points: {} (hints used: {})",
        summary.total_points, summary.hints_used
    );
    Ok(())
}

fn show_current(practice: &PracticeSession) {
    let (position, total) = practice.progress();
    print_question(practice.current_question(), position, total);
    println!("  Points so far: {}", practice.total_points());
}
