//! The `aula take` command.
//!
//! Drives a timed evaluation from line commands on stdin:
//! `<option-id>` select, `n`/`p` next/previous, `g <n>` go to question,
//! `h` hint, `s` submit, `r` retry a failed submission, `q` quit.
//! Closing stdin abandons an unsubmitted session.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};
use tokio::io::{AsyncBufReadExt, BufReader};

use aula_core::driver::{SessionCommand, SessionDriver, SessionEvent, SessionOutcome};
use aula_core::model::Evaluation;
use aula_core::report::EvaluationResult;
use aula_core::scoring::format_time;
use aula_core::session::{EvaluationSession, SessionConfig};
use aula_core::traits::QuestionBank;
use aula_providers::config::{create_bank, create_reporter, load_config_from, ReporterConfig};

use super::print_question;

/// A parsed stdin line.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Command(SessionCommand),
    Help,
    Empty,
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    let mut parts = line.split_whitespace();
    let Some(word) = parts.next() else {
        return Input::Empty;
    };

    let command = match word {
        "n" => SessionCommand::Advance,
        "p" => SessionCommand::Retreat,
        "h" => SessionCommand::Hint,
        "s" => SessionCommand::Submit,
        "r" => SessionCommand::RetrySubmission,
        "q" => SessionCommand::Abandon,
        "?" => return Input::Help,
        "g" => match parts.next().and_then(|n| n.parse::<usize>().ok()) {
            // Positions are one-based on screen.
            Some(position) => SessionCommand::GoTo(position.saturating_sub(1)),
            None => return Input::Help,
        },
        option_id => SessionCommand::SelectCurrent {
            option_id: option_id.to_string(),
        },
    };
    Input::Command(command)
}

fn print_help() {
    println!(
        "Commands: <option> select | n next | p previous | g <n> go to | \
         h hint | s submit | r retry | q quit"
    );
}

/// Per-run flags of `aula take`.
pub struct TakeOptions {
    pub user: Option<String>,
    pub no_countdown: bool,
    pub latency_ms: Option<u64>,
    pub markdown: bool,
}

pub async fn execute(
    evaluation_id: String,
    bank_path: Option<PathBuf>,
    options: TakeOptions,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let TakeOptions {
        user,
        no_countdown,
        latency_ms,
        markdown,
    } = options;
    let mut config = load_config_from(config_path.as_deref())?;
    if let Some(ms) = latency_ms {
        config.submission_latency_ms = ms;
    }

    let bank = create_bank(&config, bank_path.as_deref())?;
    let evaluation = Arc::new(
        bank.evaluation(&evaluation_id)
            .await
            .with_context(|| format!("bank {} has no evaluation {evaluation_id}", bank.name()))?,
    );

    let session_config = if no_countdown {
        SessionConfig::without_countdown()
    } else {
        config.session_config()
    };
    let countdown_ticks = session_config.countdown_ticks;
    let mut session = EvaluationSession::new(Arc::clone(&evaluation), session_config)?;
    if let Some(user) = user {
        session = session.with_user(user);
    }

    let reporter = create_reporter(&config)?;
    let driver = SessionDriver::new(reporter, config.driver_config());

    println!(
        "{} ({} questions, {}, passing score {}%)",
        evaluation.title,
        evaluation.questions.len(),
        format_time(evaluation.time_limit_secs()),
        evaluation.passing_score
    );
    print_help();
    if countdown_ticks == 0 {
        print_question(&evaluation.questions[0], 1, evaluation.questions.len());
    }

    let handle = driver.spawn(session);
    let (commands, mut events, task) = handle.into_parts();
    let mut commands = Some(commands);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => render_event(&event, &evaluation),
                None => break,
            },
            line = lines.next_line(), if commands.is_some() => match line {
                Ok(Some(line)) => match parse_input(&line) {
                    Input::Command(command) => {
                        if let Some(tx) = &commands {
                            let _ = tx.send(command);
                        }
                    }
                    Input::Help => print_help(),
                    Input::Empty => {}
                },
                Ok(None) => {
                    tracing::debug!("stdin closed");
                    commands = None;
                }
                Err(e) => {
                    tracing::warn!("failed to read stdin: {e}");
                    commands = None;
                }
            },
        }
    }

    match task.await.context("session task failed")? {
        SessionOutcome::Completed(result) => {
            if markdown {
                println!("\n{}", result.to_markdown());
            } else {
                print_summary(&result);
            }
            if let ReporterConfig::Json { .. } = config.reporter {
                println!("Result stored in {}", config.results_dir.display());
            }
        }
        SessionOutcome::Abandoned { discarded } => {
            println!("\nEvaluation abandoned, {discarded} answer(s) discarded.");
        }
    }

    Ok(())
}

fn render_event(event: &SessionEvent, evaluation: &Evaluation) {
    let total = evaluation.questions.len();
    match event {
        SessionEvent::CountdownTick(n) => println!("Starting in {n}..."),
        SessionEvent::Started { remaining_secs } => {
            println!("Go! {} on the clock.", format_time(*remaining_secs));
            print_question(&evaluation.questions[0], 1, total);
        }
        SessionEvent::Tick { remaining_secs } => {
            if *remaining_secs > 0 && (*remaining_secs % 60 == 0 || *remaining_secs <= 10) {
                println!("  [{} left]", format_time(*remaining_secs));
            }
        }
        SessionEvent::AnswerRecorded { answer, progress } => {
            println!(
                "  Selected {} for {} ({progress}% answered)",
                answer.selected_option_id, answer.question_id
            );
        }
        SessionEvent::Navigated { index, .. } => {
            print_question(&evaluation.questions[*index], index + 1, total);
        }
        SessionEvent::HintRevealed { hint, .. } => match hint {
            Some(hint) => println!("  Hint: {hint}"),
            None => println!("  No more hints for this question."),
        },
        SessionEvent::Submitting { reason } => {
            println!("\nSubmitting ({reason})...");
        }
        SessionEvent::SubmissionFailed {
            error,
            attempts,
            will_retry,
        } => {
            if *will_retry {
                println!("  Submission failed ({error}), retrying...");
            } else {
                println!("  Submission failed after {attempts} attempt(s): {error}");
                println!("  Type r to try again or q to give up.");
            }
        }
        SessionEvent::Completed(_) => println!("Submitted."),
        SessionEvent::Abandoned { .. } => {}
        SessionEvent::Rejected(e) => println!("  ! {e}"),
    }
}

fn print_summary(result: &EvaluationResult) {
    let mut table = Table::new();
    table.set_header(vec![
        "Question", "Option", "Correct", "Time", "Attempts", "Hints",
    ]);
    for answer in &result.answers {
        table.add_row(vec![
            Cell::new(&answer.question_id),
            Cell::new(&answer.selected_option_id),
            Cell::new(if answer.is_correct { "yes" } else { "no" }),
            Cell::new(format_time(answer.time_spent)),
            Cell::new(answer.attempts),
            Cell::new(answer.hints_used),
        ]);
    }

    println!("\n{table}");
    println!(
        "Score: {}% ({} of {} correct), {}",
        result.score,
        result.correct_count,
        result.question_count,
        if result.passed { "passed" } else { "not passed" }
    );
    println!("Time: {}", format_time(result.total_time));
}
