//! The `aula list` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use aula_core::scoring::format_time;
use aula_core::traits::QuestionBank;
use aula_providers::config::{create_bank, load_config_from};

pub async fn execute(bank_path: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let bank = create_bank(&config, bank_path.as_deref())?;
    let evaluations = bank.evaluations().await?;

    if evaluations.is_empty() {
        println!("No evaluations in bank {}.", bank.name());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "ID",
        "Title",
        "Subject",
        "Questions",
        "Time limit",
        "Passing",
    ]);
    for evaluation in &evaluations {
        table.add_row(vec![
            Cell::new(&evaluation.id),
            Cell::new(&evaluation.title),
            Cell::new(evaluation.subject),
            Cell::new(evaluation.questions.len()),
            Cell::new(format_time(evaluation.time_limit_secs())),
            Cell::new(format!("{}%", evaluation.passing_score)),
        ]);
    }

    println!("Bank: {}", bank.name());
    println!("{table}");
    Ok(())
}
