//! The `aula init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("aula.toml").exists() {
        println!("aula.toml already exists, skipping.");
    } else {
        std::fs::write("aula.toml", SAMPLE_CONFIG)?;
        println!("Created aula.toml");
    }

    std::fs::create_dir_all("banks")?;
    let sample_path = std::path::Path::new("banks/sample.toml");
    if sample_path.exists() {
        println!("banks/sample.toml already exists, skipping.");
    } else {
        std::fs::write(sample_path, SAMPLE_BANK)?;
        println!("Created banks/sample.toml");
    }

    println!("\nNext steps:");
    println!("  1. Run: aula validate --bank banks/sample.toml");
    println!("  2. Run: aula list --bank banks");
    println!("  3. Run: aula take --bank banks --evaluation sample-review");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# aula configuration

countdown_ticks = 3
max_submit_retries = 3
retry_delay_ms = 1000
bank_path = "banks"
results_dir = "./aula-results"

# Acknowledge results locally after a short delay.
submission_latency_ms = 1500

[reporter]
type = "simulated"

# Store each result as JSON under results_dir:
# [reporter]
# type = "json"

# Or send results to a collection endpoint:
# [reporter]
# type = "http"
# url = "https://example.com/api/results"
# token = "${AULA_REPORT_TOKEN}"
"#;

const SAMPLE_BANK: &str = r#"[bank]
id = "sample"
name = "Sample bank"
description = "A small bank to get started"

[[questions]]
id = "sample-multiplication"
subject = "math"
title = "Multiplicación"
content = "¿Cuánto es 7 × 8?"
difficulty = "easy"
points = 5
hints = ["Piensa en 7 × 4 y duplícalo."]
feedback = { correct = "¡Correcto! 7 × 8 = 56.", incorrect = "Incorrecto. 7 × 8 = 56." }

[[questions.options]]
id = "a"
text = "54"

[[questions.options]]
id = "b"
text = "56"
correct = true

[[questions.options]]
id = "c"
text = "58"

[[questions]]
id = "sample-perimeter"
subject = "math"
title = "Perímetro"
content = "¿Cuál es el perímetro de un rectángulo de 3 cm por 5 cm?"
difficulty = "medium"
points = 10
hints = ["Suma los cuatro lados.", "P = 2 × (largo + ancho)"]
feedback = { correct = "¡Correcto! 2 × (3 + 5) = 16 cm.", incorrect = "Incorrecto. El perímetro es la suma de todos los lados." }

[[questions.options]]
id = "a"
text = "15 cm"

[[questions.options]]
id = "b"
text = "8 cm"

[[questions.options]]
id = "c"
text = "16 cm"
correct = true

[[evaluations]]
id = "sample-review"
title = "Repaso de matemáticas"
subject = "math"
questions = ["sample-multiplication", "sample-perimeter"]
time_limit = 10
passing_score = 50
"#;
