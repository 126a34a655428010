//! CLI integration tests using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn aula() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("aula").unwrap()
}

/// A command isolated from any user or working-directory config.
fn aula_in(dir: &TempDir) -> Command {
    let mut cmd = aula();
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .env_remove("AULA_REPORT_URL")
        .env_remove("AULA_REPORT_TOKEN");
    cmd
}

fn bank_path(name: &str) -> String {
    format!("{}/../../banks/{name}", env!("CARGO_MANIFEST_DIR"))
}

#[test]
fn help_output() {
    aula()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Timed evaluations and practice rounds"));
}

#[test]
fn version_output() {
    aula()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("aula"));
}

#[test]
fn validate_valid_bank() {
    aula()
        .arg("validate")
        .arg("--bank")
        .arg(bank_path("sixth-grade-review.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("4 questions, 1 evaluations"))
        .stdout(predicate::str::contains("All banks valid"));
}

#[test]
fn validate_directory() {
    aula()
        .arg("validate")
        .arg("--bank")
        .arg(bank_path(""))
        .assert()
        .success()
        .stdout(predicate::str::contains("Sixth grade review"));
}

#[test]
fn validate_reports_warnings() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bare.toml");
    std::fs::write(
        &path,
        r#"
[bank]
id = "bare"
name = "Bare"

[[questions]]
id = "q1"
subject = "math"
title = "Q"
content = "1 + 1?"
points = 5
feedback = { correct = "Yes", incorrect = "No" }

[[questions.options]]
id = "a"
text = "2"
correct = true

[[questions.options]]
id = "b"
text = "3"
"#,
    )
    .unwrap();

    aula()
        .arg("validate")
        .arg("--bank")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("[q1] WARNING: question has no hints"))
        .stdout(predicate::str::contains("1 warning(s) found"));
}

#[test]
fn validate_rejects_oversized_time_limit() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("long.toml");
    std::fs::write(
        &path,
        r#"
[bank]
id = "long"
name = "Long"

[[questions]]
id = "q1"
subject = "math"
title = "Q"
content = "1 + 1?"
hints = ["Count"]
feedback = { correct = "Yes", incorrect = "No" }

[[questions.options]]
id = "a"
text = "2"
correct = true

[[questions.options]]
id = "b"
text = "3"

[[evaluations]]
id = "forever"
title = "Forever"
subject = "math"
questions = ["q1"]
time_limit = 100000000
passing_score = 50
"#,
    )
    .unwrap();

    aula()
        .arg("validate")
        .arg("--bank")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("exceeds one day"));
}

#[test]
fn validate_nonexistent_file() {
    aula()
        .arg("validate")
        .arg("--bank")
        .arg("nonexistent.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn list_builtin_evaluations() {
    let dir = TempDir::new().unwrap();
    aula_in(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("math-fractions"))
        .stdout(predicate::str::contains("communication-comprehension"))
        .stdout(predicate::str::contains("20:00"));
}

#[test]
fn list_bank_file() {
    let dir = TempDir::new().unwrap();
    aula_in(&dir)
        .arg("list")
        .arg("--bank")
        .arg(bank_path("sixth-grade-review.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("math-review"))
        .stdout(predicate::str::contains("15:00"));
}

#[test]
fn take_and_submit_all_correct() {
    let dir = TempDir::new().unwrap();
    aula_in(&dir)
        .args([
            "take",
            "--evaluation",
            "math-fractions",
            "--no-countdown",
            "--latency-ms",
            "0",
        ])
        .write_stdin("b\nn\nc\ns\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Submitting (manual)"))
        .stdout(predicate::str::contains("Score: 100% (2 of 2 correct), passed"));
}

#[test]
fn take_below_passing_score() {
    let dir = TempDir::new().unwrap();
    aula_in(&dir)
        .args([
            "take",
            "--evaluation",
            "math-fractions",
            "--no-countdown",
            "--latency-ms",
            "0",
        ])
        .write_stdin("a\nn\nc\ns\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Score: 50% (1 of 2 correct), not passed"));
}

#[test]
fn submit_before_last_question_is_rejected() {
    let dir = TempDir::new().unwrap();
    aula_in(&dir)
        .args([
            "take",
            "--evaluation",
            "math-fractions",
            "--no-countdown",
            "--latency-ms",
            "0",
        ])
        .write_stdin("b\ns\nq\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("only be submitted from the last question"))
        .stdout(predicate::str::contains("abandoned, 1 answer(s) discarded"));
}

#[test]
fn closing_stdin_abandons() {
    let dir = TempDir::new().unwrap();
    aula_in(&dir)
        .args([
            "take",
            "--evaluation",
            "communication-comprehension",
            "--no-countdown",
        ])
        .write_stdin("c\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("abandoned, 1 answer(s) discarded"))
        .stdout(predicate::str::contains("Score").not());
}

#[test]
fn take_markdown_summary() {
    let dir = TempDir::new().unwrap();
    aula_in(&dir)
        .args([
            "take",
            "--evaluation",
            "math-fractions",
            "--no-countdown",
            "--latency-ms",
            "0",
            "--markdown",
        ])
        .write_stdin("b\nn\nc\ns\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("**Score:** 100% (2 of 2 correct)"))
        .stdout(predicate::str::contains("| Question | Option | Correct |"));
}

#[test]
fn take_unknown_evaluation() {
    let dir = TempDir::new().unwrap();
    aula_in(&dir)
        .args(["take", "--evaluation", "history"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no evaluation history"));
}

#[test]
fn take_with_json_reporter_writes_result() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("aula.toml"),
        "results_dir = \"results\"\n\n[reporter]\ntype = \"json\"\n",
    )
    .unwrap();

    aula_in(&dir)
        .args([
            "take",
            "--evaluation",
            "math-fractions",
            "--no-countdown",
            "--user",
            "alumno1",
        ])
        .write_stdin("b\nn\nh\nc\ns\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Hint: El área de un cuadrado"))
        .stdout(predicate::str::contains("Result stored in results"));

    let files: Vec<_> = std::fs::read_dir(dir.path().join("results"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(files.len(), 1);
    let name = files[0].file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("result-math-fractions-"), "{name}");

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&files[0]).unwrap()).unwrap();
    assert_eq!(json["evaluationId"], "math-fractions");
    assert_eq!(json["userId"], "alumno1");
    assert_eq!(json["score"], 100);
    assert_eq!(json["answers"][1]["hintsUsed"], 1);
}

#[test]
fn practice_round_earns_points() {
    let dir = TempDir::new().unwrap();
    aula_in(&dir)
        .args(["practice", "--subject", "math"])
        .write_stdin("b\nn\nc\nn\na\nn\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Answered 3 of 3 questions, 3 correct."))
        .stdout(predicate::str::contains("Points: 25"));
}

#[test]
fn practice_retry_halves_reward() {
    let dir = TempDir::new().unwrap();
    aula_in(&dir)
        .args(["practice", "--subject", "matematica"])
        .write_stdin("a\nr\nb\nq\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Type r to try once more."))
        .stdout(predicate::str::contains("(+5 points)"))
        .stdout(predicate::str::contains("Points: 5"));
}

#[test]
fn practice_reads_bank_from_config_flag() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("custom.toml");
    std::fs::write(
        &config,
        format!(
            "bank_path = \"{}\"\n",
            bank_path("sixth-grade-review.toml").replace('\\', "/")
        ),
    )
    .unwrap();

    aula_in(&dir)
        .args(["practice", "--subject", "communication", "--config"])
        .arg(&config)
        .write_stdin("b\nn\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Practice: communication (1 questions)"))
        .stdout(predicate::str::contains("Answered 1 of 1 questions, 1 correct."));
}

#[test]
fn practice_unknown_subject() {
    aula()
        .args(["practice", "--subject", "history"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown subject"));
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    aula_in(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created aula.toml"))
        .stdout(predicate::str::contains("Created banks/sample.toml"));

    assert!(dir.path().join("aula.toml").exists());
    assert!(dir.path().join("banks/sample.toml").exists());
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();

    aula_in(&dir).arg("init").assert().success();

    aula_in(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn init_output_is_usable() {
    let dir = TempDir::new().unwrap();
    aula_in(&dir).arg("init").assert().success();

    aula_in(&dir)
        .args(["validate", "--bank", "banks/sample.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("All banks valid"));

    aula_in(&dir)
        .args([
            "take",
            "--evaluation",
            "sample-review",
            "--no-countdown",
            "--latency-ms",
            "0",
        ])
        .write_stdin("b\nn\nc\ns\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Score: 100% (2 of 2 correct), passed"));
}
