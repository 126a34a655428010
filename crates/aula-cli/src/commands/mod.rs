pub mod init;
pub mod list;
pub mod practice;
pub mod take;
pub mod validate;

use aula_core::model::Question;

/// Print a question with its options.
pub(crate) fn print_question(question: &Question, position: usize, total: usize) {
    println!();
    println!(
        "Question {position}/{total}: {} [{}]",
        question.title, question.difficulty
    );
    println!("  {}", question.content);
    for option in &question.options {
        println!("    {}) {}", option.id, option.text);
    }
}
