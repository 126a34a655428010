//! Scoring and display arithmetic shared by sessions and reports.

use crate::model::Difficulty;

/// Points earned for a correct practice answer.
///
/// The difficulty's base points are paid in full on the first attempt and
/// halved on any later one, rounding half up (`Math.round` semantics, so
/// an easy question answered on retry is worth 3, not 2).
pub fn practice_reward(difficulty: Difficulty, prior_attempts: u32) -> u32 {
    let base = difficulty.base_points();
    if prior_attempts == 0 {
        base
    } else {
        (base + 1) / 2
    }
}

/// Rounded percentage of `part` over `total`; zero when `total` is zero.
pub fn percentage(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((part as f64 / total as f64) * 100.0).round() as u32
}

/// Render seconds as `m:ss`.
pub fn format_time(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
