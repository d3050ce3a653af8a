#[derive(Debug, Clone, FromRow)]
pub struct Puzzle {
    pub puzzle_id: String,
    pub score: i64,
    #[sqlx(rename = "next_test_date")]
    pub next_review_date: NaiveDate,
    pub easiness: f64,
    pub interval_days: i64,
}

impl Puzzle {
    /// The scheduler's view of this puzzle.
    pub fn schedule_state(&self) -> ScheduleState {
        ScheduleState {
            score: u32::try_from(self.score).unwrap_or(0),
            interval_days: u32::try_from(self.interval_days).unwrap_or(0),
            easiness: self.easiness,
        }
    }
}

/// Per-puzzle tallies over the whole result log.
#[derive(Debug, Clone, FromRow)]
pub struct PuzzleStats {
    pub puzzle_id: String,
    pub score: i64,
    pub successes: i64,
    pub failures: i64,
    pub attempts: i64,
}

/// Pulls a puzzle id out of a command argument.
///
/// Accepts a bare id (`"123"`) or anything the id is embedded in, such as
/// `https://www.chess.com/puzzles/problem/123`. Every non-digit character is
/// dropped, so the digits are concatenated in order.
///
/// # Errors
/// Returns `InvalidArgument` when the argument contains no digits at all.
pub fn extract_puzzle_id(arg: &str) -> Result<String, PuzzleError> {
    let id: String = arg.chars().filter(char::is_ascii_digit).collect();
    if id.is_empty() {
        return Err(PuzzleError::InvalidArgument(format!(
            "'{arg}' does not contain a puzzle id"
        )));
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_ids_from_urls() {
        assert_eq!(extract_puzzle_id("123").unwrap(), "123");
        assert_eq!(
            extract_puzzle_id("https://www.chess.com/puzzles/problem/4521").unwrap(),
            "4521"
        );
        assert_eq!(extract_puzzle_id("p12x34").unwrap(), "1234");
    }

    #[test]
    fn rejects_arguments_without_digits() {
        assert!(matches!(
            extract_puzzle_id("delete"),
            Err(PuzzleError::InvalidArgument(_))
        ));
    }

    #[test]
    fn clamps_negative_scores() {
        let puzzle = Puzzle {
            puzzle_id: "1".into(),
            score: -3,
            next_review_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            easiness: 2.5,
            interval_days: 1,
        };
        assert_eq!(puzzle.schedule_state().score, 0);
    }
}

use crate::error::PuzzleError;
use crate::scheduler::ScheduleState;
use chrono::NaiveDate;
use sqlx::FromRow;
