#[derive(Debug, Clone, FromRow)]
pub struct ResultEntry {
    pub puzzle_id: String,
    pub date: NaiveDate,
    #[sqlx(rename = "result")]
    pub outcome: Outcome,
}

/// The result of one review attempt. Stored as the single characters the
/// command line accepts, `s` for success and `f` for failure.
#[derive(Hash, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
pub enum Outcome {
    #[sqlx(rename = "s")]
    Pass,
    #[sqlx(rename = "f")]
    Fail,
}

impl Outcome {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            's' => Some(Outcome::Pass),
            'f' => Some(Outcome::Fail),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Outcome::Pass => 's',
            Outcome::Fail => 'f',
        }
    }
}

impl FromStr for Outcome {
    type Err = PuzzleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next().and_then(Outcome::from_char), chars.next()) {
            (Some(outcome), None) => Ok(outcome),
            _ => Err(PuzzleError::InvalidArgument(format!(
                "'{s}' is not an outcome, expected 's' or 'f'"
            ))),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// An ordered run of outcomes applied to the due queue in one go, e.g. `ssf`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch(Vec<Outcome>);

impl Batch {
    pub fn outcomes(&self) -> &[Outcome] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for Batch {
    type Err = PuzzleError;

    /// Accepts only non-empty strings made entirely of `s` and `f`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let outcomes = s
            .chars()
            .map(Outcome::from_char)
            .collect::<Option<Vec<_>>>()
            .filter(|outcomes| !outcomes.is_empty())
            .ok_or_else(|| {
                PuzzleError::InvalidArgument(format!(
                    "'{s}' is not a batch, expected a string of 's' and 'f'"
                ))
            })?;
        Ok(Batch(outcomes))
    }
}


use crate::error::PuzzleError;
use chrono::NaiveDate;
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
