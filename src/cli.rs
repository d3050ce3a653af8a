//! Turns the positional command line into a [`Command`].
//!
//! The verbs are positional rather than flags so the tool stays quick to
//! type between puzzles: `dailypuzzles s`, `dailypuzzles ssf`,
//! `dailypuzzles 4521 f`.

pub const USAGE: &str = "\
Usage: dailypuzzles [OPTIONS] [COMMAND] [ARG]

Commands:
  (none), next        show the next puzzle due today with the remaining count and pass/fail rates
  n <count>           show the next <count> puzzles due today, if that many are due
  s | f               mark the current puzzle as a success or a failure
  <batch>             a string of s and f, e.g. ssf, applied in order to the puzzles due today
  <puzzle> s | f      mark a specific puzzle; <puzzle> is an id or a puzzle URL
  a                   push the current puzzle back to tomorrow without recording a result
  delete <puzzle>     remove a puzzle and all of its results
  future              list each scheduled date with the number of puzzles due then
  stats               show the overall success and failure rates
  puzzles             show score, successes, failures and attempts for every puzzle
  useage              print this message

Run with --help for the options.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Next,
    NextCount(usize),
    Stats,
    Future,
    Puzzles,
    Usage,
    Advance,
    /// A single outcome for the puzzle at the head of the due queue.
    Mark(Outcome),
    Batch(Batch),
    Record { puzzle_id: String, outcome: Outcome },
    Delete(String),
}

impl Command {
    /// Resolves the positional arguments. Anything unrecognised maps to
    /// [`Command::Usage`]; recognised verbs with a bad argument are errors.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Command, PuzzleError> {
        match args {
            [] => Ok(Command::Next),
            [verb] => Ok(Self::single(verb.as_ref())),
            [verb, arg] => Self::pair(verb.as_ref(), arg.as_ref()),
            _ => Ok(Command::Usage),
        }
    }

    fn single(verb: &str) -> Command {
        match verb {
            "next" => Command::Next,
            "stats" => Command::Stats,
            "future" => Command::Future,
            "puzzles" => Command::Puzzles,
            "useage" | "usage" => Command::Usage,
            "a" => Command::Advance,
            _ => match verb.parse::<Batch>() {
                Ok(batch) if batch.len() == 1 => Command::Mark(batch.outcomes()[0]),
                Ok(batch) => Command::Batch(batch),
                Err(_) => Command::Usage,
            },
        }
    }

    fn pair(verb: &str, arg: &str) -> Result<Command, PuzzleError> {
        match verb {
            "delete" => Ok(Command::Delete(extract_puzzle_id(arg)?)),
            "n" => match arg.parse::<usize>() {
                Ok(count) if count > 0 => Ok(Command::NextCount(count)),
                _ => Err(PuzzleError::InvalidArgument(format!(
                    "'{arg}' is not a positive number of puzzles"
                ))),
            },
            _ => match arg.parse::<Outcome>() {
                Ok(outcome) => Ok(Command::Record {
                    puzzle_id: extract_puzzle_id(verb)?,
                    outcome,
                }),
                Err(_) => Ok(Command::Usage),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Command {
        Command::from_args(args).unwrap()
    }

    #[test]
    fn no_arguments_shows_next() {
        assert_eq!(parse(&[]), Command::Next);
        assert_eq!(parse(&["next"]), Command::Next);
    }

    #[test]
    fn single_outcome_marks_current() {
        assert_eq!(parse(&["s"]), Command::Mark(Outcome::Pass));
        assert_eq!(parse(&["f"]), Command::Mark(Outcome::Fail));
    }

    #[test]
    fn outcome_strings_are_batches() {
        assert_eq!(parse(&["ssf"]), Command::Batch("ssf".parse().unwrap()));
    }

    #[test]
    fn verbs_take_priority() {
        assert_eq!(parse(&["stats"]), Command::Stats);
        assert_eq!(parse(&["future"]), Command::Future);
        assert_eq!(parse(&["puzzles"]), Command::Puzzles);
        assert_eq!(parse(&["a"]), Command::Advance);
        assert_eq!(parse(&["useage"]), Command::Usage);
        assert_eq!(parse(&["usage"]), Command::Usage);
    }

    #[test]
    fn specific_puzzle_from_url() {
        assert_eq!(
            parse(&["https://www.chess.com/puzzles/problem/4521", "f"]),
            Command::Record {
                puzzle_id: "4521".into(),
                outcome: Outcome::Fail
            }
        );
    }

    #[test]
    fn next_count_must_be_positive() {
        assert_eq!(parse(&["n", "3"]), Command::NextCount(3));
        assert!(Command::from_args(&["n", "0"]).is_err());
        assert!(Command::from_args(&["n", "three"]).is_err());
    }

    #[test]
    fn delete_extracts_id() {
        assert_eq!(parse(&["delete", "123"]), Command::Delete("123".into()));
        assert!(Command::from_args(&["delete", "abc"]).is_err());
    }

    #[test]
    fn unknown_input_shows_usage() {
        assert_eq!(parse(&["bogus"]), Command::Usage);
        assert_eq!(parse(&["123", "x"]), Command::Usage);
        assert_eq!(parse(&["1", "s", "extra"]), Command::Usage);
    }

    #[test]
    fn puzzle_without_digits_is_rejected() {
        assert!(matches!(
            Command::from_args(&["abc", "s"]),
            Err(PuzzleError::InvalidArgument(_))
        ));
    }
}

use crate::error::PuzzleError;
use crate::puzzles::extract_puzzle_id;
use crate::results::{Batch, Outcome};
