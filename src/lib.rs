//! Spaced-repetition scheduling for chess tactics puzzles.
//!
//! A puzzle is tracked by id only. Each pass or fail is logged, and the
//! [`scheduler`] decides the date the puzzle is due again; the [`db`]
//! module keeps that state in a local SQLite file.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod puzzles;
pub mod results;
pub mod scheduler;

pub use config::{Config, StoreConfig};
pub use db::{AppliedOutcome, Rates, Repository};
pub use error::PuzzleError;
pub use results::{Batch, Outcome};
pub use scheduler::{PolicyKind, SchedulingPolicy};
