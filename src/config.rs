//! Runtime configuration: where the store lives, what its relations are
//! called, and which scheduling policy to run.

pub const DEFAULT_STORE_PATH: &str = "dailypuzzles.sqlite";
pub const DEFAULT_URL_PREFIX: &str = "https://www.chess.com/puzzles/problem/";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub policy: PolicyKind,
    /// Prepended to a puzzle id when printing it.
    pub puzzle_url_prefix: String,
    /// Exit non-zero when a command fails instead of always returning 0.
    pub strict_exit_codes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            store: StoreConfig::default(),
            policy: PolicyKind::default(),
            puzzle_url_prefix: DEFAULT_URL_PREFIX.to_string(),
            strict_exit_codes: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub puzzles_table: String,
    pub results_table: String,
    /// Unix permission bits for a newly created store file.
    pub file_mode: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            path: PathBuf::from(DEFAULT_STORE_PATH),
            puzzles_table: "puzzles".to_string(),
            results_table: "results".to_string(),
            file_mode: 0o600,
        }
    }
}

impl StoreConfig {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        StoreConfig {
            path: path.into(),
            ..StoreConfig::default()
        }
    }

    /// Table names are spliced into SQL text, so only plain identifiers pass.
    pub fn validate(&self) -> Result<(), PuzzleError> {
        for name in [&self.puzzles_table, &self.results_table] {
            if !is_identifier(name) {
                return Err(PuzzleError::InvalidArgument(format!(
                    "'{name}' is not a valid table name"
                )));
            }
        }
        if self.puzzles_table.eq_ignore_ascii_case(&self.results_table) {
            return Err(PuzzleError::InvalidArgument(
                "puzzle and result tables must have different names".to_string(),
            ));
        }
        if self.file_mode > 0o777 {
            return Err(PuzzleError::InvalidArgument(format!(
                "file mode {:o} is out of range",
                self.file_mode
            )));
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Reads a JSON config file. Missing fields fall back to their defaults.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open config file '{}'", path.display()))?;

    let reader = BufReader::new(file);

    let config: Config = serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;

    config.store.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_restrictive() {
        let config = Config::default();
        assert_eq!(config.store.file_mode, 0o600);
        assert_eq!(config.policy, PolicyKind::Fibonacci);
        assert!(!config.strict_exit_codes);
        assert!(config.store.validate().is_ok());
    }

    #[test]
    fn rejects_unsafe_table_names() {
        let mut store = StoreConfig::default();
        store.puzzles_table = "puzzles; drop table results".to_string();
        assert!(store.validate().is_err());

        let mut store = StoreConfig::default();
        store.results_table = "1results".to_string();
        assert!(store.validate().is_err());

        let mut store = StoreConfig::default();
        store.results_table = "PUZZLES".to_string();
        assert!(store.validate().is_err());
    }

    #[test]
    fn partial_config_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut file = File::create(&path).unwrap();
        write!(
            file,
            r#"{{"policy": "sm2", "store": {{"results_table": "attempts"}}}}"#
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.policy, PolicyKind::Sm2);
        assert_eq!(config.store.results_table, "attempts");
        assert_eq!(config.store.puzzles_table, "puzzles");
        assert_eq!(config.puzzle_url_prefix, DEFAULT_URL_PREFIX);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        assert!(load_config(Path::new("/nonexistent/dailypuzzles.json")).is_err());
    }
}

use crate::error::PuzzleError;
use crate::scheduler::PolicyKind;
use anyhow::Context;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
