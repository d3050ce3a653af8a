/// A CLI to schedule chess tactics puzzles with spaced repetition.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, after_help = USAGE)]
struct Cli {
    /// The command and its argument, e.g. `next`, `n 3`, `s`, `ssf`, `4521 f`.
    /// With no command the next due puzzle is shown.
    args: Vec<String>,

    /// JSON config file. Flags given here override its values.
    #[arg(long, env = "DAILYPUZZLES_CONFIG")]
    config: Option<PathBuf>,

    /// Path to the puzzle store.
    #[arg(long, env = "DAILYPUZZLES_DB")]
    db: Option<PathBuf>,

    /// Scheduling policy used when recording outcomes.
    #[arg(long, value_enum)]
    policy: Option<PolicyKind>,

    /// Treat this date (YYYY-MM-DD) as today.
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Exit with status 1 when a command fails.
    #[arg(long)]
    strict_exit: bool,

    /// Emit logs as JSON lines on stderr.
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            // Bad input is reported like any other failed command.
            let rendered = e.render().to_string();
            let message = rendered.lines().next().unwrap_or_default();
            println!("ERROR: {}", message.trim_start_matches("error: "));
            println!("{USAGE}");
            let strict = std::env::args().any(|arg| arg == "--strict-exit");
            return if strict {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    // --- Logging: stderr only, stdout is for the user ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let (strict, outcome) = match resolve_config(&cli) {
        Ok(config) => (config.strict_exit_codes, run(&cli, &config).await),
        Err(e) => (cli.strict_exit, Err(e)),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = %format!("{e:#}"), "command failed");
            println!("ERROR: {e:#}");
            if strict {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
    }
}

fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    if let Some(db) = &cli.db {
        config.store.path = db.clone();
    }
    if let Some(policy) = cli.policy {
        config.policy = policy;
    }
    if cli.strict_exit {
        config.strict_exit_codes = true;
    }
    Ok(config)
}

async fn run(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let command = Command::from_args(&cli.args)?;
    let today = cli.date.unwrap_or_else(|| Local::now().date_naive());

    // --- Database Setup ---
    let repo = Repository::ensure_open(&config.store)
        .await
        .context("Could not open the puzzle store")?;

    let result = execute(&repo, command, today, config).await;
    repo.close().await;
    result
}

async fn execute(
    repo: &Repository,
    command: Command,
    today: NaiveDate,
    config: &Config,
) -> anyhow::Result<()> {
    let policy = config.policy.policy();
    let url = |id: &str| format!("{}{}", config.puzzle_url_prefix, id);

    match command {
        Command::Next => {
            let remaining = repo.count_due(today).await?;
            match repo.puzzle_at_offset(today, 0).await? {
                Some(puzzle_id) if remaining > 0 => {
                    println!("{}", url(&puzzle_id));
                    println!("REMAINING: {}", remaining - 1);
                    print_rates(repo).await?;
                }
                _ => println!("No more tests today!!!"),
            }
        }
        Command::NextCount(count) => {
            let due = repo.current_due(today).await?;
            if due.len() < count {
                println!("There are only {} tests remaining today", due.len());
            } else {
                for puzzle_id in &due[..count] {
                    println!("{}", url(puzzle_id));
                }
                println!("REMAINING: {}", due.len() - count);
                print_rates(repo).await?;
            }
        }
        Command::Mark(outcome) => {
            let applied = repo.mark_current(outcome, today, policy.as_ref()).await?;
            print_applied(&applied);
            print_stats(repo, today).await?;
        }
        Command::Record { puzzle_id, outcome } => {
            let applied = repo
                .upsert_after_outcome(&puzzle_id, outcome, today, policy.as_ref())
                .await?;
            print_applied(&applied);
            print_stats(repo, today).await?;
        }
        Command::Batch(batch) => {
            let applied = repo
                .apply_batch(&batch, today, policy.as_ref())
                .await
                .context("Cannot batch record results")?;
            for item in &applied {
                print_applied(item);
            }
            print_stats(repo, today).await?;
        }
        Command::Advance => {
            let (puzzle_id, date) = repo.advance_current(today, 1).await?;
            println!("Puzzle {puzzle_id} moved to {date}");
        }
        Command::Delete(puzzle_id) => {
            let results = repo.delete_puzzle(&puzzle_id).await?;
            println!("Deleted puzzle {puzzle_id} and {results} results");
        }
        Command::Future => {
            let schedule = repo.schedule_by_date().await?;
            if schedule.is_empty() {
                println!("No puzzles scheduled.");
            }
            for (date, count) in schedule {
                println!("{date} - {count}");
            }
        }
        Command::Stats => print_stats(repo, today).await?,
        Command::Puzzles => {
            let stats = repo.puzzle_stats().await?;
            if stats.is_empty() {
                println!("No puzzles recorded yet.");
            }
            for item in &stats {
                println!(
                    "  - {:<12} Score: {:<3} Successes: {:<4} Failures: {:<4} Attempts: {}",
                    item.puzzle_id, item.score, item.successes, item.failures, item.attempts
                );
            }
        }
        Command::Usage => println!("{USAGE}"),
    }

    Ok(())
}

fn print_applied(applied: &AppliedOutcome) {
    if applied.created {
        println!(
            "Puzzle {} added, next review on {}",
            applied.puzzle_id, applied.next_review_date
        );
        return;
    }
    match applied.outcome {
        Outcome::Pass => println!(
            "Puzzle {} incremented for success (score {}, next review on {})",
            applied.puzzle_id, applied.score, applied.next_review_date
        ),
        Outcome::Fail => println!(
            "Puzzle {} reset for failure (next review on {})",
            applied.puzzle_id, applied.next_review_date
        ),
    }
}

async fn print_stats(repo: &Repository, today: NaiveDate) -> anyhow::Result<()> {
    println!("REMAINING: {}", repo.count_due(today).await?);
    print_rates(repo).await
}

async fn print_rates(repo: &Repository) -> anyhow::Result<()> {
    match repo.rates().await? {
        Some(rates) => {
            println!("FAIL: {:.2}", rates.fail_rate);
            println!("SUCCESS: {:.2}", rates.pass_rate);
        }
        None => println!("No results recorded yet"),
    }
    Ok(())
}

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::Parser;
use clap::error::ErrorKind;
use dailypuzzles::cli::{Command, USAGE};
use dailypuzzles::config::load_config;
use dailypuzzles::{AppliedOutcome, Config, Outcome, PolicyKind, Repository};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
