//! SQLite storage for puzzles and their result log.
//!
//! [`Repository`] owns every piece of persisted state. Two relations are
//! kept, with names taken from [`StoreConfig`]:
//!
//! - puzzles: one row per puzzle id with its score, next review date and
//!   the SM2 easiness/interval pair
//! - results: an append-only log of `(puzzle_id, date, s|f)` rows
//!
//! Dates are stored as `YYYY-MM-DD` text so ordering and `<=` comparisons in
//! SQL are calendar comparisons. Anything that touches more than one row runs
//! in a single transaction.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rates {
    pub fail_rate: f64,
    pub pass_rate: f64,
    pub total: i64,
}

/// What happened to a puzzle after an outcome was recorded for it.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedOutcome {
    pub puzzle_id: String,
    pub outcome: Outcome,
    /// True when the puzzle was seen for the first time.
    pub created: bool,
    pub score: u32,
    pub next_review_date: NaiveDate,
}

/// SQL text with the configured table names spliced in.
#[derive(Debug)]
struct Statements {
    create_puzzles: String,
    create_results: String,
    create_results_index: String,
    exists: String,
    find: String,
    insert_puzzle: String,
    update_puzzle: String,
    insert_result: String,
    due: String,
    due_at_offset: String,
    count_due: String,
    schedule_by_date: String,
    rates: String,
    puzzle_stats: String,
    results_for: String,
    set_date: String,
    delete_puzzle: String,
    delete_results: String,
}

impl Statements {
    fn new(store: &StoreConfig) -> Self {
        let p = &store.puzzles_table;
        let r = &store.results_table;
        Statements {
            create_puzzles: format!(
                r#"
                CREATE TABLE IF NOT EXISTS {p} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    puzzle_id TEXT NOT NULL UNIQUE,
                    score INTEGER NOT NULL DEFAULT 0 CHECK (score >= 0),
                    next_test_date TEXT NOT NULL,
                    easiness REAL NOT NULL DEFAULT {DEFAULT_EASINESS:.1},
                    interval_days INTEGER NOT NULL DEFAULT 0
                )
                "#
            ),
            create_results: format!(
                r#"
                CREATE TABLE IF NOT EXISTS {r} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    puzzle_id TEXT NOT NULL,
                    date TEXT NOT NULL,
                    result TEXT NOT NULL CHECK (result IN ('s', 'f'))
                )
                "#
            ),
            create_results_index: format!(
                "CREATE INDEX IF NOT EXISTS {r}_puzzle_id_idx ON {r} (puzzle_id)"
            ),
            exists: format!("SELECT 1 FROM {p} WHERE puzzle_id = ?"),
            find: format!(
                "SELECT puzzle_id, score, next_test_date, easiness, interval_days FROM {p} WHERE puzzle_id = ?"
            ),
            insert_puzzle: format!(
                "INSERT INTO {p} (puzzle_id, score, next_test_date, easiness, interval_days) VALUES (?, ?, ?, ?, ?)"
            ),
            update_puzzle: format!(
                "UPDATE {p} SET score = ?, next_test_date = ?, easiness = ?, interval_days = ? WHERE puzzle_id = ?"
            ),
            insert_result: format!("INSERT INTO {r} (puzzle_id, date, result) VALUES (?, ?, ?)"),
            due: format!(
                "SELECT puzzle_id FROM {p} WHERE next_test_date <= ? ORDER BY next_test_date ASC, id ASC"
            ),
            due_at_offset: format!(
                "SELECT puzzle_id FROM {p} WHERE next_test_date <= ? ORDER BY next_test_date ASC, id ASC LIMIT 1 OFFSET ?"
            ),
            count_due: format!("SELECT COUNT(*) FROM {p} WHERE next_test_date <= ?"),
            schedule_by_date: format!(
                "SELECT next_test_date, COUNT(*) FROM {p} GROUP BY next_test_date ORDER BY next_test_date ASC"
            ),
            rates: format!(
                r#"
                SELECT
                    COALESCE(SUM(CASE WHEN result = 'f' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN result = 's' THEN 1 ELSE 0 END), 0),
                    COUNT(*)
                FROM {r}
                "#
            ),
            puzzle_stats: format!(
                r#"
                SELECT
                    pz.puzzle_id,
                    pz.score,
                    (SELECT COUNT(1) FROM {r} rs WHERE rs.result = 's' AND rs.puzzle_id = pz.puzzle_id) AS successes,
                    (SELECT COUNT(1) FROM {r} rs WHERE rs.result = 'f' AND rs.puzzle_id = pz.puzzle_id) AS failures,
                    (SELECT COUNT(1) FROM {r} rs WHERE rs.puzzle_id = pz.puzzle_id) AS attempts
                FROM {p} pz
                ORDER BY score DESC, successes DESC, failures ASC
                "#
            ),
            results_for: format!(
                "SELECT puzzle_id, date, result FROM {r} WHERE puzzle_id = ? ORDER BY id ASC"
            ),
            set_date: format!("UPDATE {p} SET next_test_date = ? WHERE puzzle_id = ?"),
            delete_puzzle: format!("DELETE FROM {p} WHERE puzzle_id = ?"),
            delete_results: format!("DELETE FROM {r} WHERE puzzle_id = ?"),
        }
    }
}

pub struct Repository {
    pool: SqlitePool,
    sql: Statements,
}

impl Repository {
    /// Opens the store, creating the file and both relations if missing.
    ///
    /// Safe to call before every command: table creation is idempotent and
    /// never touches existing rows. A newly created file gets
    /// `store.file_mode` as its permission bits.
    ///
    /// # Errors
    /// `InvalidArgument` for bad table names, `StorageUnavailable` when the
    /// file cannot be created or opened, `QueryFailed` if schema setup fails.
    #[tracing::instrument(skip(store), fields(path = %store.path.display()))]
    pub async fn ensure_open(store: &StoreConfig) -> Result<Self> {
        store.validate()?;

        let unavailable = |source: Box<dyn std::error::Error + Send + Sync>| {
            PuzzleError::StorageUnavailable {
                path: store.path.clone(),
                source,
            }
        };

        if !store.path.exists() {
            create_store_file(&store.path, store.file_mode).map_err(|e| unavailable(e.into()))?;
            tracing::info!(mode = %format!("{:o}", store.file_mode), "created puzzle store");
        }

        // One connection: each invocation does a single unit of work.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(&store.path)
                    .create_if_missing(true),
            )
            .await
            .map_err(|e| unavailable(e.into()))?;

        let repo = Repository {
            pool,
            sql: Statements::new(store),
        };
        repo.create_tables().await?;
        Ok(repo)
    }

    async fn create_tables(&self) -> Result<()> {
        for statement in [
            &self.sql.create_puzzles,
            &self.sql.create_results,
            &self.sql.create_results_index,
        ] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(PuzzleError::query("create tables"))?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(self) {
        self.pool.close().await;
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn exists(&self, puzzle_id: &str) -> Result<bool> {
        let found = sqlx::query_scalar::<_, i64>(&self.sql.exists)
            .bind(puzzle_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(PuzzleError::query(format!("check whether puzzle {puzzle_id} exists")))?;
        Ok(found.is_some())
    }

    /// Returns `Ok(None)` if the puzzle has never been seen.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn find(&self, puzzle_id: &str) -> Result<Option<Puzzle>> {
        let mut conn = self.acquire().await?;
        find_puzzle(&mut conn, &self.sql, puzzle_id).await
    }

    /// # Errors
    /// `NotFound` when no such puzzle exists, which is distinct from a
    /// puzzle whose score is 0.
    pub async fn score_of(&self, puzzle_id: &str) -> Result<u32> {
        let puzzle = self
            .find(puzzle_id)
            .await?
            .ok_or_else(|| PuzzleError::NotFound(puzzle_id.to_string()))?;
        Ok(puzzle.schedule_state().score)
    }

    /// Records an outcome for a puzzle and reschedules it.
    ///
    /// A known puzzle runs through `policy` and gets its new score and due
    /// date. An unseen puzzle is created with score 0, due tomorrow,
    /// whatever the outcome was. Either way one result row is logged for
    /// `today`.
    #[tracing::instrument(skip(self, policy))]
    pub async fn upsert_after_outcome(
        &self,
        puzzle_id: &str,
        outcome: Outcome,
        today: NaiveDate,
        policy: &dyn SchedulingPolicy,
    ) -> Result<AppliedOutcome> {
        let mut tx = self.begin().await?;
        let applied = apply_outcome(&mut tx, &self.sql, puzzle_id, outcome, today, policy).await?;
        commit(tx).await?;
        Ok(applied)
    }

    /// Ids of every puzzle due on or before `today`, longest overdue first.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn current_due(&self, today: NaiveDate) -> Result<Vec<String>> {
        sqlx::query_scalar::<_, String>(&self.sql.due)
            .bind(today)
            .fetch_all(&self.pool)
            .await
            .map_err(PuzzleError::query("list due puzzles"))
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn count_due(&self, today: NaiveDate) -> Result<usize> {
        let count = sqlx::query_scalar::<_, i64>(&self.sql.count_due)
            .bind(today)
            .fetch_one(&self.pool)
            .await
            .map_err(PuzzleError::query("count due puzzles"))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// The `offset`-th due puzzle (0-indexed), in the same order as
    /// [`Repository::current_due`]. `None` means fewer puzzles are due.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn puzzle_at_offset(&self, today: NaiveDate, offset: usize) -> Result<Option<String>> {
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        sqlx::query_scalar::<_, String>(&self.sql.due_at_offset)
            .bind(today)
            .bind(offset)
            .fetch_optional(&self.pool)
            .await
            .map_err(PuzzleError::query("fetch due puzzle at offset"))
    }

    /// Fail and pass percentages over every result ever logged, or `None`
    /// when nothing has been logged yet.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn rates(&self) -> Result<Option<Rates>> {
        let (failures, passes, total) = sqlx::query_as::<_, (i64, i64, i64)>(&self.sql.rates)
            .fetch_one(&self.pool)
            .await
            .map_err(PuzzleError::query("compute pass/fail rates"))?;

        if total == 0 {
            return Ok(None);
        }

        let total_f = total as f64;
        Ok(Some(Rates {
            fail_rate: 100.0 * failures as f64 / total_f,
            pass_rate: 100.0 * passes as f64 / total_f,
            total,
        }))
    }

    /// Removes a puzzle and its whole result log. Both deletes commit
    /// together or not at all. Results logged under an id with no puzzle
    /// row are removed too.
    ///
    /// Returns the number of result rows removed. `NotFound` only when
    /// neither relation mentions the id.
    #[tracing::instrument(skip(self))]
    pub async fn delete_puzzle(&self, puzzle_id: &str) -> Result<u64> {
        let mut tx = self.begin().await?;

        let puzzles = sqlx::query(&self.sql.delete_puzzle)
            .bind(puzzle_id)
            .execute(&mut *tx)
            .await
            .map_err(PuzzleError::query(format!("delete puzzle {puzzle_id}")))?
            .rows_affected();

        let results = sqlx::query(&self.sql.delete_results)
            .bind(puzzle_id)
            .execute(&mut *tx)
            .await
            .map_err(PuzzleError::query(format!("delete results for puzzle {puzzle_id}")))?
            .rows_affected();

        if puzzles == 0 && results == 0 {
            return Err(PuzzleError::NotFound(puzzle_id.to_string()));
        }

        commit(tx).await?;
        tracing::info!(results, "deleted puzzle");
        Ok(results)
    }

    /// Overrides a puzzle's next review date without logging a result.
    #[tracing::instrument(skip(self))]
    pub async fn set_due_date(&self, puzzle_id: &str, date: NaiveDate) -> Result<()> {
        let updated = sqlx::query(&self.sql.set_date)
            .bind(date)
            .bind(puzzle_id)
            .execute(&self.pool)
            .await
            .map_err(PuzzleError::query(format!("set date on puzzle {puzzle_id}")))?
            .rows_affected();

        if updated == 0 {
            return Err(PuzzleError::NotFound(puzzle_id.to_string()));
        }
        Ok(())
    }

    /// Applies `batch[i]` to the puzzle that was `i`-th in the due queue
    /// when the batch started.
    ///
    /// # Errors
    /// `InsufficientDueItems` if the batch is longer than the queue. Nothing
    /// is written in that case, nor when any single update fails.
    #[tracing::instrument(skip(self, policy))]
    pub async fn apply_batch(
        &self,
        batch: &Batch,
        today: NaiveDate,
        policy: &dyn SchedulingPolicy,
    ) -> Result<Vec<AppliedOutcome>> {
        // Rescheduling a puzzle can move it out of the due set, so the
        // queue is read once up front.
        let due = self.current_due(today).await?;
        if batch.len() > due.len() {
            return Err(PuzzleError::InsufficientDueItems {
                available: due.len(),
                requested: batch.len(),
            });
        }

        let mut tx = self.begin().await?;
        let mut applied = Vec::with_capacity(batch.len());
        for (puzzle_id, &outcome) in due.iter().zip(batch.outcomes()) {
            applied.push(apply_outcome(&mut tx, &self.sql, puzzle_id, outcome, today, policy).await?);
        }
        commit(tx).await?;
        Ok(applied)
    }

    /// Records an outcome for the puzzle at the head of the due queue.
    pub async fn mark_current(
        &self,
        outcome: Outcome,
        today: NaiveDate,
        policy: &dyn SchedulingPolicy,
    ) -> Result<AppliedOutcome> {
        let puzzle_id = self.current_puzzle(today).await?;
        self.upsert_after_outcome(&puzzle_id, outcome, today, policy)
            .await
    }

    /// Pushes the head of the due queue to `days` days from today without
    /// logging a result. Returns the puzzle id and its new date.
    pub async fn advance_current(&self, today: NaiveDate, days: u32) -> Result<(String, NaiveDate)> {
        let puzzle_id = self.current_puzzle(today).await?;
        let date = due_date(today, days);
        self.set_due_date(&puzzle_id, date).await?;
        Ok((puzzle_id, date))
    }

    async fn current_puzzle(&self, today: NaiveDate) -> Result<String> {
        self.puzzle_at_offset(today, 0)
            .await?
            .ok_or(PuzzleError::InsufficientDueItems {
                available: 0,
                requested: 1,
            })
    }

    /// Every scheduled date with the number of puzzles due on it, earliest
    /// first. Overdue dates are included.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn schedule_by_date(&self) -> Result<Vec<(NaiveDate, i64)>> {
        sqlx::query_as::<_, (NaiveDate, i64)>(&self.sql.schedule_by_date)
            .fetch_all(&self.pool)
            .await
            .map_err(PuzzleError::query("count puzzles by date"))
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn puzzle_stats(&self) -> Result<Vec<PuzzleStats>> {
        sqlx::query_as::<_, PuzzleStats>(&self.sql.puzzle_stats)
            .fetch_all(&self.pool)
            .await
            .map_err(PuzzleError::query("fetch per-puzzle stats"))
    }

    /// The result log for one puzzle, oldest first.
    pub async fn results_for(&self, puzzle_id: &str) -> Result<Vec<ResultEntry>> {
        sqlx::query_as::<_, ResultEntry>(&self.sql.results_for)
            .bind(puzzle_id)
            .fetch_all(&self.pool)
            .await
            .map_err(PuzzleError::query(format!("fetch results for puzzle {puzzle_id}")))
    }

    async fn acquire(&self) -> Result<PoolConnection<Sqlite>> {
        self.pool
            .acquire()
            .await
            .map_err(PuzzleError::query("acquire a connection"))
    }

    async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        self.pool
            .begin()
            .await
            .map_err(PuzzleError::query("begin transaction"))
    }
}

async fn commit(tx: Transaction<'static, Sqlite>) -> Result<()> {
    tx.commit()
        .await
        .map_err(PuzzleError::query("commit transaction"))
}

async fn find_puzzle(
    conn: &mut SqliteConnection,
    sql: &Statements,
    puzzle_id: &str,
) -> Result<Option<Puzzle>> {
    sqlx::query_as::<_, Puzzle>(&sql.find)
        .bind(puzzle_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(PuzzleError::query(format!("fetch puzzle {puzzle_id}")))
}

async fn apply_outcome(
    conn: &mut SqliteConnection,
    sql: &Statements,
    puzzle_id: &str,
    outcome: Outcome,
    today: NaiveDate,
    policy: &dyn SchedulingPolicy,
) -> Result<AppliedOutcome> {
    let applied = match find_puzzle(conn, sql, puzzle_id).await? {
        Some(puzzle) => {
            let next = policy.transition(&puzzle.schedule_state(), outcome);
            let next_review_date = due_date(today, next.interval_days);

            sqlx::query(&sql.update_puzzle)
                .bind(i64::from(next.score))
                .bind(next_review_date)
                .bind(next.easiness)
                .bind(i64::from(next.interval_days))
                .bind(puzzle_id)
                .execute(&mut *conn)
                .await
                .map_err(PuzzleError::query(format!("reschedule puzzle {puzzle_id}")))?;

            AppliedOutcome {
                puzzle_id: puzzle_id.to_string(),
                outcome,
                created: false,
                score: next.score,
                next_review_date,
            }
        }
        None => {
            // First sighting: not run through the policy, always due tomorrow.
            let next_review_date = due_date(today, 1);

            sqlx::query(&sql.insert_puzzle)
                .bind(puzzle_id)
                .bind(0_i64)
                .bind(next_review_date)
                .bind(DEFAULT_EASINESS)
                .bind(1_i64)
                .execute(&mut *conn)
                .await
                .map_err(PuzzleError::query(format!("insert puzzle {puzzle_id}")))?;

            AppliedOutcome {
                puzzle_id: puzzle_id.to_string(),
                outcome,
                created: true,
                score: 0,
                next_review_date,
            }
        }
    };

    sqlx::query(&sql.insert_result)
        .bind(puzzle_id)
        .bind(today)
        .bind(outcome)
        .execute(&mut *conn)
        .await
        .map_err(PuzzleError::query(format!("log result for puzzle {puzzle_id}")))?;

    tracing::info!(
        puzzle_id,
        %outcome,
        created = applied.created,
        score = applied.score,
        next = %applied.next_review_date,
        "recorded outcome"
    );
    Ok(applied)
}

fn create_store_file(path: &Path, mode: u32) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    match options.open(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    }
}

use crate::config::StoreConfig;
use crate::error::{PuzzleError, Result};
use crate::puzzles::{Puzzle, PuzzleStats};
use crate::results::{Batch, Outcome, ResultEntry};
use crate::scheduler::{DEFAULT_EASINESS, SchedulingPolicy, due_date};
use chrono::NaiveDate;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use std::fs::OpenOptions;
use std::path::Path;
