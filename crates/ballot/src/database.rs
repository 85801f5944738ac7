// File: src/database.rs
// Purpose: SQLx storage for polls, their options and votes
//
// Pure helpers (schema, row shaping) are kept apart from the async I/O functions.

use serde::{Deserialize, Serialize};
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;

// ============================================================================
// DOMAIN MODELS
// ============================================================================

/// Row in the polls table
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct PollRow {
    pub id: String,
    pub question: String,
    pub created_at: String,
}

/// Row in the poll_options table
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct OptionRow {
    pub id: i64,
    pub poll_id: String,
    pub label: String,
    pub position: i64,
}

/// Vote count for one option
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct TallyRow {
    pub option_id: i64,
    pub label: String,
    pub votes: i64,
}

// ============================================================================
// PURE FUNCTIONS
// ============================================================================

/// Table definitions, executed one statement at a time
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS polls (
        id TEXT PRIMARY KEY,
        question TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS poll_options (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        poll_id TEXT NOT NULL REFERENCES polls(id),
        label TEXT NOT NULL,
        position INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS votes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        poll_id TEXT NOT NULL REFERENCES polls(id),
        option_id INTEGER NOT NULL REFERENCES poll_options(id),
        voter_id TEXT,
        created_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_poll_options_poll ON poll_options(poll_id)",
    "CREATE INDEX IF NOT EXISTS idx_votes_poll ON votes(poll_id)",
    // One vote per named voter; anonymous (NULL) votes are not constrained
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_votes_poll_voter ON votes(poll_id, voter_id)",
];

/// In-memory SQLite gives every connection its own database, so such URLs
/// get a single-connection pool (Pure function)
///
/// # Examples
/// ```
/// use ballot::database::max_connections_for;
///
/// assert_eq!(max_connections_for("sqlite::memory:"), 1);
/// assert_eq!(max_connections_for("sqlite://ballot.db?mode=rwc"), 5);
/// ```
pub fn max_connections_for(database_url: &str) -> u32 {
    if database_url.contains(":memory:") {
        1
    } else {
        5
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

// ============================================================================
// I/O FUNCTIONS
// ============================================================================

/// Connect and create tables
///
/// # Database URLs Format:
/// - SQLite: `sqlite://ballot.db?mode=rwc` or `sqlite::memory:`
pub async fn init_db(database_url: &str) -> Result<AnyPool, sqlx::Error> {
    sqlx::any::install_default_drivers();

    let pool = AnyPoolOptions::new()
        .max_connections(max_connections_for(database_url))
        .connect(database_url)
        .await?;

    for statement in SCHEMA {
        sqlx::query(statement).execute(&pool).await?;
    }

    Ok(pool)
}

/// Insert a poll and its options, returning the stored poll
pub async fn insert_poll(
    pool: &AnyPool,
    question: &str,
    options: &[String],
) -> Result<(PollRow, Vec<OptionRow>), sqlx::Error> {
    let poll = PollRow {
        id: uuid::Uuid::new_v4().to_string(),
        question: question.to_string(),
        created_at: now_rfc3339(),
    };

    let mut tx = pool.begin().await?;

    sqlx::query("INSERT INTO polls (id, question, created_at) VALUES (?, ?, ?)")
        .bind(&poll.id)
        .bind(&poll.question)
        .bind(&poll.created_at)
        .execute(&mut *tx)
        .await?;

    for (position, label) in options.iter().enumerate() {
        sqlx::query("INSERT INTO poll_options (poll_id, label, position) VALUES (?, ?, ?)")
            .bind(&poll.id)
            .bind(label)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    let options = get_options(pool, &poll.id).await?;
    Ok((poll, options))
}

pub async fn get_poll(pool: &AnyPool, id: &str) -> Result<Option<PollRow>, sqlx::Error> {
    sqlx::query_as::<_, PollRow>(
        "SELECT id, question, created_at FROM polls WHERE id = ? LIMIT 1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Newest polls first
pub async fn list_polls(pool: &AnyPool, limit: i64) -> Result<Vec<PollRow>, sqlx::Error> {
    sqlx::query_as::<_, PollRow>(
        "SELECT id, question, created_at FROM polls ORDER BY created_at DESC, id LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn get_options(pool: &AnyPool, poll_id: &str) -> Result<Vec<OptionRow>, sqlx::Error> {
    sqlx::query_as::<_, OptionRow>(
        "SELECT id, poll_id, label, position FROM poll_options WHERE poll_id = ? ORDER BY position",
    )
    .bind(poll_id)
    .fetch_all(pool)
    .await
}

/// Insert a vote; `false` when this voter already has a vote on the poll
pub async fn insert_vote(
    pool: &AnyPool,
    poll_id: &str,
    option_id: i64,
    voter_id: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let inserted = sqlx::query(
        "INSERT INTO votes (poll_id, option_id, voter_id, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(poll_id)
    .bind(option_id)
    .bind(voter_id)
    .bind(now_rfc3339())
    .execute(pool)
    .await;

    match inserted {
        Ok(_) => Ok(true),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(false),
        Err(e) => Err(e),
    }
}

pub async fn count_votes(pool: &AnyPool, poll_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE poll_id = ?")
        .bind(poll_id)
        .fetch_one(pool)
        .await
}

/// Per-option vote counts in option order, zero for options without votes
pub async fn tally(pool: &AnyPool, poll_id: &str) -> Result<Vec<TallyRow>, sqlx::Error> {
    sqlx::query_as::<_, TallyRow>(
        r#"
        SELECT o.id AS option_id, o.label AS label, COUNT(v.id) AS votes
        FROM poll_options o
        LEFT JOIN votes v ON v.option_id = o.id
        WHERE o.poll_id = ?
        GROUP BY o.id, o.label, o.position
        ORDER BY o.position
        "#,
    )
    .bind(poll_id)
    .fetch_all(pool)
    .await
}
