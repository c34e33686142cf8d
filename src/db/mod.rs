//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for all application data.

mod repository;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run embedded migrations
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meta (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            schema_version INTEGER NOT NULL DEFAULT 1,
            revision_id INTEGER NOT NULL DEFAULT 0,
            generated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        INSERT OR IGNORE INTO meta (id, schema_version, revision_id, generated_at)
        VALUES (1, 1, 0, datetime('now'));
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS members (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            email TEXT,
            is_admin INTEGER NOT NULL DEFAULT 0,
            is_temporary INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS books (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            author TEXT NOT NULL,
            year TEXT,
            country TEXT,
            original_language TEXT,
            type TEXT,
            introduction TEXT,
            added_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meets (
            id TEXT PRIMARY KEY,
            host_id TEXT NOT NULL,
            phase TEXT NOT NULL DEFAULT 'draft',
            selected_book_id TEXT,
            selected_date TEXT,
            location TEXT,
            description TEXT,
            voting_points_revealed INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meet_candidates (
            id TEXT PRIMARY KEY,
            meet_id TEXT NOT NULL,
            book_id TEXT NOT NULL,
            motivation TEXT,
            added_by TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meet_candidate_votes (
            id TEXT PRIMARY KEY,
            meet_id TEXT NOT NULL,
            candidate_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            points INTEGER NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meet_date_options (
            id TEXT PRIMARY KEY,
            meet_id TEXT NOT NULL,
            date_time TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meet_date_votes (
            id TEXT PRIMARY KEY,
            date_option_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            availability TEXT NOT NULL DEFAULT 'no_response'
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meet_top5 (
            id TEXT PRIMARY KEY,
            meet_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            book_id TEXT NOT NULL,
            rank INTEGER NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Unique constraints acting as the serialization boundary for per-member
    // submissions, plus indexes for common lookups.
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_candidate_votes_candidate_user
            ON meet_candidate_votes(candidate_id, user_id);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_date_votes_option_user
            ON meet_date_votes(date_option_id, user_id);
        CREATE UNIQUE INDEX IF NOT EXISTS idx_top5_meet_user_rank
            ON meet_top5(meet_id, user_id, rank);
        CREATE INDEX IF NOT EXISTS idx_candidates_meet ON meet_candidates(meet_id);
        CREATE INDEX IF NOT EXISTS idx_candidate_votes_meet ON meet_candidate_votes(meet_id);
        CREATE INDEX IF NOT EXISTS idx_date_options_meet ON meet_date_options(meet_id);
        CREATE INDEX IF NOT EXISTS idx_top5_meet ON meet_top5(meet_id);
        CREATE INDEX IF NOT EXISTS idx_meets_phase ON meets(phase);
        CREATE INDEX IF NOT EXISTS idx_books_title ON books(title);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
