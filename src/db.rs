use std::path::{Path, PathBuf};

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;

use crate::models::ListenEvent;

/// Columns the `listens` table must carry before any query runs.
pub const REQUIRED_COLUMNS: [&str; 4] = ["endTime", "artistName", "trackName", "msPlayed"];

pub const CREATE_LISTENS_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS listens (
    endTime    TEXT    NOT NULL,
    artistName TEXT    NOT NULL,
    trackName  TEXT    NOT NULL,
    msPlayed   INTEGER NOT NULL
)
"#;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no listening database found at {}", .0.display())]
    Missing(PathBuf),
    #[error("database has no `listens` table")]
    MissingTable,
    #[error("`listens` table is missing required columns: {0}")]
    MissingColumns(String),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// Open a listening database read-only and verify its schema before
/// handing it to the query layer. Validation failures surface here,
/// not deep inside an aggregation.
pub async fn open_source(path: &Path) -> Result<SqlitePool, SourceError> {
    if !path.exists() {
        return Err(SourceError::Missing(path.to_path_buf()));
    }

    let options = SqliteConnectOptions::new().filename(path).read_only(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;

    validate_schema(&pool).await?;

    Ok(pool)
}

/// Check that the `listens` relation exists with every required column.
pub async fn validate_schema(pool: &SqlitePool) -> Result<(), SourceError> {
    let table_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'listens')",
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Err(SourceError::MissingTable);
    }

    let columns: Vec<String> = sqlx::query_scalar("SELECT name FROM pragma_table_info('listens')")
        .fetch_all(pool)
        .await?;

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|required| !columns.iter().any(|have| have == required))
        .collect();

    if !missing.is_empty() {
        return Err(SourceError::MissingColumns(missing.join(", ")));
    }

    Ok(())
}

/// Build a fresh listening database from the given events and atomically
/// replace whatever sits at `target`. The new file is assembled at a
/// sibling temp path so an open reader never observes a half-written db.
pub async fn build_database(target: &Path, events: &[ListenEvent]) -> Result<()> {
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let tmp = target.with_extension("db.tmp");
    match tokio::fs::remove_file(&tmp).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    let options = SqliteConnectOptions::new()
        .filename(&tmp)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Delete);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query(CREATE_LISTENS_SQL).execute(&pool).await?;

    let mut tx = pool.begin().await?;
    for event in events {
        sqlx::query(
            "INSERT INTO listens (endTime, artistName, trackName, msPlayed) VALUES (?, ?, ?, ?)",
        )
        .bind(&event.end_time)
        .bind(&event.artist_name)
        .bind(&event.track_name)
        .bind(event.ms_played)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    pool.close().await;

    tokio::fs::rename(&tmp, target).await?;

    Ok(())
}
