use std::path::Path;

use listen_insights::db::{self, SourceError};
use listen_insights::models::ListenEvent;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

async fn raw_db(path: &Path, schema: &str) {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();
    sqlx::query(schema).execute(&pool).await.unwrap();
    pool.close().await;
}

fn event(end_time: &str, artist: &str, track: &str, ms: i64) -> ListenEvent {
    ListenEvent {
        end_time: end_time.to_string(),
        artist_name: artist.to_string(),
        track_name: track.to_string(),
        ms_played: ms,
    }
}

#[tokio::test]
async fn missing_file_is_reported_as_missing_source() {
    let dir = tempfile::tempdir().unwrap();
    let err = db::open_source(&dir.path().join("nope.db"))
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::Missing(_)));
}

#[tokio::test]
async fn database_without_listens_table_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("other.db");
    raw_db(&path, "CREATE TABLE something_else (id INTEGER)").await;

    let err = db::open_source(&path).await.unwrap_err();
    assert!(matches!(err, SourceError::MissingTable));
}

#[tokio::test]
async fn listens_table_with_missing_columns_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.db");
    raw_db(
        &path,
        "CREATE TABLE listens (endTime TEXT, artistName TEXT, trackName TEXT)",
    )
    .await;

    let err = db::open_source(&path).await.unwrap_err();
    match err {
        SourceError::MissingColumns(cols) => assert!(cols.contains("msPlayed")),
        other => panic!("expected MissingColumns, got {other:?}"),
    }
}

#[tokio::test]
async fn built_database_validates_and_holds_every_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db").join("spotify.db");

    let events = vec![
        event("2024-01-01 10:00", "A", "t1", 1_800_000),
        event("2024-01-01 10:00", "A", "t1", 1_800_000),
        event("2024-01-02 11:00", "B", "t2", 600_000),
    ];

    db::build_database(&path, &events).await.unwrap();

    let pool = db::open_source(&path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM listens")
        .fetch_one(&pool)
        .await
        .unwrap();
    // Duplicates are independent plays and must all survive the load.
    assert_eq!(count, events.len() as i64);
    pool.close().await;
}

#[tokio::test]
async fn rebuilding_replaces_the_previous_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("spotify.db");

    db::build_database(
        &path,
        &[
            event("2024-01-01 10:00", "A", "t1", 1_000),
            event("2024-01-02 10:00", "B", "t2", 2_000),
        ],
    )
    .await
    .unwrap();

    db::build_database(&path, &[event("2024-05-05 09:00", "C", "t3", 3_000)])
        .await
        .unwrap();

    let pool = db::open_source(&path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM listens")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
    pool.close().await;
}

#[tokio::test]
async fn opened_source_is_read_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("spotify.db");
    db::build_database(&path, &[event("2024-01-01 10:00", "A", "t1", 1_000)])
        .await
        .unwrap();

    let pool = db::open_source(&path).await.unwrap();
    let result = sqlx::query(
        "INSERT INTO listens (endTime, artistName, trackName, msPlayed) VALUES ('x', 'y', 'z', 1)",
    )
    .execute(&pool)
    .await;
    assert!(result.is_err());
    pool.close().await;
}
