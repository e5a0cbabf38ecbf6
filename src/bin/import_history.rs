use std::path::PathBuf;

use anyhow::{anyhow, Context};
use chrono::NaiveDateTime;
use listen_insights::{db, models::ListenEvent};

/// Accepted `endTime` layouts; Spotify exports use the first.
const TIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S"];

fn parseable_end_time(value: &str) -> bool {
    TIME_FORMATS
        .iter()
        .any(|fmt| NaiveDateTime::parse_from_str(value, fmt).is_ok())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter("import_history=info,listen_insights=info")
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <data-dir> [db-path]", args[0]);
        eprintln!("  <data-dir> - Directory containing StreamingHistory_music_*.json exports");
        eprintln!("  [db-path]  - Database to build (default: $LISTEN_DB or db/spotify.db)");
        return Err(anyhow!("Missing required argument: data-dir"));
    }

    let data_dir = PathBuf::from(&args[1]);
    let db_path = args
        .get(2)
        .cloned()
        .or_else(|| std::env::var("LISTEN_DB").ok())
        .unwrap_or_else(|| "db/spotify.db".to_string());
    let db_path = PathBuf::from(db_path);

    let mut files: Vec<PathBuf> = std::fs::read_dir(&data_dir)
        .with_context(|| format!("Failed to read data directory {:?}", data_dir))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map(|name| {
                    name.starts_with("StreamingHistory_music_") && name.ends_with(".json")
                })
                .unwrap_or(false)
        })
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(anyhow!(
            "No StreamingHistory_music_*.json files found in {:?}",
            data_dir
        ));
    }

    let mut events: Vec<ListenEvent> = Vec::new();
    let mut skipped = 0usize;

    for path in &files {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {:?}", path))?;
        let records: Vec<ListenEvent> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {:?} as a streaming history export", path))?;

        tracing::info!("{}: {} records", path.display(), records.len());

        for record in records {
            if record.ms_played < 0 || !parseable_end_time(&record.end_time) {
                tracing::warn!(
                    "skipping malformed record (endTime: {:?}, msPlayed: {})",
                    record.end_time,
                    record.ms_played
                );
                skipped += 1;
                continue;
            }
            events.push(record);
        }
    }

    if events.is_empty() {
        return Err(anyhow!("No valid listen events found. Nothing to import."));
    }

    tracing::info!(
        "Importing {} listen events from {} file(s) into {:?}...",
        events.len(),
        files.len(),
        db_path
    );

    db::build_database(&db_path, &events)
        .await
        .context("Failed to build listening database")?;

    if skipped > 0 {
        tracing::warn!("{} malformed records were skipped", skipped);
    }
    tracing::info!("Loaded {} rows into {:?}", events.len(), db_path);

    Ok(())
}
