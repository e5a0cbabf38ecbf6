use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use listen_insights::{db, insights};

#[derive(Parser)]
#[command(name = "insightcli")]
#[command(about = "listening insights CLI", long_about = None)]
struct Cli {
    /// Listening database to read
    #[arg(long, env = "LISTEN_DB", default_value = "db/spotify.db")]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// New artists discovered per day with the running total
    Discovery,

    /// Hours listened per weekday (Sunday first)
    Weekday,

    /// Hours listened per hour of day
    Hourly,

    /// Monthly hours, unique artists and unique tracks
    Monthly,

    /// Artist share of each month's listening (>=30 minutes)
    ArtistShare,

    /// Most-listened tracks
    TopTracks {
        /// Number of rows to show
        #[arg(short, long, default_value_t = insights::DEFAULT_TOP_TRACKS)]
        limit: i64,
    },

    /// Most-listened artists
    TopArtists {
        /// Number of rows to show
        #[arg(short, long, default_value_t = insights::DEFAULT_TOP_ARTISTS)]
        limit: i64,
    },

    /// Plays cut short of 30s and 60s
    Skips,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter("insightcli=info,listen_insights=info")
        .init();

    let cli = Cli::parse();

    let pool = db::open_source(&cli.db)
        .await
        .with_context(|| format!("Failed to open listening database {:?}", cli.db))?;

    match cli.command {
        Commands::Discovery => {
            let rows = insights::new_artists_over_time(&pool).await?;
            println!("{:<12} {:>12} {:>12}", "date", "new", "cumulative");
            for row in rows {
                println!(
                    "{:<12} {:>12} {:>12}",
                    row.date, row.new_artists, row.cumulative_artists
                );
            }
        }
        Commands::Weekday => {
            let rows = insights::hours_by_weekday(&pool).await?;
            println!("{:<8} {:>10}", "weekday", "hours");
            for row in rows {
                println!("{:<8} {:>10.2}", row.weekday, row.hours_listened);
            }
        }
        Commands::Hourly => {
            let rows = insights::hours_by_hour(&pool).await?;
            println!("{:<5} {:>10}", "hour", "hours");
            for row in rows {
                println!("{:<5} {:>10.2}", row.hour, row.hours_listened);
            }
        }
        Commands::Monthly => {
            let rows = insights::monthly_summary(&pool).await?;
            println!(
                "{:<8} {:>10} {:>15} {:>14}",
                "month", "hours", "unique artists", "unique tracks"
            );
            for row in rows {
                println!(
                    "{:<8} {:>10.2} {:>15} {:>14}",
                    row.month, row.hours_listened, row.unique_artists, row.unique_tracks
                );
            }
        }
        Commands::ArtistShare => {
            let rows = insights::monthly_artist_share(&pool).await?;
            println!("{:<8} {:<40} {:>8}", "month", "artist", "share %");
            for row in rows {
                println!(
                    "{:<8} {:<40} {:>8.1}",
                    row.month, row.artist_name, row.month_share_pct
                );
            }
        }
        Commands::TopTracks { limit } => {
            let rows = insights::top_tracks(&pool, limit).await?;
            println!("{:<40} {:<30} {:>8} {:>7}", "track", "artist", "hours", "plays");
            for row in rows {
                println!(
                    "{:<40} {:<30} {:>8.2} {:>7}",
                    row.track_name, row.artist_name, row.hours_listened, row.plays
                );
            }
        }
        Commands::TopArtists { limit } => {
            let rows = insights::top_artists(&pool, limit).await?;
            println!("{:<40} {:>8} {:>7}", "artist", "hours", "plays");
            for row in rows {
                println!(
                    "{:<40} {:>8.2} {:>7}",
                    row.artist_name, row.hours_listened, row.plays
                );
            }
        }
        Commands::Skips => {
            let s = insights::skip_summary(&pool).await?;
            println!("total plays:   {}", s.total_plays);
            println!(
                "under 30s:     {} ({:.1}%)",
                s.plays_under_30s, s.pct_under_30s
            );
            println!(
                "under 60s:     {} ({:.1}%)",
                s.plays_under_60s, s.pct_under_60s
            );
        }
    }

    Ok(())
}
