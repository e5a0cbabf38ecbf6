use anyhow::Result;
use sqlx::SqlitePool;

use crate::models::{
    DiscoveryPoint, HourlyHours, MonthArtistShare, MonthlySummary, SkipSummary, TopArtist,
    TopTrack, WeekdayHours,
};

/// Monthly listening an artist must reach to appear in the share table.
pub const SHARE_THRESHOLD_MS: i64 = 30 * 60 * 1000;

pub const DEFAULT_TOP_TRACKS: i64 = 25;
pub const DEFAULT_TOP_ARTISTS: i64 = 15;

/// New-artist discovery series: for every calendar day present in the data,
/// the number of artists whose first-seen day it is, and the running total.
/// Days on which nothing new was heard still appear with a zero count.
pub async fn new_artists_over_time(pool: &SqlitePool) -> Result<Vec<DiscoveryPoint>> {
    let rows = sqlx::query_as::<_, DiscoveryPoint>(
        r#"
        WITH first_seen AS (
          SELECT artistName, MIN(date(endTime)) AS first_date FROM listens GROUP BY artistName
        ),
        calendar AS (SELECT DISTINCT date(endTime) AS d FROM listens),
        daily AS (
          SELECT c.d, COALESCE(SUM(CASE WHEN f.first_date = c.d THEN 1 ELSE 0 END), 0) AS new_artists
          FROM calendar c LEFT JOIN first_seen f ON f.first_date = c.d
          GROUP BY c.d
        )
        SELECT d AS date, new_artists,
               SUM(new_artists) OVER (ORDER BY d ROWS UNBOUNDED PRECEDING) AS cumulative_artists
        FROM daily ORDER BY date
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Hours listened per weekday, ordered Sunday first.
pub async fn hours_by_weekday(pool: &SqlitePool) -> Result<Vec<WeekdayHours>> {
    let rows = sqlx::query_as::<_, WeekdayHours>(
        r#"
        SELECT CASE strftime('%w', endTime)
            WHEN '0' THEN 'Sun' WHEN '1' THEN 'Mon' WHEN '2' THEN 'Tue'
            WHEN '3' THEN 'Wed' WHEN '4' THEN 'Thu' WHEN '5' THEN 'Fri'
            WHEN '6' THEN 'Sat' END AS weekday,
            ROUND(SUM(msPlayed) / 3600000.0, 2) AS hours_listened
        FROM listens
        GROUP BY strftime('%w', endTime)
        ORDER BY strftime('%w', endTime)
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Hours listened per hour of day (0-23).
pub async fn hours_by_hour(pool: &SqlitePool) -> Result<Vec<HourlyHours>> {
    let rows = sqlx::query_as::<_, HourlyHours>(
        r#"
        SELECT CAST(strftime('%H', endTime) AS INTEGER) AS hour,
               ROUND(SUM(msPlayed) / 3600000.0, 2) AS hours_listened
        FROM listens GROUP BY hour ORDER BY hour
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Per-month totals: hours listened, distinct artists, distinct tracks.
pub async fn monthly_summary(pool: &SqlitePool) -> Result<Vec<MonthlySummary>> {
    let rows = sqlx::query_as::<_, MonthlySummary>(
        r#"
        SELECT strftime('%Y-%m', endTime) AS month,
               ROUND(SUM(msPlayed) / 3600000.0, 2) AS hours_listened,
               COUNT(DISTINCT artistName) AS unique_artists,
               COUNT(DISTINCT trackName) AS unique_tracks
        FROM listens GROUP BY month ORDER BY month
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Artist share of each month's listening. The month total in the
/// denominator covers every artist, but only artists with at least
/// 30 minutes in the month are reported.
pub async fn monthly_artist_share(pool: &SqlitePool) -> Result<Vec<MonthArtistShare>> {
    let rows = sqlx::query_as::<_, MonthArtistShare>(
        r#"
        WITH month_artist AS (
          SELECT strftime('%Y-%m', endTime) AS month, artistName, SUM(msPlayed) AS ms_month_artist
          FROM listens GROUP BY month, artistName
        ),
        month_total AS (
          SELECT month, SUM(ms_month_artist) AS ms_month_total FROM month_artist GROUP BY month
        )
        SELECT m.month, m.artistName,
               ROUND(100.0 * m.ms_month_artist / t.ms_month_total, 1) AS month_share_pct
        FROM month_artist m
        JOIN month_total t USING(month)
        WHERE m.ms_month_artist >= ?
        ORDER BY m.month, month_share_pct DESC
        "#,
    )
    .bind(SHARE_THRESHOLD_MS)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Most-listened tracks by hours, ties broken by play count.
pub async fn top_tracks(pool: &SqlitePool, limit: i64) -> Result<Vec<TopTrack>> {
    let rows = sqlx::query_as::<_, TopTrack>(
        r#"
        SELECT trackName, artistName,
               ROUND(SUM(msPlayed) / 3600000.0, 2) AS hours_listened,
               COUNT(*) AS plays
        FROM listens
        GROUP BY trackName, artistName
        ORDER BY hours_listened DESC, plays DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Most-listened artists by hours, ties broken by play count.
pub async fn top_artists(pool: &SqlitePool, limit: i64) -> Result<Vec<TopArtist>> {
    let rows = sqlx::query_as::<_, TopArtist>(
        r#"
        SELECT artistName,
               ROUND(SUM(msPlayed) / 3600000.0, 2) AS hours_listened,
               COUNT(*) AS plays
        FROM listens
        GROUP BY artistName
        ORDER BY hours_listened DESC, plays DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Dataset-wide skip proxy: plays cut short of 30s and 60s.
pub async fn skip_summary(pool: &SqlitePool) -> Result<SkipSummary> {
    let row = sqlx::query_as::<_, SkipSummary>(
        r#"
        SELECT
          COUNT(*) AS total_plays,
          COALESCE(SUM(CASE WHEN msPlayed < 30000 THEN 1 ELSE 0 END), 0) AS plays_under_30s,
          COALESCE(ROUND(100.0 * SUM(CASE WHEN msPlayed < 30000 THEN 1 ELSE 0 END) / COUNT(*), 1), 0.0) AS pct_under_30s,
          COALESCE(SUM(CASE WHEN msPlayed < 60000 THEN 1 ELSE 0 END), 0) AS plays_under_60s,
          COALESCE(ROUND(100.0 * SUM(CASE WHEN msPlayed < 60000 THEN 1 ELSE 0 END) / COUNT(*), 1), 0.0) AS pct_under_60s
        FROM listens
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(row)
}
