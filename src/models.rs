use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One play from a streaming-history export. `end_time` is kept as the
/// sortable text the export carries ("YYYY-MM-DD HH:MM"); all bucketing
/// happens SQL-side on that representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenEvent {
    #[serde(rename = "endTime")]
    pub end_time: String,
    #[serde(rename = "artistName")]
    pub artist_name: String,
    #[serde(rename = "trackName")]
    pub track_name: String,
    #[serde(rename = "msPlayed")]
    pub ms_played: i64,
}

/// Row of the new-artist discovery series: how many artists were heard for
/// the first time on each day, plus the running total.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DiscoveryPoint {
    pub date: String,
    pub new_artists: i64,
    pub cumulative_artists: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WeekdayHours {
    pub weekday: String,
    pub hours_listened: f64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct HourlyHours {
    pub hour: i64,
    pub hours_listened: f64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MonthlySummary {
    pub month: String,
    pub hours_listened: f64,
    pub unique_artists: i64,
    pub unique_tracks: i64,
}

/// Share of one month's listening captured by a single artist, among
/// artists that cleared the 30-minute monthly threshold.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MonthArtistShare {
    pub month: String,
    #[serde(rename = "artistName")]
    #[sqlx(rename = "artistName")]
    pub artist_name: String,
    pub month_share_pct: f64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TopTrack {
    #[serde(rename = "trackName")]
    #[sqlx(rename = "trackName")]
    pub track_name: String,
    #[serde(rename = "artistName")]
    #[sqlx(rename = "artistName")]
    pub artist_name: String,
    pub hours_listened: f64,
    pub plays: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TopArtist {
    #[serde(rename = "artistName")]
    #[sqlx(rename = "artistName")]
    pub artist_name: String,
    pub hours_listened: f64,
    pub plays: i64,
}

/// Proxy for skip behavior: how many plays ended before 30s / 60s.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SkipSummary {
    pub total_plays: i64,
    pub plays_under_30s: i64,
    pub pct_under_30s: f64,
    pub plays_under_60s: i64,
    pub pct_under_60s: f64,
}
