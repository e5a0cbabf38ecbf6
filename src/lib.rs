use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod db;
pub mod insights;
pub mod models;
pub mod ui;

use models::{
    DiscoveryPoint, HourlyHours, MonthArtistShare, MonthlySummary, SkipSummary, TopArtist,
    TopTrack, WeekdayHours,
};

/// The active data source for the session: a read-only pool plus the file
/// it was opened from. Loaded once at startup, replaced only by an
/// explicit upload.
struct Source {
    pool: SqlitePool,
    path: PathBuf,
}

#[derive(Clone)]
pub struct AppState {
    source: Arc<RwLock<Option<Source>>>,
    upload_path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct SourceStatus {
    pub connected: bool,
    pub source: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LimitQuery {
    limit: Option<i64>,
}

type ApiError = (StatusCode, String);

/// No source loaded is a prompt to upload one, not a failure.
async fn active_pool(state: &AppState) -> Result<SqlitePool, ApiError> {
    let guard = state.source.read().await;
    match guard.as_ref() {
        Some(source) => Ok(source.pool.clone()),
        None => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "no listening database loaded; upload one to begin".to_string(),
        )),
    }
}

fn query_failed(err: anyhow::Error) -> ApiError {
    tracing::error!("query failed: {err:#}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "query failed".to_string(),
    )
}

async fn get_status(State(state): State<AppState>) -> Json<SourceStatus> {
    let guard = state.source.read().await;
    Json(SourceStatus {
        connected: guard.is_some(),
        source: guard
            .as_ref()
            .map(|source| source.path.display().to_string()),
    })
}

async fn get_discovery(
    State(state): State<AppState>,
) -> Result<Json<Vec<DiscoveryPoint>>, ApiError> {
    let pool = active_pool(&state).await?;
    let rows = insights::new_artists_over_time(&pool)
        .await
        .map_err(query_failed)?;
    Ok(Json(rows))
}

async fn get_weekday(State(state): State<AppState>) -> Result<Json<Vec<WeekdayHours>>, ApiError> {
    let pool = active_pool(&state).await?;
    let rows = insights::hours_by_weekday(&pool)
        .await
        .map_err(query_failed)?;
    Ok(Json(rows))
}

async fn get_hourly(State(state): State<AppState>) -> Result<Json<Vec<HourlyHours>>, ApiError> {
    let pool = active_pool(&state).await?;
    let rows = insights::hours_by_hour(&pool).await.map_err(query_failed)?;
    Ok(Json(rows))
}

async fn get_monthly(State(state): State<AppState>) -> Result<Json<Vec<MonthlySummary>>, ApiError> {
    let pool = active_pool(&state).await?;
    let rows = insights::monthly_summary(&pool)
        .await
        .map_err(query_failed)?;
    Ok(Json(rows))
}

async fn get_artist_share(
    State(state): State<AppState>,
) -> Result<Json<Vec<MonthArtistShare>>, ApiError> {
    let pool = active_pool(&state).await?;
    let rows = insights::monthly_artist_share(&pool)
        .await
        .map_err(query_failed)?;
    Ok(Json(rows))
}

async fn get_top_tracks(
    State(state): State<AppState>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<Vec<TopTrack>>, ApiError> {
    let pool = active_pool(&state).await?;
    let limit = params.limit.unwrap_or(insights::DEFAULT_TOP_TRACKS).max(0);
    let rows = insights::top_tracks(&pool, limit)
        .await
        .map_err(query_failed)?;
    Ok(Json(rows))
}

async fn get_top_artists(
    State(state): State<AppState>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<Vec<TopArtist>>, ApiError> {
    let pool = active_pool(&state).await?;
    let limit = params.limit.unwrap_or(insights::DEFAULT_TOP_ARTISTS).max(0);
    let rows = insights::top_artists(&pool, limit)
        .await
        .map_err(query_failed)?;
    Ok(Json(rows))
}

async fn get_skips(State(state): State<AppState>) -> Result<Json<SkipSummary>, ApiError> {
    let pool = active_pool(&state).await?;
    let row = insights::skip_summary(&pool).await.map_err(query_failed)?;
    Ok(Json(row))
}

/// Accept a SQLite database file as the raw request body, validate its
/// schema, and swap it in as the session source. A rejected upload leaves
/// the current source untouched.
#[axum::debug_handler]
async fn upload_source(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SourceStatus>, ApiError> {
    if body.is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "uploaded file is empty".to_string(),
        ));
    }

    if let Some(parent) = state.upload_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                tracing::error!("failed to create upload directory: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "failed to store upload".to_string(),
                )
            })?;
        }
    }

    tokio::fs::write(&state.upload_path, &body)
        .await
        .map_err(|e| {
            tracing::error!("failed to write upload to {:?}: {}", state.upload_path, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to store upload".to_string(),
            )
        })?;

    let pool = db::open_source(&state.upload_path).await.map_err(|e| {
        tracing::warn!("rejected uploaded database: {}", e);
        (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
    })?;

    let previous = {
        let mut guard = state.source.write().await;
        guard.replace(Source {
            pool,
            path: state.upload_path.clone(),
        })
    };
    if let Some(source) = previous {
        source.pool.close().await;
    }

    tracing::info!("uploaded database connected: {:?}", state.upload_path);

    Ok(Json(SourceStatus {
        connected: true,
        source: Some(state.upload_path.display().to_string()),
    }))
}

async fn health_check() -> &'static str {
    "ok"
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(ui::serve_index))
        .route("/health", get(health_check))
        .route("/api/status", get(get_status))
        .route("/api/discovery", get(get_discovery))
        .route("/api/weekday", get(get_weekday))
        .route("/api/hourly", get(get_hourly))
        .route("/api/monthly", get(get_monthly))
        .route("/api/artist-share", get(get_artist_share))
        .route("/api/top-tracks", get(get_top_tracks))
        .route("/api/top-artists", get(get_top_artists))
        .route("/api/skips", get(get_skips))
        .route("/api/source", post(upload_source))
        // Uploads are whole SQLite files; the 2 MB default is far too small.
        .layer(DefaultBodyLimit::max(512 * 1024 * 1024))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build state from the environment: try the default database path and
/// start serving either way; a missing or bad default just means the
/// dashboard prompts for an upload.
pub async fn init_state() -> AppState {
    let db_path =
        PathBuf::from(std::env::var("LISTEN_DB").unwrap_or_else(|_| "db/spotify.db".to_string()));
    let upload_path = PathBuf::from(
        std::env::var("LISTEN_UPLOAD_DB").unwrap_or_else(|_| "db/uploaded.db".to_string()),
    );

    let source = match db::open_source(&db_path).await {
        Ok(pool) => {
            tracing::info!("connected to listening database at {:?}", db_path);
            Some(Source {
                pool,
                path: db_path,
            })
        }
        Err(db::SourceError::Missing(path)) => {
            tracing::warn!(
                "no database at {:?}, waiting for an upload to begin",
                path
            );
            None
        }
        Err(e) => {
            tracing::error!("default database rejected: {}; waiting for an upload", e);
            None
        }
    };

    AppState {
        source: Arc::new(RwLock::new(source)),
        upload_path,
    }
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "listen_insights=debug,tower_http=debug".to_string()),
        )
        .init();

    let state = init_state().await;
    let app = router(state);

    let addr: SocketAddr = std::env::var("LISTEN_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3001".to_string())
        .parse()?;
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
