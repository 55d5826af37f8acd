//! REST API endpoint handlers for the Observer server.
//!
//! All read handlers serve the latest [`EventStreamSnapshot`] held in the
//! shared [`AppState`]; none of them touch the simulator itself.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/snapshot` | Latest full snapshot |
//! | `GET` | `/api/regions` | Region table |
//! | `GET` | `/api/regions/{id}` | One region with its tallies |
//! | `GET` | `/api/totals` | Session totals per category |
//! | `GET` | `/api/leaderboard` | Top regions by combined total |
//! | `GET` | `/api/log` | Combined or per-feed recent log |
//! | `GET` | `/api/status` | Run status |
//! | `POST` | `/api/operator/stop` | Request a clean stop |
//!
//! [`EventStreamSnapshot`]: vitalmap_types::EventStreamSnapshot

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse};
use vitalmap_core::control::{RunControl, SimulationEndReason};
use vitalmap_core::totals::rank_regions;
use vitalmap_types::{Feed, LogEntry, RegionId};

use crate::error::ObserverError;
use crate::state::AppState;

/// Leaderboard size when `limit` is not given.
const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

/// Largest accepted leaderboard `limit`.
const MAX_LEADERBOARD_LIMIT: usize = 100;

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

/// Query parameters for the `GET /api/leaderboard` endpoint.
#[derive(Debug, serde::Deserialize)]
pub struct LeaderboardQuery {
    /// Number of regions to return (default 10, 1 to 100).
    pub limit: Option<usize>,
}

/// Query parameters for the `GET /api/log` endpoint.
#[derive(Debug, serde::Deserialize)]
pub struct LogQuery {
    /// `birth` or `death`; the combined log when absent.
    pub feed: Option<String>,
}

/// Body of `GET /api/status`.
#[derive(Debug, serde::Serialize)]
pub struct StatusResponse {
    /// Tick of the latest snapshot (0 before the first tick).
    pub tick: u64,
    /// Number of live events in the latest snapshot.
    pub live_events: usize,
    /// Whether a stop has been requested.
    pub stop_requested: bool,
    /// Why the run ended, if it has.
    pub end_reason: Option<SimulationEndReason>,
    /// Seconds since the run started.
    pub elapsed_seconds: Option<u64>,
    /// Configured maximum ticks (0 = unlimited).
    pub max_ticks: Option<u64>,
    /// Configured maximum real-time seconds (0 = unlimited).
    pub max_real_time_seconds: Option<u64>,
    /// RFC 3339 start time of the run.
    pub started_at: Option<String>,
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing the latest totals and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.latest().await;
    let tick = snapshot.as_ref().map_or(0, |s| s.tick);
    let live = snapshot.as_ref().map_or(0, |s| s.live_events.len());
    let region_count = state.regions.len();

    let metrics: String = snapshot
        .as_deref()
        .map(|snapshot| {
            let live_by_feed = [Feed::Birth, Feed::Death].into_iter().map(|feed| {
                metric_card(
                    &format!("Live {feed}s"),
                    &snapshot.live_events_on(feed).count().to_string(),
                    None,
                )
            });
            let totals = snapshot.totals.iter().map(|(category, count)| {
                metric_card(
                    category.as_str(),
                    &count.to_string(),
                    Some(&category.color().to_hex()),
                )
            });
            live_by_feed.chain(totals).collect()
        })
        .unwrap_or_default();

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Vitalmap Observer</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        a:hover {{ text-decoration: underline; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        hr {{ border: none; border-top: 1px solid #30363d; margin: 1.5rem 0; }}
    </style>
</head>
<body>
    <h1>Vitalmap Observer</h1>
    <p class="subtitle">Simulated birth and death event stream</p>

    <div>
        <div class="metric">
            <div class="label">Tick</div>
            <div class="value">{tick}</div>
        </div>
        <div class="metric">
            <div class="label">Live events</div>
            <div class="value">{live}</div>
        </div>
        <div class="metric">
            <div class="label">Regions</div>
            <div class="value">{region_count}</div>
        </div>{metrics}
    </div>

    <hr>

    <h2>API Endpoints</h2>
    <ul>
        <li>GET <a href="/api/snapshot">/api/snapshot</a> -- Latest snapshot</li>
        <li>GET <a href="/api/regions">/api/regions</a> -- Region table</li>
        <li>GET <a href="/api/totals">/api/totals</a> -- Totals per category</li>
        <li>GET <a href="/api/leaderboard">/api/leaderboard</a> -- Top regions (?limit=N)</li>
        <li>GET <a href="/api/log">/api/log</a> -- Recent log (?feed=birth|death)</li>
        <li>GET <a href="/api/status">/api/status</a> -- Run status</li>
        <li>POST /api/operator/stop -- Stop the run</li>
    </ul>

    <h2>WebSocket</h2>
    <ul>
        <li><code>ws://host:port/ws/snapshots</code> -- Live snapshot stream</li>
    </ul>
</body>
</html>"#
    ))
}

/// One metric tile of the status page.
fn metric_card(label: &str, value: &str, color: Option<&str>) -> String {
    let style = color.map(|c| format!(r#" style="color: {c}""#)).unwrap_or_default();
    format!(
        r#"
        <div class="metric">
            <div class="label">{label}</div>
            <div class="value"{style}>{value}</div>
        </div>"#
    )
}

// ---------------------------------------------------------------------------
// GET /api/snapshot
// ---------------------------------------------------------------------------

/// Return the latest snapshot, or 404 before the first tick.
pub async fn get_snapshot(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let snapshot = state
        .latest()
        .await
        .ok_or_else(|| ObserverError::NotFound("no snapshot yet".to_owned()))?;
    Ok(Json(serde_json::to_value(&*snapshot)?))
}

// ---------------------------------------------------------------------------
// GET /api/regions, GET /api/regions/{id}
// ---------------------------------------------------------------------------

/// List the region table in table order.
pub async fn list_regions(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "count": state.regions.len(),
        "regions": &*state.regions,
    }))
}

/// Return one region together with its tallies from the latest snapshot.
pub async fn get_region(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let region_id = RegionId::new(id);
    let region = state
        .regions
        .iter()
        .find(|r| r.id == region_id)
        .ok_or_else(|| ObserverError::NotFound(format!("region {region_id}")))?;

    let snapshot = state.latest().await;
    let tally = snapshot
        .as_ref()
        .and_then(|s| s.region_totals.iter().find(|t| t.region_id == region_id));

    Ok(Json(serde_json::json!({
        "region": serde_json::to_value(region)?,
        "tally": serde_json::to_value(tally)?,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/totals
// ---------------------------------------------------------------------------

/// Return session totals per category.
pub async fn get_totals(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.latest().await;
    match snapshot {
        Some(s) => Json(serde_json::json!({ "tick": s.tick, "totals": s.totals })),
        None => Json(serde_json::json!({ "tick": 0, "totals": {} })),
    }
}

// ---------------------------------------------------------------------------
// GET /api/leaderboard
// ---------------------------------------------------------------------------

/// Return the regions with the highest combined totals.
///
/// # Query Parameters
///
/// - `limit`: number of regions, 1 to 100 (default 10).
pub async fn leaderboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LeaderboardQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    let limit = params.limit.unwrap_or(DEFAULT_LEADERBOARD_LIMIT);
    if !(1..=MAX_LEADERBOARD_LIMIT).contains(&limit) {
        return Err(ObserverError::InvalidQuery(format!(
            "limit must be between 1 and {MAX_LEADERBOARD_LIMIT}, got {limit}"
        )));
    }

    let tallies = state
        .latest()
        .await
        .map(|s| s.region_totals.clone())
        .unwrap_or_default();
    let ranked = rank_regions(tallies, limit);

    Ok(Json(serde_json::json!({
        "count": ranked.len(),
        "regions": ranked,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/log
// ---------------------------------------------------------------------------

/// Return the combined recent log, or one feed's log.
///
/// # Query Parameters
///
/// - `feed`: `birth` or `death` (plural forms accepted).
pub async fn get_log(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LogQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    let feed = params
        .feed
        .as_deref()
        .map(str::parse::<Feed>)
        .transpose()
        .map_err(|e| ObserverError::InvalidQuery(e.to_string()))?;

    let snapshot = state.latest().await;
    let entries: Vec<LogEntry> = match (&snapshot, feed) {
        (Some(s), Some(feed)) => s.feed_logs.get(&feed).cloned().unwrap_or_default(),
        (Some(s), None) => s.recent_log.clone(),
        (None, _) => Vec::new(),
    };

    Ok(Json(serde_json::json!({
        "feed": feed.map_or("all", Feed::as_str),
        "count": entries.len(),
        "entries": entries,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/status
// ---------------------------------------------------------------------------

/// Return tick, live event count, and run control status.
pub async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.latest().await;
    let control = state.control.as_deref();

    let end_reason = match control {
        Some(c) => c.end_reason().await,
        None => None,
    };

    Json(StatusResponse {
        tick: snapshot.as_ref().map_or(0, |s| s.tick),
        live_events: snapshot.as_ref().map_or(0, |s| s.live_events.len()),
        stop_requested: control.is_some_and(RunControl::is_stop_requested),
        end_reason,
        elapsed_seconds: control.map(RunControl::elapsed_seconds),
        max_ticks: control.map(RunControl::max_ticks),
        max_real_time_seconds: control.map(RunControl::max_real_time_seconds),
        started_at: control.map(|c| c.started_at().to_rfc3339()),
    })
}

// ---------------------------------------------------------------------------
// POST /api/operator/stop
// ---------------------------------------------------------------------------

/// Request a clean stop of the driver loop.
///
/// The loop finishes its current tick and exits; the HTTP server keeps
/// serving the final snapshot.
pub async fn stop(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ObserverError> {
    let control = state
        .control
        .as_ref()
        .ok_or_else(|| ObserverError::Unavailable("run control not available".to_owned()))?;

    control.request_stop();
    tracing::info!("Operator requested stop via API");

    Ok(Json(serde_json::json!({
        "ok": true,
        "message": "Stop requested",
    })))
}
