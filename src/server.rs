use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use indicatif::ProgressBar;
use serde::Deserialize;
use serde_json::json;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::config::ProfileName;
use crate::pipeline::{self, RunOptions, RunSummary};
use crate::search::SearchSource;
use crate::store::JobStore;

// ── Run guard ──

/// At most one run at a time across all triggers.
#[derive(Clone, Default)]
pub struct RunGuard {
    busy: Arc<AtomicBool>,
}

/// Held for the duration of a run. Dropping it frees the guard.
pub struct RunPermit {
    busy: Arc<AtomicBool>,
}

impl RunGuard {
    pub fn try_acquire(&self) -> Option<RunPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunPermit {
                busy: Arc::clone(&self.busy),
            })
    }

    #[cfg(test)]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

// ── Triggers ──

/// A profile bound to the search client that serves it.
pub struct Trigger {
    pub name: ProfileName,
    pub options: RunOptions,
    pub search: Arc<dyn SearchSource>,
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn JobStore>,
    pub filtered: Arc<Trigger>,
    pub general: Arc<Trigger>,
    pub guard: RunGuard,
}

impl AppState {
    async fn execute(&self, trigger: &Trigger) -> Result<RunSummary> {
        info!("Starting {} scrape", trigger.name);
        pipeline::run(
            trigger.search.as_ref(),
            self.store.as_ref(),
            &trigger.options,
            &ProgressBar::hidden(),
        )
        .await
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/scrape", post(scrape_filtered))
        .route("/api/scrape/general", post(scrape_general))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

#[derive(Debug, Default, Deserialize)]
struct TriggerParams {
    #[serde(default)]
    wait: bool,
}

async fn scrape_filtered(State(state): State<AppState>, Query(params): Query<TriggerParams>) -> Response {
    let trigger = Arc::clone(&state.filtered);
    start(state, trigger, params.wait).await
}

async fn scrape_general(State(state): State<AppState>, Query(params): Query<TriggerParams>) -> Response {
    let trigger = Arc::clone(&state.general);
    start(state, trigger, params.wait).await
}

async fn start(state: AppState, trigger: Arc<Trigger>, wait: bool) -> Response {
    let Some(permit) = state.guard.try_acquire() else {
        warn!("Rejected {} scrape: a run is already in progress", trigger.name);
        return failure(StatusCode::CONFLICT, "A scrape is already in progress".to_string());
    };

    if wait {
        let result = state.execute(&trigger).await;
        drop(permit);
        return match result {
            Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
            Err(e) => {
                error!("{} scrape failed: {:#}", trigger.name, e);
                failure(StatusCode::INTERNAL_SERVER_ERROR, format!("{e:#}"))
            }
        };
    }

    let message = format!("{} scrape started", trigger.name);
    tokio::spawn(async move {
        let _permit = permit;
        log_outcome(trigger.name, state.execute(&trigger).await);
    });
    (StatusCode::ACCEPTED, Json(json!({ "success": true, "message": message }))).into_response()
}

fn failure(status: StatusCode, error: String) -> Response {
    (status, Json(json!({ "success": false, "error": error }))).into_response()
}

fn log_outcome(name: ProfileName, result: Result<RunSummary>) {
    match result {
        Ok(s) => info!(
            "{} scrape completed: {} fetched, {} new",
            name, s.total_fetched, s.new_jobs_added
        ),
        Err(e) => error!("{} scrape failed: {:#}", name, e),
    }
}

/// Runs the filtered profile every `every`, skipping ticks while another run holds the guard.
pub async fn schedule(state: AppState, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // first tick fires immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let Some(_permit) = state.guard.try_acquire() else {
            warn!("Skipping scheduled scrape: a run is already in progress");
            continue;
        };
        let trigger = Arc::clone(&state.filtered);
        log_outcome(trigger.name, state.execute(&trigger).await);
    }
}

/// Serve the HTTP triggers, plus the scheduler when an interval is given.
pub async fn serve(state: AppState, addr: &str, every: Option<Duration>) -> Result<()> {
    if let Some(every) = every {
        info!("Scheduled scrape every {}s", every.as_secs());
        tokio::spawn(schedule(state.clone(), every));
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
