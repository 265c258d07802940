//! Read-only HTTP surface.
//!
//! Thin observation layer over the engine singletons: a health probe, the
//! scheduler clock, and world/cache statistics. Every endpoint except
//! `/healthz` requires the static `x-api-key` header. Reads lock the world
//! or scheduler briefly between ticks; nothing here mutates simulation
//! state.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::info;

use crate::chunk::CacheStats;
use crate::config::WorldConfigSummary;
use crate::engine;
use crate::error::EngineError;
use crate::scheduler::CalendarTime;

const API_KEY_HEADER: &str = "x-api-key";

#[derive(Clone)]
struct AppState {
    api_key: Arc<String>,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    running: bool,
    step_number: u64,
    total_minutes: u64,
    calendar: CalendarTime,
}

#[derive(Debug, Serialize)]
struct WorldStatsResponse {
    seed: u32,
    config: WorldConfigSummary,
    sea_level_bias_m: f64,
    ocean_fraction: f64,
    cache: CacheStats,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn router(api_key: String) -> Router {
    let state = AppState {
        api_key: Arc::new(api_key),
    };
    Router::new()
        .route("/healthz", get(healthz))
        .route("/status", get(status))
        .route("/world/stats", get(world_stats))
        .with_state(state)
}

/// Bind and serve until the task is cancelled.
pub async fn serve(addr: SocketAddr, api_key: String) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "http surface listening");
    axum::serve(listener, router(api_key)).await
}

fn authorized(state: &AppState, headers: &HeaderMap) -> bool {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|presented| presented == state.api_key.as_str())
        .unwrap_or(false)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn map_engine_error(err: EngineError) -> axum::response::Response {
    match err {
        EngineError::NotInitialized(what) => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            format!("{what} is not initialized"),
        ),
        other => error_response(StatusCode::BAD_REQUEST, other.to_string()),
    }
}

async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}

async fn status(State(state): State<AppState>, headers: HeaderMap) -> axum::response::Response {
    if !authorized(&state, &headers) {
        return error_response(StatusCode::UNAUTHORIZED, "missing or invalid api key");
    }
    match engine::engine_status() {
        Ok(status) => Json(StatusResponse {
            running: status.running,
            step_number: status.step_number,
            total_minutes: status.game_time.total_minutes,
            calendar: status.game_time.calendar(),
        })
        .into_response(),
        Err(err) => map_engine_error(err),
    }
}

async fn world_stats(State(state): State<AppState>, headers: HeaderMap) -> axum::response::Response {
    if !authorized(&state, &headers) {
        return error_response(StatusCode::UNAUTHORIZED, "missing or invalid api key");
    }
    match engine::world() {
        Ok(world) => {
            let world = world.lock().expect("world lock");
            Json(WorldStatsResponse {
                seed: world.seed(),
                config: world.summary(),
                sea_level_bias_m: world.sea_level_bias_m(),
                ocean_fraction: world.ocean_fraction(),
                cache: world.cache_stats(),
            })
            .into_response()
        }
        Err(err) => map_engine_error(err),
    }
}
