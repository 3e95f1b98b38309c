// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Health check response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall health status ("ok" or "degraded").
    pub status: String,
    /// Individual health checks and their results.
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Whether the service process is running.
    pub service: String,
    /// Session store reachability.
    pub session_store: String,
    /// Data directory availability (persistent store only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// JWKS (authentication keys) status.
    /// Only present when JWKS_URL is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks: Option<String>,
    /// JSON-RPC endpoint status. Only present when RPC_URL is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc: Option<String>,
}

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

fn label(ok: bool, failure: &str) -> String {
    if ok { "ok" } else { failure }.to_string()
}

async fn check_session_store(state: &AppState) -> String {
    label(state.store.get("health-probe").await.is_ok(), "unavailable")
}

fn check_data_dir(state: &AppState) -> Option<String> {
    state
        .data_dir
        .as_ref()
        .map(|dir| label(dir.exists(), "missing"))
}

async fn check_jwks(state: &AppState) -> Option<String> {
    let authenticator = state.auth.authenticator.as_ref()?;
    let jwks = authenticator.jwks();
    if !jwks.is_configured() {
        return None;
    }
    if jwks.is_cached().await {
        return Some("ok".to_string());
    }
    Some(label(jwks.key_set().await.is_ok(), "unavailable"))
}

async fn check_rpc(state: &AppState) -> Option<String> {
    let rpc = state.rpc.as_ref()?;
    Some(label(rpc.chain_id().await.is_ok(), "unavailable"))
}

fn is_ok(check: &Option<String>) -> bool {
    check.as_deref().map(|s| s == "ok").unwrap_or(true)
}

/// Health check endpoint handler.
///
/// Returns 200 if all checks pass, 503 if any check fails.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = ReadyResponse),
        (status = 503, description = "Service is unhealthy", body = ReadyResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let session_store = check_session_store(&state).await;
    let data_dir = check_data_dir(&state);
    let (jwks, rpc) = tokio::join!(check_jwks(&state), check_rpc(&state));

    let all_ok = session_store == "ok" && is_ok(&data_dir) && is_ok(&jwks) && is_ok(&rpc);

    let response = ReadyResponse {
        status: if all_ok { "ok" } else { "degraded" }.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            session_store,
            data_dir,
            jwks,
            rpc,
        },
    };

    let status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(response))
}

/// Liveness probe handler.
///
/// Always returns 200 if the process is running.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness probe handler.
///
/// Returns 200 only if all dependencies are available.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse),
        (status = 503, description = "Service is not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(state: State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    health(state).await
}
