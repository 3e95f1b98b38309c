// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::{
    auth::Auth,
    confirmation::ConfirmationRequest,
    error::{ApiError, ApiJson},
    sessions::{ChainType, NewSession, SessionStatus, SessionType, TransactionSession},
    state::AppState,
};

/// Body of `POST /v1/sessions`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub session_type: SessionType,
    #[serde(default)]
    pub chain_type: ChainType,
    /// Defaults to the configured CHAIN_ID
    #[serde(default)]
    pub chain_id: Option<u64>,
    /// Domain data handed to the hook on confirmation
    #[schema(value_type = Object)]
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Body of the confirmation endpoint.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmSessionRequest {
    pub transaction_hash: String,
    #[serde(default)]
    pub contract_address: Option<String>,
    /// `confirmed` or `failed`
    pub status: SessionStatus,
    /// Personal-sign signature of `Confirm session <id> with transaction <hash>`
    #[serde(default)]
    pub signature: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmSessionResponse {
    pub status: SessionStatus,
    pub session_id: String,
    pub session_type: SessionType,
    pub transaction_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
}

#[utoipa::path(
    post,
    path = "/v1/sessions",
    request_body = CreateSessionRequest,
    tag = "Sessions",
    security(("bearer" = [])),
    responses(
        (status = 201, body = TransactionSession),
        (status = 400, description = "Malformed request"),
        (status = 401, description = "Missing or invalid bearer token")
    )
)]
pub async fn create_session(
    State(state): State<AppState>,
    Auth(identity): Auth,
    ApiJson(request): ApiJson<CreateSessionRequest>,
) -> Result<(StatusCode, Json<TransactionSession>), ApiError> {
    let defaults = state.session_defaults;
    let session = TransactionSession::new(
        NewSession {
            session_type: request.session_type,
            chain_type: request.chain_type,
            chain_id: request.chain_id.unwrap_or(defaults.chain_id),
            payload: request.payload,
        },
        defaults.ttl,
        state.clock.now(),
    );

    state.store.create(session.clone()).await?;

    info!(
        session_id = %session.id,
        session_type = %session.session_type,
        chain_id = session.chain_id,
        subject = %identity.subject,
        "Created transaction session"
    );

    Ok((StatusCode::CREATED, Json(session)))
}

#[utoipa::path(
    get,
    path = "/v1/sessions/{session_id}",
    params(
        ("session_id" = String, Path, description = "Session identifier")
    ),
    tag = "Sessions",
    responses(
        (status = 200, body = TransactionSession),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn get_session(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<TransactionSession>, ApiError> {
    let session = state
        .store
        .get(&session_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("session not found: {session_id}")))?;

    Ok(Json(session.observed_at(state.clock.now())))
}

#[utoipa::path(
    post,
    path = "/v1/sessions/{session_type}/{session_id}/confirm",
    params(
        ("session_type" = String, Path, description = "Expected session type, e.g. `deploy`"),
        ("session_id" = String, Path, description = "Session identifier")
    ),
    request_body = ConfirmSessionRequest,
    tag = "Sessions",
    responses(
        (status = 200, body = ConfirmSessionResponse),
        (status = 400, description = "Invalid report or session type mismatch"),
        (status = 401, description = "Ownership proof missing or invalid"),
        (status = 404, description = "Unknown or expired session"),
        (status = 409, description = "Session is not pending"),
        (status = 422, description = "Transaction or payload rejected"),
        (status = 502, description = "RPC endpoint failure")
    )
)]
pub async fn confirm_session(
    Path((session_type, session_id)): Path<(String, String)>,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ConfirmSessionRequest>,
) -> Result<Json<ConfirmSessionResponse>, ApiError> {
    let outcome = state
        .confirmations
        .confirm(ConfirmationRequest {
            session_id,
            session_type,
            transaction_hash: request.transaction_hash,
            contract_address: request.contract_address,
            status: request.status,
            signature: request.signature,
        })
        .await?;

    let session = outcome.session;
    Ok(Json(ConfirmSessionResponse {
        status: session.status,
        session_id: session.id,
        session_type: session.session_type,
        transaction_hash: session.transaction_hash.unwrap_or_default(),
        contract_address: session.contract_address,
    }))
}
