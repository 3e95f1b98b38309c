// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::blockchain::{RpcError, SignatureError};
use crate::confirmation::ConfirmError;
use crate::hooks::HookError;
use crate::sessions::StoreError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<SignatureError> for ApiError {
    fn from(e: SignatureError) -> Self {
        ApiError::bad_request(e.to_string())
    }
}

impl From<RpcError> for ApiError {
    fn from(e: RpcError) -> Self {
        tracing::warn!(error = %e, "RPC request failed");
        match e {
            RpcError::Timeout(_) => ApiError::new(StatusCode::GATEWAY_TIMEOUT, "RPC request timed out"),
            RpcError::InvalidRpcUrl(_) => ApiError::internal("RPC endpoint is misconfigured"),
            other => ApiError::bad_gateway(other.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => ApiError::not_found(format!("session not found: {id}")),
            StoreError::Expired(_) => ApiError::not_found(e.to_string()),
            StoreError::NotPending(_) | StoreError::AlreadyExists(_) => {
                ApiError::conflict(e.to_string())
            }
            other => {
                tracing::error!(error = %other, "Session store failure");
                ApiError::internal("session store unavailable")
            }
        }
    }
}

impl From<ConfirmError> for ApiError {
    fn from(e: ConfirmError) -> Self {
        match e {
            ConfirmError::UnknownSessionType(_)
            | ConfirmError::TypeMismatch { .. }
            | ConfirmError::InvalidStatus(_)
            | ConfirmError::Validation(_) => ApiError::bad_request(e.to_string()),
            ConfirmError::NotFound(_) | ConfirmError::Expired(_) => {
                ApiError::not_found(e.to_string())
            }
            ConfirmError::NotPending(_) => ApiError::conflict(e.to_string()),
            ConfirmError::OwnershipProofRequired | ConfirmError::OwnershipMismatch => {
                ApiError::unauthorized(e.to_string())
            }
            ConfirmError::TransactionNotFound(_) => ApiError::unprocessable(e.to_string()),
            ConfirmError::Upstream(rpc) => ApiError::from(rpc),
            ConfirmError::Store(store) => ApiError::from(store),
            ConfirmError::RpcNotConfigured => {
                tracing::error!("Ownership proof submitted but RPC_URL is not configured");
                ApiError::internal(e.to_string())
            }
            ConfirmError::Hook(hook) => match hook {
                HookError::InvalidPayload(_) => ApiError::unprocessable(hook.to_string()),
                other => {
                    tracing::error!(error = %other, "Hook dispatch failed");
                    ApiError::internal(other.to_string())
                }
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

/// `Json` extractor whose rejections use the API error body and status 400.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
