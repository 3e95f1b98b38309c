// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Authentication error type.
///
/// The variants stay fine-grained for logging; clients only see one of the
/// three category codes returned by [`AuthError::error_code`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No authorization header present
    MissingToken,
    /// Header present but not `Bearer <token>`, or the token is empty
    InvalidAuthHeader,
    /// Token is not a well-formed JWT
    MalformedToken,
    /// `none`, HMAC or otherwise unaccepted signing algorithm
    UnsupportedAlgorithm(String),
    /// Token signature is invalid
    InvalidSignature,
    /// Token has expired (or carries no `exp`)
    TokenExpired,
    /// Token is not yet valid
    TokenNotYetValid,
    /// Token issuer is invalid
    InvalidIssuer,
    /// Token audience does not contain the protected resource
    InvalidAudience,
    /// No key in the key set matches the token
    NoMatchingKey,
    /// JWKS fetch timed out
    JwksTimeout(String),
    /// JWKS fetch failed for any other reason
    JwksUnavailable(String),
    /// Fallback validator rejected the token
    Rejected(String),
    /// No JWKS URL and no fallback validator
    NotConfigured,
    /// Internal error
    Internal(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the client-facing error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingToken | AuthError::InvalidAuthHeader => "missing_token",
            AuthError::InvalidAudience => "invalid_audience",
            AuthError::NotConfigured | AuthError::Internal(_) => "server_error",
            _ => "invalid_token",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::NotConfigured | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// Whether the request carried no usable bearer token at all.
    pub fn is_missing_token(&self) -> bool {
        self.error_code() == "missing_token"
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "Bearer token is required"),
            AuthError::InvalidAuthHeader => {
                write!(f, "Invalid authorization header format (expected 'Bearer <token>')")
            }
            AuthError::MalformedToken => write!(f, "Token is malformed"),
            AuthError::UnsupportedAlgorithm(alg) => {
                write!(f, "Token signing algorithm {alg} is not accepted")
            }
            AuthError::InvalidSignature => write!(f, "Token signature is invalid"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::TokenNotYetValid => write!(f, "Token is not yet valid"),
            AuthError::InvalidIssuer => write!(f, "Token issuer is invalid"),
            AuthError::InvalidAudience => write!(f, "Token audience is invalid"),
            AuthError::NoMatchingKey => write!(f, "No matching key found in JWKS"),
            AuthError::JwksTimeout(_) | AuthError::JwksUnavailable(_) => {
                write!(f, "Token could not be verified")
            }
            AuthError::Rejected(reason) => write!(f, "Token rejected: {reason}"),
            AuthError::NotConfigured => write!(f, "Token verification is not configured"),
            AuthError::Internal(_) => write!(f, "Internal authentication error"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}
