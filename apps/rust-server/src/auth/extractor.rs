// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authenticated callers.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(identity): Auth) -> impl IntoResponse {
//!     // identity is AuthenticatedIdentity
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts, response::Response};

use super::AuthenticatedIdentity;
use crate::state::AppState;

/// Extractor for authenticated callers.
///
/// Reads the identity placed in request extensions by
/// [`require_bearer`](super::middleware::require_bearer). On routes without
/// the middleware it validates the bearer token itself, with the same
/// challenges.
pub struct Auth(pub AuthenticatedIdentity);

impl FromRequestParts<AppState> for Auth {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // First check if middleware already set the identity
        if let Some(identity) = parts.extensions.get::<AuthenticatedIdentity>().cloned() {
            return Ok(Auth(identity));
        }

        state
            .auth
            .authenticate(&parts.headers)
            .await
            .map(Auth)
            .map_err(|e| state.auth.reject(e))
    }
}
