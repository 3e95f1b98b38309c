// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OAuth 2.0 Protected Resource Metadata (RFC 9728).

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResourceMetadata {
    pub resource: String,
    pub authorization_servers: Vec<String>,
    pub bearer_methods_supported: Vec<String>,
    pub scopes_supported: Vec<String>,
}

#[utoipa::path(
    get,
    path = "/.well-known/oauth-protected-resource",
    tag = "Auth",
    responses((status = 200, body = ResourceMetadata))
)]
pub async fn resource_metadata(State(state): State<AppState>) -> Json<ResourceMetadata> {
    let resource = &state.resource;
    Json(ResourceMetadata {
        resource: resource.resource.clone(),
        authorization_servers: resource.authorization_servers.clone(),
        bearer_methods_supported: vec!["header".to_string()],
        scopes_supported: resource.scopes_supported.clone(),
    })
}
