// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::Request,
    http::HeaderName,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::require_bearer,
    config::RESOURCE_METADATA_PATH,
    sessions::{ChainType, SessionStatus, SessionType, TransactionSession},
    state::AppState,
};

pub mod chain;
pub mod health;
pub mod sessions;
pub mod signatures;
pub mod well_known;

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn router(state: AppState) -> Router {
    let auth_layer = middleware::from_fn_with_state(state.auth.clone(), require_bearer);

    let v1_protected = Router::new()
        .route("/sessions", post(sessions::create_session))
        .route("/signatures/verify", post(signatures::verify_signature))
        .route("/chain/accounts/{address}", get(chain::get_account))
        .route_layer(auth_layer.clone());

    let v1_public = Router::new()
        .route("/sessions/{session_id}", get(sessions::get_session))
        .route(
            "/sessions/{session_type}/{session_id}/confirm",
            post(sessions::confirm_session),
        );

    // The middleware lets this through unless SKIP_WELL_KNOWN=false.
    let well_known = Router::new()
        .route(RESOURCE_METADATA_PATH, get(well_known::resource_metadata))
        .route_layer(auth_layer);

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .nest("/v1", v1_protected.merge(v1_public))
        .merge(well_known)
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            let request_id = request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        }))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        sessions::create_session,
        sessions::get_session,
        sessions::confirm_session,
        signatures::verify_signature,
        chain::get_account,
        well_known::resource_metadata,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            TransactionSession,
            SessionType,
            SessionStatus,
            ChainType,
            sessions::CreateSessionRequest,
            sessions::ConfirmSessionRequest,
            sessions::ConfirmSessionResponse,
            signatures::VerifySignatureRequest,
            signatures::VerifySignatureResponse,
            chain::AccountInfo,
            well_known::ResourceMetadata,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&BearerSecurity),
    tags(
        (name = "Sessions", description = "Transaction sessions and confirmation"),
        (name = "Signatures", description = "Personal-sign verification"),
        (name = "Chain", description = "On-chain account reads"),
        (name = "Auth", description = "OAuth protected resource metadata"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_state;
    use axum::{
        body::{to_bytes, Body},
        http::{header::WWW_AUTHENTICATE, Request, StatusCode},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let app = router(test_state());
        // Ensure the router can be converted into a service without panicking.
        let _ = app.into_make_service();
    }

    #[tokio::test]
    async fn protected_routes_challenge_without_token() {
        let response = router(test_state())
            .oneshot(
                Request::post("/v1/sessions")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"sessionType":"deploy"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(WWW_AUTHENTICATE));
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let response = router(test_state())
            .oneshot(Request::get("/health/live").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn caller_request_id_is_kept() {
        let response = router(test_state())
            .oneshot(
                Request::get("/health/live")
                    .header(REQUEST_ID_HEADER, "req-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()[REQUEST_ID_HEADER], "req-123");
    }

    #[tokio::test]
    async fn openapi_document_lists_paths() {
        let response = router(test_state())
            .oneshot(
                Request::get("/api-doc/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(doc["paths"]["/v1/sessions/{session_type}/{session_id}/confirm"].is_object());
        assert!(doc["components"]["securitySchemes"]["bearer"].is_object());
    }
}
