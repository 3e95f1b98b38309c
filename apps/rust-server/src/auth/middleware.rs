// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer authentication middleware for Axum.
//!
//! Applied with `route_layer` to the protected router subtree:
//!
//! ```rust,ignore
//! let protected = Router::new()
//!     .route("/v1/sessions", post(create_session))
//!     .route_layer(axum::middleware::from_fn_with_state(
//!         auth_config.clone(),
//!         require_bearer,
//!     ));
//! ```
//!
//! ## Challenges
//!
//! - No usable token: `WWW-Authenticate: Bearer realm="Oauth", resource_metadata="<url>"`
//!   so OAuth clients can discover the authorization server
//! - Token rejected: `WWW-Authenticate: Bearer realm="Access to protected resource"`

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, WWW_AUTHENTICATE},
        HeaderMap, HeaderValue, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{AuthError, AuthenticatedIdentity, JwtAuthenticator};

/// Path prefix that bypasses authentication when `skip_well_known` is set.
pub const WELL_KNOWN_PREFIX: &str = "/.well-known/";

/// Alternative token validator, used when no JWKS URL is configured.
pub type FallbackValidator =
    Arc<dyn Fn(&str) -> Result<AuthenticatedIdentity, AuthError> + Send + Sync>;

/// Authentication configuration.
#[derive(Clone)]
pub struct AuthLayerConfig {
    /// Audience the token must contain (optional)
    pub resource_audience: Option<String>,
    /// Let `/.well-known/*` through unauthenticated
    pub skip_well_known: bool,
    /// Advertised in the missing-token challenge
    pub resource_metadata_url: Option<String>,
    /// Preferred validator
    pub authenticator: Option<Arc<JwtAuthenticator>>,
    pub fallback: Option<FallbackValidator>,
}

impl AuthLayerConfig {
    /// Create a configuration validating tokens with `authenticator`.
    pub fn new(authenticator: Arc<JwtAuthenticator>) -> Self {
        Self {
            resource_audience: None,
            skip_well_known: true,
            resource_metadata_url: None,
            authenticator: Some(authenticator),
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: FallbackValidator) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Set the expected audience.
    pub fn with_audience(mut self, audience: Option<String>) -> Self {
        self.resource_audience = audience;
        self
    }

    pub fn with_resource_metadata_url(mut self, url: Option<String>) -> Self {
        self.resource_metadata_url = url;
        self
    }

    pub fn with_skip_well_known(mut self, skip: bool) -> Self {
        self.skip_well_known = skip;
        self
    }

    /// Validate a token with the JWT authenticator when it has a key set to
    /// work with, otherwise with the fallback.
    pub async fn validate(&self, token: &str) -> Result<AuthenticatedIdentity, AuthError> {
        match (&self.authenticator, &self.fallback) {
            (Some(authenticator), _) if authenticator.is_configured() => {
                authenticator.validate_token(token).await
            }
            (_, Some(fallback)) => fallback(token),
            (Some(authenticator), None) => authenticator.validate_token(token).await,
            (None, None) => Err(AuthError::NotConfigured),
        }
    }

    /// Authenticate a request from its headers, including the audience check.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthenticatedIdentity, AuthError> {
        let token = bearer_token(headers)?;
        let identity = self.validate(token).await?;

        if let Some(audience) = &self.resource_audience {
            if !identity.has_audience(audience) {
                tracing::debug!(
                    subject = %identity.subject,
                    expected = %audience,
                    "Token audience does not include this resource"
                );
                return Err(AuthError::InvalidAudience);
            }
        }

        Ok(identity)
    }

    /// Turn an auth failure into a response with the matching challenge.
    pub fn reject(&self, err: AuthError) -> Response {
        let challenge = if err.status_code() != StatusCode::UNAUTHORIZED {
            None
        } else if err.is_missing_token() {
            Some(match &self.resource_metadata_url {
                Some(url) => format!(r#"Bearer realm="Oauth", resource_metadata="{url}""#),
                None => r#"Bearer realm="Oauth""#.to_string(),
            })
        } else {
            Some(r#"Bearer realm="Access to protected resource""#.to_string())
        };

        let mut response = err.into_response();
        if let Some(value) = challenge.and_then(|c| HeaderValue::from_str(&c).ok()) {
            response.headers_mut().insert(WWW_AUTHENTICATE, value);
        }
        response
    }
}

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidAuthHeader)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }
    Ok(token)
}

/// Authentication middleware function.
pub async fn require_bearer(
    State(config): State<AuthLayerConfig>,
    mut request: Request,
    next: Next,
) -> Response {
    if config.skip_well_known && request.uri().path().starts_with(WELL_KNOWN_PREFIX) {
        return next.run(request).await;
    }

    match config.authenticate(request.headers()).await {
        Ok(identity) => {
            // Add authenticated identity to request extensions
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(e) => config.reject(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::fixtures::{jwks_json, KEY_A};
    use crate::auth::JwksCache;
    use crate::clock::{Clock, ManualClock};
    use axum::{body::Body, middleware, routing::get, Extension, Router};
    use serde_json::json;
    use std::time::Duration;
    use tower::ServiceExt;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const METADATA_URL: &str = "https://api.example.com/.well-known/oauth-protected-resource";
    const AUDIENCE: &str = "https://api.example.com";

    async fn whoami(Extension(identity): Extension<AuthenticatedIdentity>) -> String {
        identity.subject
    }

    fn app(config: AuthLayerConfig) -> Router {
        Router::new()
            .route("/protected", get(whoami))
            .route("/.well-known/open", get(|| async { "open" }))
            .layer(middleware::from_fn_with_state(config, require_bearer))
    }

    async fn jwt_config() -> (MockServer, Arc<ManualClock>, AuthLayerConfig) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_json(&[&KEY_A])))
            .mount(&server)
            .await;

        let clock = Arc::new(ManualClock::starting_now());
        let jwks = JwksCache::new(Some(server.uri()), Duration::from_secs(5), clock.clone()).unwrap();
        let authenticator = Arc::new(JwtAuthenticator::new(Arc::new(jwks), clock.clone()));
        let config = AuthLayerConfig::new(authenticator)
            .with_audience(Some(AUDIENCE.to_string()))
            .with_resource_metadata_url(Some(METADATA_URL.to_string()));
        (server, clock, config)
    }

    fn token_for(clock: &ManualClock, aud: &str) -> String {
        KEY_A.sign(&json!({
            "sub": "agent-1",
            "aud": aud,
            "exp": clock.now().timestamp() + 300,
        }))
    }

    async fn call(app: Router, authorization: Option<&str>, uri: &str) -> Response {
        let mut builder = axum::http::Request::builder().uri(uri);
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn challenge(response: &Response) -> &str {
        response
            .headers()
            .get(WWW_AUTHENTICATE)
            .expect("challenge header")
            .to_str()
            .unwrap()
    }

    #[tokio::test]
    async fn missing_or_empty_token_gets_discovery_challenge() {
        let (_server, _clock, config) = jwt_config().await;

        for authorization in [None, Some("Bearer "), Some("Bearer    "), Some("Basic dXNlcjpwdw==")] {
            let response = call(app(config.clone()), authorization, "/protected").await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(
                challenge(&response),
                format!(r#"Bearer realm="Oauth", resource_metadata="{METADATA_URL}""#)
            );
            assert_eq!(json_body(response).await["error_code"], "missing_token");
        }
    }

    #[tokio::test]
    async fn invalid_token_gets_resource_challenge() {
        let (_server, _clock, config) = jwt_config().await;
        let response = call(app(config), Some("Bearer abc.def.ghi"), "/protected").await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            challenge(&response),
            r#"Bearer realm="Access to protected resource""#
        );
        assert_eq!(json_body(response).await["error_code"], "invalid_token");
    }

    #[tokio::test]
    async fn valid_token_reaches_handler() {
        let (_server, clock, config) = jwt_config().await;
        let token = token_for(&clock, AUDIENCE);

        let response = call(app(config), Some(format!("Bearer {token}").as_str()), "/protected").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"agent-1");
    }

    #[tokio::test]
    async fn wrong_audience_is_rejected() {
        let (_server, clock, config) = jwt_config().await;
        let token = token_for(&clock, "https://someone-else.example.com");

        let response = call(app(config), Some(format!("Bearer {token}").as_str()), "/protected").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error_code"], "invalid_audience");
    }

    #[tokio::test]
    async fn well_known_paths_bypass_only_when_enabled() {
        let (_server, _clock, config) = jwt_config().await;

        let open = call(app(config.clone()), None, "/.well-known/open").await;
        assert_eq!(open.status(), StatusCode::OK);

        let closed = call(
            app(config.with_skip_well_known(false)),
            None,
            "/.well-known/open",
        )
        .await;
        assert_eq!(closed.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn fallback_validator_is_used_without_jwks() {
        let fallback: FallbackValidator = Arc::new(|token: &str| {
            if token == "static-operator-token" {
                Ok(AuthenticatedIdentity {
                    subject: "operator".to_string(),
                    issuer: "static".to_string(),
                    client_id: None,
                    audiences: vec![AUDIENCE.to_string()],
                    roles: vec![],
                    scopes: vec![],
                    expires_at_unix: 0,
                })
            } else {
                Err(AuthError::Rejected("unknown token".to_string()))
            }
        });
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::starting_now());
        let jwks = JwksCache::new(None, Duration::from_secs(1), clock.clone()).unwrap();
        let config = AuthLayerConfig::new(Arc::new(JwtAuthenticator::new(Arc::new(jwks), clock)))
            .with_fallback(fallback)
            .with_audience(Some(AUDIENCE.to_string()));

        let ok = call(app(config.clone()), Some("Bearer static-operator-token"), "/protected").await;
        assert_eq!(ok.status(), StatusCode::OK);

        let rejected = call(app(config), Some("Bearer nope"), "/protected").await;
        assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn no_validator_is_a_server_error() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::starting_now());
        let jwks = JwksCache::new(None, Duration::from_secs(1), clock.clone()).unwrap();
        let config = AuthLayerConfig::new(Arc::new(JwtAuthenticator::new(Arc::new(jwks), clock)));

        let response = call(app(config), Some("Bearer something"), "/protected").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(WWW_AUTHENTICATE).is_none());
    }
}
