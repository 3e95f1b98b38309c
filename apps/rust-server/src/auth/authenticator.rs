// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token validation against the cached JWKS.
//!
//! ## Checks
//!
//! - Header `alg` must be asymmetric (RS*, PS*, ES*, EdDSA); `none` fails
//!   header parsing and HMAC is rejected before any key lookup
//! - The key's family (and curve) must match `alg`, as must the JWK's own
//!   `alg` when present
//! - `exp` is required; `exp` and `nbf` are checked against the injected
//!   clock with a 60 second leeway
//! - `iss` is checked when an issuer is configured
//!
//! Audience checks belong to the middleware, which knows the protected
//! resource.

use std::sync::Arc;

use jsonwebtoken::jwk::{AlgorithmParameters, EllipticCurve, Jwk, KeyAlgorithm};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use tracing::{debug, warn};

use super::claims::{AuthenticatedIdentity, TokenClaims};
use super::error::AuthError;
use super::jwks::JwksCache;
use crate::clock::Clock;

/// Clock skew tolerance (60 seconds).
pub const CLOCK_SKEW_LEEWAY: i64 = 60;

/// JWT validator backed by a [`JwksCache`].
pub struct JwtAuthenticator {
    jwks: Arc<JwksCache>,
    issuer: Option<String>,
    clock: Arc<dyn Clock>,
}

impl JwtAuthenticator {
    pub fn new(jwks: Arc<JwksCache>, clock: Arc<dyn Clock>) -> Self {
        Self {
            jwks,
            issuer: None,
            clock,
        }
    }

    /// Require `iss` to equal `issuer`.
    pub fn with_issuer(mut self, issuer: Option<String>) -> Self {
        self.issuer = issuer;
        self
    }

    pub fn jwks(&self) -> &Arc<JwksCache> {
        &self.jwks
    }

    /// Whether a JWKS URL is configured.
    pub fn is_configured(&self) -> bool {
        self.jwks.is_configured()
    }

    /// Validate a bearer token and build the caller's identity.
    pub async fn validate_token(&self, token: &str) -> Result<AuthenticatedIdentity, AuthError> {
        let result = self.validate_inner(token).await;
        match &result {
            Ok(identity) => debug!(subject = %identity.subject, "Token validated"),
            Err(AuthError::JwksTimeout(reason)) => {
                warn!(reason = %reason, "Token rejected: JWKS fetch timed out")
            }
            Err(AuthError::JwksUnavailable(reason)) => {
                warn!(reason = %reason, "Token rejected: JWKS unavailable")
            }
            Err(e) => debug!(error = %e, code = e.error_code(), "Token rejected"),
        }
        result
    }

    async fn validate_inner(&self, token: &str) -> Result<AuthenticatedIdentity, AuthError> {
        let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;
        ensure_asymmetric(header.alg)?;

        let jwk = self.jwks.find_key(header.kid.as_deref()).await?;
        let decoding_key = decoding_key_for(&jwk, header.alg)?;

        let mut validation = Validation::new(header.alg);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims::<&str>(&[]);

        let token_data =
            decode::<TokenClaims>(token, &decoding_key, &validation).map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => {
                    AuthError::UnsupportedAlgorithm(format!("{:?}", header.alg))
                }
                _ => AuthError::MalformedToken,
            })?;
        let claims = token_data.claims;

        self.check_validity_window(&claims)?;

        if let Some(expected) = &self.issuer {
            if &claims.iss != expected {
                return Err(AuthError::InvalidIssuer);
            }
        }

        Ok(AuthenticatedIdentity::from_claims(claims))
    }

    fn check_validity_window(&self, claims: &TokenClaims) -> Result<(), AuthError> {
        let now = self.clock.now().timestamp();

        let exp = claims.exp.ok_or(AuthError::TokenExpired)?;
        if exp < now - CLOCK_SKEW_LEEWAY {
            return Err(AuthError::TokenExpired);
        }

        if let Some(nbf) = claims.nbf {
            if nbf > now + CLOCK_SKEW_LEEWAY {
                return Err(AuthError::TokenNotYetValid);
            }
        }
        Ok(())
    }
}

fn ensure_asymmetric(alg: Algorithm) -> Result<(), AuthError> {
    match alg {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
            Err(AuthError::UnsupportedAlgorithm(format!("{alg:?}")))
        }
        _ => Ok(()),
    }
}

/// Signing algorithm a JWK declares for itself.
fn declared_algorithm(alg: KeyAlgorithm) -> Option<Algorithm> {
    match alg {
        KeyAlgorithm::RS256 => Some(Algorithm::RS256),
        KeyAlgorithm::RS384 => Some(Algorithm::RS384),
        KeyAlgorithm::RS512 => Some(Algorithm::RS512),
        KeyAlgorithm::PS256 => Some(Algorithm::PS256),
        KeyAlgorithm::PS384 => Some(Algorithm::PS384),
        KeyAlgorithm::PS512 => Some(Algorithm::PS512),
        KeyAlgorithm::ES256 => Some(Algorithm::ES256),
        KeyAlgorithm::ES384 => Some(Algorithm::ES384),
        KeyAlgorithm::EdDSA => Some(Algorithm::EdDSA),
        _ => None,
    }
}

/// Convert a JWK to a DecodingKey usable with `alg`.
fn decoding_key_for(jwk: &Jwk, alg: Algorithm) -> Result<DecodingKey, AuthError> {
    if let Some(declared) = jwk.common.key_algorithm {
        if declared_algorithm(declared) != Some(alg) {
            return Err(AuthError::NoMatchingKey);
        }
    }

    let key = match (&jwk.algorithm, alg) {
        (
            AlgorithmParameters::RSA(rsa),
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512,
        ) => DecodingKey::from_rsa_components(&rsa.n, &rsa.e),
        (AlgorithmParameters::EllipticCurve(ec), Algorithm::ES256)
            if matches!(ec.curve, EllipticCurve::P256) =>
        {
            DecodingKey::from_ec_components(&ec.x, &ec.y)
        }
        (AlgorithmParameters::EllipticCurve(ec), Algorithm::ES384)
            if matches!(ec.curve, EllipticCurve::P384) =>
        {
            DecodingKey::from_ec_components(&ec.x, &ec.y)
        }
        (AlgorithmParameters::OctetKeyPair(okp), Algorithm::EdDSA)
            if matches!(okp.curve, EllipticCurve::Ed25519) =>
        {
            DecodingKey::from_ed_components(&okp.x)
        }
        _ => return Err(AuthError::NoMatchingKey),
    };

    key.map_err(|e| AuthError::Internal(format!("Failed to build decoding key: {e}")))
}
