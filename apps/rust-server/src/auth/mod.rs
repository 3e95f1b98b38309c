// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer-token authentication for programmatic API access.
//!
//! ## Auth Flow
//!
//! 1. Client obtains a JWT from an OAuth authorization server
//! 2. Client sends `Authorization: Bearer <JWT>`
//! 3. Server:
//!    - Resolves the signing key from the cached JWKS (fetched over HTTPS)
//!    - Verifies signature, expiry, not-before, issuer
//!    - Checks the token audience contains this resource
//!    - Attaches an [`AuthenticatedIdentity`] to the request
//!
//! ## Security
//!
//! - Only asymmetric algorithms are accepted
//! - JWKS is cached with TTL; concurrent refreshes share one fetch
//! - Clock skew tolerance is 60 seconds
//! - Unauthenticated callers are pointed at the protected resource metadata

pub mod authenticator;
pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod middleware;

#[cfg(test)]
pub(crate) mod fixtures;

pub use authenticator::JwtAuthenticator;
pub use claims::{AuthenticatedIdentity, TokenClaims};
pub use error::AuthError;
pub use extractor::Auth;
pub use jwks::{JwksCache, JwksError, KeySetGeneration};
pub use middleware::{require_bearer, AuthLayerConfig, FallbackValidator};
