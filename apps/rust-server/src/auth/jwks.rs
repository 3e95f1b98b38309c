// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Cache Semantics
//!
//! - A fetched key set is one immutable *generation*, shared through an
//!   `Arc` and replaced wholesale on refresh
//! - Lookups within `fetched_at + ttl` never touch the network
//! - At most one refresh is in flight; callers that waited on it reuse its
//!   result instead of fetching again
//! - A `kid` missing from a valid generation triggers one refresh (key
//!   rotation), rate-limited by `min_refresh_interval`
//! - No URL configured means an immediate configuration error

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::jwk::{Jwk, JwkSet};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::error::AuthError;
use crate::clock::Clock;

/// Default JWKS cache TTL (5 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Default minimum age of a generation before an unknown `kid` may refresh it.
pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Default timeout for one JWKS fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Key set retrieval failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum JwksError {
    #[error("no JWKS URL configured")]
    NotConfigured,

    #[error("JWKS fetch timed out: {0}")]
    Timeout(String),

    #[error("JWKS fetch failed: {0}")]
    Fetch(String),

    #[error("JWKS endpoint returned HTTP {0}")]
    HttpStatus(u16),

    #[error("malformed JWKS document: {0}")]
    Decode(String),
}

impl From<JwksError> for AuthError {
    fn from(e: JwksError) -> Self {
        match e {
            JwksError::NotConfigured => AuthError::NotConfigured,
            JwksError::Timeout(msg) => AuthError::JwksTimeout(msg),
            other => AuthError::JwksUnavailable(other.to_string()),
        }
    }
}

/// One fetched key set.
#[derive(Debug)]
pub struct KeySetGeneration {
    /// Monotonic generation counter, starting at 1
    pub version: u64,
    pub keys: JwkSet,
    pub fetched_at: DateTime<Utc>,
}

/// Shared JWKS cache.
pub struct JwksCache {
    jwks_url: Option<String>,
    ttl: chrono::Duration,
    min_refresh_interval: chrono::Duration,
    client: reqwest::Client,
    clock: Arc<dyn Clock>,
    current: RwLock<Option<Arc<KeySetGeneration>>>,
    refresh_lock: Mutex<()>,
}

fn to_chrono(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or(chrono::Duration::MAX)
}

impl JwksCache {
    /// Create a cache whose fetches are bounded by `timeout`.
    pub fn new(
        jwks_url: Option<String>,
        timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, JwksError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| JwksError::Fetch(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            jwks_url,
            ttl: to_chrono(DEFAULT_CACHE_TTL),
            min_refresh_interval: to_chrono(DEFAULT_MIN_REFRESH_INTERVAL),
            client,
            clock,
            current: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Create with custom cache TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = to_chrono(ttl);
        self
    }

    pub fn jwks_url(&self) -> Option<&str> {
        self.jwks_url.as_deref()
    }

    pub fn is_configured(&self) -> bool {
        self.jwks_url.is_some()
    }

    /// The current generation, fresh or not.
    pub async fn current(&self) -> Option<Arc<KeySetGeneration>> {
        self.current.read().await.clone()
    }

    /// Check if a key set is currently cached and within its TTL.
    pub async fn is_cached(&self) -> bool {
        match self.current().await {
            Some(generation) => self.is_fresh(&generation),
            None => false,
        }
    }

    fn is_fresh(&self, generation: &KeySetGeneration) -> bool {
        self.clock.now() < generation.fetched_at + self.ttl
    }

    /// Return a fresh key set, fetching it if the cache is empty or expired.
    pub async fn key_set(&self) -> Result<Arc<KeySetGeneration>, JwksError> {
        if self.jwks_url.is_none() {
            return Err(JwksError::NotConfigured);
        }

        let current = self.current().await;
        if let Some(generation) = &current {
            if self.is_fresh(generation) {
                return Ok(generation.clone());
            }
        }

        self.refresh(current.map(|g| g.version)).await
    }

    /// Replace the generation `seen` with a newly fetched one.
    ///
    /// If another caller already replaced `seen` while this one waited for
    /// the refresh lock, that result is returned without a second fetch.
    pub async fn refresh(&self, seen: Option<u64>) -> Result<Arc<KeySetGeneration>, JwksError> {
        let url = self.jwks_url.as_deref().ok_or(JwksError::NotConfigured)?;
        let _guard = self.refresh_lock.lock().await;

        let previous = self.current().await;
        if let Some(generation) = &previous {
            if Some(generation.version) != seen {
                debug!(version = generation.version, "JWKS refreshed by concurrent caller");
                return Ok(generation.clone());
            }
        }

        let keys = self.fetch(url).await?;
        let generation = Arc::new(KeySetGeneration {
            version: previous.map_or(0, |g| g.version) + 1,
            keys,
            fetched_at: self.clock.now(),
        });

        info!(
            version = generation.version,
            keys = generation.keys.keys.len(),
            "JWKS cache refreshed"
        );
        *self.current.write().await = Some(generation.clone());
        Ok(generation)
    }

    /// Resolve the signing key for a token.
    ///
    /// Tokens without a `kid` resolve only against a single-key set.
    pub async fn find_key(&self, kid: Option<&str>) -> Result<Jwk, AuthError> {
        let generation = self.key_set().await?;
        if let Some(jwk) = select_key(&generation.keys, kid)? {
            return Ok(jwk);
        }

        if self.clock.now() - generation.fetched_at < self.min_refresh_interval {
            debug!(kid = ?kid, "Unknown key id, JWKS refreshed too recently to retry");
            return Err(AuthError::NoMatchingKey);
        }

        debug!(kid = ?kid, "Unknown key id, refreshing JWKS");
        let refreshed = self.refresh(Some(generation.version)).await?;
        select_key(&refreshed.keys, kid)?.ok_or(AuthError::NoMatchingKey)
    }

    /// Fetch the key set from the endpoint.
    async fn fetch(&self, url: &str) -> Result<JwkSet, JwksError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                warn!(url, error = %e, "JWKS fetch timed out");
                JwksError::Timeout(e.to_string())
            } else {
                warn!(url, error = %e, "JWKS fetch failed");
                JwksError::Fetch(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            warn!(url, status = %response.status(), "JWKS endpoint returned error status");
            return Err(JwksError::HttpStatus(response.status().as_u16()));
        }

        response.json::<JwkSet>().await.map_err(|e| {
            if e.is_timeout() {
                warn!(url, error = %e, "JWKS fetch timed out");
                JwksError::Timeout(e.to_string())
            } else {
                JwksError::Decode(e.to_string())
            }
        })
    }
}

/// `Ok(None)` means "not found, a refresh may help".
fn select_key(keys: &JwkSet, kid: Option<&str>) -> Result<Option<Jwk>, AuthError> {
    match kid {
        Some(kid) => Ok(keys.find(kid).cloned()),
        None => match keys.keys.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(only.clone())),
            _ => Err(AuthError::NoMatchingKey),
        },
    }
}
